//! Archive mounting into a deployment's scratch area.
//!
//! Every deployment unit owns one scratch area under the application's
//! `.tmp_jar_mounts`, and each archive gets its own uniquely named target
//! directory inside it, so two artifacts with the same file name never collide.

mod archive;
mod tracker;

pub use archive::{ArchiveMounter, MountHandle, ZipMounter};
pub use tracker::MountTracker;

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::MountError;

const TARGET_SUFFIX: &str = ".jar";

/// Create a scratch area owned by one unit: `<parent>/<unit name><random>`.
pub fn create_scratch_area(parent: &Path, unit_name: &str) -> Result<PathBuf, MountError> {
  let scratch_error = |source| MountError::Scratch {
    dir: parent.to_path_buf(),
    source,
  };

  // Unit names may carry path separators.
  let prefix = Path::new(unit_name)
    .file_name()
    .map(|name| name.to_string_lossy().into_owned())
    .unwrap_or_else(|| "unit".to_string());

  fs::create_dir_all(parent).map_err(scratch_error)?;
  let dir = tempfile::Builder::new()
    .prefix(&format!("{}-", prefix))
    .tempdir_in(parent)
    .map_err(scratch_error)?;

  Ok(dir.keep())
}

/// Create a fresh, unique mount target for `archive` inside `scratch`:
/// `<scratch>/<archive file name><random>.jar`. The scratch area is created
/// if it does not exist yet.
pub fn create_target(scratch: &Path, archive: &Path) -> Result<PathBuf, MountError> {
  let file_name = archive
    .file_name()
    .ok_or_else(|| MountError::NoFileName(archive.to_path_buf()))?;

  let target_error = |source| MountError::Target {
    archive: archive.to_path_buf(),
    dir: scratch.to_path_buf(),
    source,
  };

  fs::create_dir_all(scratch).map_err(target_error)?;
  let target = tempfile::Builder::new()
    .prefix(file_name)
    .suffix(TARGET_SUFFIX)
    .tempdir_in(scratch)
    .map_err(target_error)?;

  Ok(target.keep())
}

/// Mount `archive` at a fresh target in `scratch`.
pub fn mount_into(scratch: &Path, archive: &Path, mounter: &dyn ArchiveMounter) -> Result<MountHandle, MountError> {
  let target = create_target(scratch, archive)?;
  mounter.mount_archive(archive, &target)
}

#[cfg(test)]
mod tests {
  use super::*;
  use tempfile::TempDir;

  #[test]
  fn targets_are_unique_per_archive() {
    let temp = TempDir::new().unwrap();
    let scratch = temp.path().join(".tmp_jar_mounts");
    let archive = Path::new("/repo/ring-1.0.jar");

    let first = create_target(&scratch, archive).unwrap();
    let second = create_target(&scratch, archive).unwrap();

    assert_ne!(first, second);
    for target in [&first, &second] {
      assert_eq!(target.parent(), Some(scratch.as_path()));
      let name = target.file_name().unwrap().to_string_lossy();
      assert!(name.starts_with("ring-1.0.jar"), "unexpected target name {}", name);
      assert!(name.ends_with(".jar"));
      assert!(target.is_dir());
    }
  }

  #[test]
  fn scratch_areas_are_owned_per_unit() {
    let temp = TempDir::new().unwrap();
    let parent = temp.path().join(".tmp_jar_mounts");

    let a = create_scratch_area(&parent, "foo.lua").unwrap();
    let b = create_scratch_area(&parent, "foo.lua").unwrap();
    let nested = create_scratch_area(&parent, "deployments/bar.lua").unwrap();

    assert_ne!(a, b);
    assert!(a.file_name().unwrap().to_string_lossy().starts_with("foo.lua-"));
    assert_eq!(nested.parent(), Some(parent.as_path()));
    assert!(nested.file_name().unwrap().to_string_lossy().starts_with("bar.lua-"));
  }

  #[test]
  fn archive_without_file_name_is_rejected() {
    let temp = TempDir::new().unwrap();
    let err = create_target(temp.path(), Path::new("/")).unwrap_err();
    assert!(matches!(err, MountError::NoFileName(_)));
  }
}
