//! Exposing archive contents at a mount target.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::MountError;

/// Makes the contents of an archive readable under a target directory.
pub trait ArchiveMounter: Send + Sync {
  fn mount_archive(&self, source: &Path, target: &Path) -> Result<MountHandle, MountError>;
}

/// A live mount. Closing it releases the target.
#[derive(Debug)]
pub struct MountHandle {
  source: PathBuf,
  target: PathBuf,
}

impl MountHandle {
  pub fn new(source: impl Into<PathBuf>, target: impl Into<PathBuf>) -> Self {
    Self {
      source: source.into(),
      target: target.into(),
    }
  }

  pub fn source(&self) -> &Path {
    &self.source
  }

  pub fn target(&self) -> &Path {
    &self.target
  }

  /// Remove the mounted contents. An already-removed target is not an error.
  pub fn close(self) -> io::Result<()> {
    match fs::remove_dir_all(&self.target) {
      Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
      _ => Ok(()),
    }
  }
}

/// Mounts zip archives (`.jar`) by extracting them into the target.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipMounter;

impl ArchiveMounter for ZipMounter {
  fn mount_archive(&self, source: &Path, target: &Path) -> Result<MountHandle, MountError> {
    let file = File::open(source).map_err(|e| MountError::Open {
      archive: source.to_path_buf(),
      source: e,
    })?;
    let archive_error = |e| MountError::Archive {
      archive: source.to_path_buf(),
      source: e,
    };

    let mut archive = ZipArchive::new(BufReader::new(file)).map_err(archive_error)?;
    archive.extract(target).map_err(archive_error)?;

    debug!("extracted {} entries of {} into {}", archive.len(), source.display(), target.display());
    Ok(MountHandle::new(source, target))
  }
}
