//! Mounting an application's dependencies as module roots.

use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, warn};

use crate::bootstrap::BootstrapGateway;
use crate::config::{InstallConfig, LANGUAGE_RUNTIME_ARCHIVE, SCRATCH_DIR_NAME};
use crate::deployment::{
  AnnotationIndex, AppMetadata, DeploymentUnit, DeploymentUnitProcessor, MountState, ResourceRoot, RuntimeVersion,
};
use crate::error::{DeploymentProcessingError, MountError, ProcessingFailure};
use crate::mount::{self, ArchiveMounter, MountTracker, ZipMounter};

/// File names that count as the application shipping its own language
/// runtime. Only unversioned or three-part versions match.
static LANGUAGE_RUNTIME_PATTERN: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"^clojure(-\d.\d.\d)?\.jar$").expect("language runtime pattern is valid"));

/// Whether an archive file name is a language runtime.
pub fn is_language_runtime(file_name: &str) -> bool {
  LANGUAGE_RUNTIME_PATTERN.is_match(file_name)
}

/// Mounts dependencies, the language runtime and runtime support for each
/// application, and registers its resource directories.
///
/// Mount order, which is also module-root order: application dependencies
/// (resolver order), the language runtime fallback if needed, runtime
/// support, resource directories.
pub struct DependencyMounter {
  gateway: Arc<BootstrapGateway>,
  install: InstallConfig,
  versions: Arc<dyn RuntimeVersion>,
  mounter: Arc<dyn ArchiveMounter>,
}

impl DependencyMounter {
  pub fn new(gateway: Arc<BootstrapGateway>, install: InstallConfig) -> Self {
    Self {
      gateway,
      versions: Arc::new(install.clone()),
      install,
      mounter: Arc::new(ZipMounter),
    }
  }

  pub fn with_runtime_version(mut self, versions: Arc<dyn RuntimeVersion>) -> Self {
    self.versions = versions;
    self
  }

  pub fn with_mounter(mut self, mounter: Arc<dyn ArchiveMounter>) -> Self {
    self.mounter = mounter;
    self
  }

  fn mount_all(&self, unit: &mut DeploymentUnit, metadata: &AppMetadata) -> Result<(), ProcessingFailure> {
    let root = metadata.root();

    let dependencies = self
      .gateway
      .get_dependencies(root, metadata.resolve_dependencies(), metadata.profiles())?;
    for dependency in &dependencies {
      self.mount(unit, root, dependency)?;
    }

    let ships_runtime = dependencies
      .iter()
      .filter_map(|dependency| dependency.file_name().and_then(OsStr::to_str))
      .any(is_language_runtime);
    if !ships_runtime {
      warn!(
        "No {} found within {}, using built-in {} (v{})",
        LANGUAGE_RUNTIME_ARCHIVE,
        metadata.application_name(),
        LANGUAGE_RUNTIME_ARCHIVE,
        self.versions.runtime_language_version()
      );
      self.mount(unit, root, &self.install.bundled_language_runtime())?;
    }

    self.mount(unit, root, &self.install.runtime_support_archive())?;

    for dir in self.gateway.resource_dirs(root, metadata.profiles())? {
      debug!("{}: adding resource dir {}", unit.name(), dir);
      unit.add_resource_root(ResourceRoot::directory(dir));
    }

    Ok(())
  }

  fn mount(&self, unit: &mut DeploymentUnit, app_root: &Path, archive: &Path) -> Result<(), MountError> {
    debug!("{}: mounting {}", unit.name(), archive.display());
    let scratch = match unit.scratch_area() {
      Some(dir) => dir.to_path_buf(),
      None => {
        let dir = mount::create_scratch_area(&app_root.join(SCRATCH_DIR_NAME), unit.name())?;
        unit.set_scratch_area(&dir);
        dir
      }
    };
    let handle = mount::mount_into(&scratch, archive, self.mounter.as_ref())?;

    let target = handle.target().to_path_buf();
    unit.add_resource_root(ResourceRoot::mounted(handle));
    if let Some(tracker) = unit.mount_tracker_mut() {
      tracker.put(target, archive);
    }
    Ok(())
  }

  /// Release everything a previous `deploy` left on the unit: close its
  /// mounts, delete its scratch area and forget its resource roots.
  fn release(&self, unit: &mut DeploymentUnit) {
    for handle in unit.take_resource_roots().into_iter().filter_map(ResourceRoot::into_mount) {
      let target = handle.target().to_path_buf();
      if let Err(e) = handle.close() {
        warn!("{}: failed to release {}: {}", unit.name(), target.display(), e);
      }
    }

    if let Some(scratch) = unit.take_scratch_area() {
      match fs::remove_dir_all(&scratch) {
        Ok(()) => debug!("{}: removed {}", unit.name(), scratch.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("{}: failed to remove {}: {}", unit.name(), scratch.display(), e),
      }
      // Shared with other units; only goes once the last one is gone.
      if let Some(parent) = scratch.parent() {
        let _ = fs::remove_dir(parent);
      }
    }

    unit.detach_mount_tracker();
    unit.set_annotation_index(AnnotationIndex::Unset);
  }
}

impl DeploymentUnitProcessor for DependencyMounter {
  fn deploy(&self, unit: &mut DeploymentUnit) -> Result<(), DeploymentProcessingError> {
    let Some(metadata) = unit.metadata().cloned() else {
      if unit.is_archived() {
        unit.set_state(MountState::Failed);
        return Err(DeploymentProcessingError {
          unit: unit.name().to_string(),
          cause: ProcessingFailure::MissingMetadata,
        });
      }
      return Ok(());
    };

    if unit.state() != MountState::NotStarted {
      self.release(unit);
    }
    unit.set_state(MountState::Mounting);
    unit.attach_mount_tracker(MountTracker::new());

    match self.mount_all(unit, &metadata) {
      Ok(()) => {
        unit.set_annotation_index(AnnotationIndex::Empty);
        unit.set_state(MountState::Mounted);
        Ok(())
      }
      Err(cause) => {
        unit.set_state(MountState::Failed);
        Err(DeploymentProcessingError {
          unit: unit.name().to_string(),
          cause,
        })
      }
    }
  }

  fn undeploy(&self, unit: &mut DeploymentUnit) {
    if unit.metadata().is_none() {
      return;
    }

    self.release(unit);
    unit.set_state(MountState::Undeployed);
  }
}
