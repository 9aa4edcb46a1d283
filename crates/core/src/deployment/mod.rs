//! Deployment unit model and the host-facing processing seam.
//!
//! The host drives processing; nothing in this module calls itself. A
//! [`DeploymentUnitProcessor`] reacts to `deploy`/`undeploy` for one unit at a
//! time, and records what it did on the unit.

mod dependencies;

pub use dependencies::{DependencyMounter, is_language_runtime};

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::error::{DeploymentProcessingError, DescriptorError};
use crate::mount::{MountHandle, MountTracker};

/// Reports the version of the bundled language runtime.
pub trait RuntimeVersion: Send + Sync {
  fn runtime_language_version(&self) -> String;
}

/// Host callbacks for one processing phase.
pub trait DeploymentUnitProcessor {
  fn deploy(&self, unit: &mut DeploymentUnit) -> Result<(), DeploymentProcessingError>;

  /// Undo what `deploy` did. Never fails; problems are logged.
  fn undeploy(&self, unit: &mut DeploymentUnit);
}

/// Per-application deployment settings, read from its descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppMetadata {
  root: PathBuf,
  application_name: String,
  resolve_dependencies: bool,
  profiles: Vec<String>,
}

impl AppMetadata {
  pub fn new(application_name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
    Self {
      root: root.into(),
      application_name: application_name.into(),
      resolve_dependencies: true,
      profiles: Vec::new(),
    }
  }

  /// Build metadata from a parsed descriptor map.
  ///
  /// `root` is required; `resolve_dependencies` defaults to `true` and
  /// `profiles` to none.
  pub fn from_descriptor(
    application_name: impl Into<String>,
    descriptor: &Map<String, Value>,
  ) -> Result<Self, DescriptorError> {
    let root = match descriptor.get("root") {
      Some(Value::String(root)) => root,
      Some(_) => {
        return Err(DescriptorError::InvalidField {
          field: "root",
          expected: "a path",
        });
      }
      None => return Err(DescriptorError::MissingField("root")),
    };

    let resolve_dependencies = match descriptor.get("resolve_dependencies") {
      None | Some(Value::Null) => true,
      Some(Value::Bool(resolve)) => *resolve,
      Some(_) => {
        return Err(DescriptorError::InvalidField {
          field: "resolve_dependencies",
          expected: "a boolean",
        });
      }
    };

    let profiles = match descriptor.get("profiles") {
      None | Some(Value::Null) => Vec::new(),
      // An empty Lua table reads back as a map.
      Some(Value::Object(empty)) if empty.is_empty() => Vec::new(),
      Some(Value::Array(items)) => items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or(DescriptorError::InvalidField {
          field: "profiles",
          expected: "a list of names",
        })?,
      Some(_) => {
        return Err(DescriptorError::InvalidField {
          field: "profiles",
          expected: "a list of names",
        });
      }
    };

    Ok(Self {
      root: PathBuf::from(root),
      application_name: application_name.into(),
      resolve_dependencies,
      profiles,
    })
  }

  pub fn with_resolve_dependencies(mut self, resolve: bool) -> Self {
    self.resolve_dependencies = resolve;
    self
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn application_name(&self) -> &str {
    &self.application_name
  }

  pub fn resolve_dependencies(&self) -> bool {
    self.resolve_dependencies
  }

  pub fn profiles(&self) -> &[String] {
    &self.profiles
  }
}

/// A directory or mounted archive contributing code to a deployment.
#[derive(Debug)]
pub struct ResourceRoot {
  path: PathBuf,
  mount: Option<MountHandle>,
  module_root: bool,
}

impl ResourceRoot {
  /// A mounted archive, visible to module lookup.
  pub fn mounted(handle: MountHandle) -> Self {
    Self {
      path: handle.target().to_path_buf(),
      mount: Some(handle),
      module_root: true,
    }
  }

  /// A directory registered in place, visible to module lookup.
  pub fn directory(path: impl Into<PathBuf>) -> Self {
    Self {
      path: path.into(),
      mount: None,
      module_root: true,
    }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }

  pub fn mount(&self) -> Option<&MountHandle> {
    self.mount.as_ref()
  }

  pub fn into_mount(self) -> Option<MountHandle> {
    self.mount
  }

  pub fn is_module_root(&self) -> bool {
    self.module_root
  }
}

/// Whether annotation scanning may run for a unit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AnnotationIndex {
  #[default]
  Unset,
  /// Registered as explicitly empty so no scanning happens.
  Empty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MountState {
  #[default]
  NotStarted,
  Mounting,
  Mounted,
  Failed,
  Undeployed,
}

/// One application moving through the deployment pipeline.
#[derive(Debug, Default)]
pub struct DeploymentUnit {
  name: String,
  archived: bool,
  metadata: Option<AppMetadata>,
  resource_roots: Vec<ResourceRoot>,
  scratch_area: Option<PathBuf>,
  mount_tracker: Option<MountTracker>,
  annotation_index: AnnotationIndex,
  state: MountState,
}

impl DeploymentUnit {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      ..Self::default()
    }
  }

  pub fn with_metadata(mut self, metadata: AppMetadata) -> Self {
    self.metadata = Some(metadata);
    self
  }

  /// Mark the unit as deployed from a packaged archive.
  pub fn archived(mut self) -> Self {
    self.archived = true;
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn is_archived(&self) -> bool {
    self.archived
  }

  pub fn metadata(&self) -> Option<&AppMetadata> {
    self.metadata.as_ref()
  }

  pub fn resource_roots(&self) -> &[ResourceRoot] {
    &self.resource_roots
  }

  pub fn add_resource_root(&mut self, root: ResourceRoot) {
    self.resource_roots.push(root);
  }

  /// Remove and return every registered resource root.
  pub fn take_resource_roots(&mut self) -> Vec<ResourceRoot> {
    std::mem::take(&mut self.resource_roots)
  }

  /// Directory holding this unit's mount targets, once one has been created.
  pub fn scratch_area(&self) -> Option<&Path> {
    self.scratch_area.as_deref()
  }

  pub fn set_scratch_area(&mut self, dir: impl Into<PathBuf>) {
    self.scratch_area = Some(dir.into());
  }

  pub fn take_scratch_area(&mut self) -> Option<PathBuf> {
    self.scratch_area.take()
  }

  /// Paths of all module roots, in registration order.
  pub fn module_roots(&self) -> Vec<PathBuf> {
    self
      .resource_roots
      .iter()
      .filter(|root| root.is_module_root())
      .map(|root| root.path().to_path_buf())
      .collect()
  }

  pub fn mount_tracker(&self) -> Option<&MountTracker> {
    self.mount_tracker.as_ref()
  }

  pub fn mount_tracker_mut(&mut self) -> Option<&mut MountTracker> {
    self.mount_tracker.as_mut()
  }

  pub fn attach_mount_tracker(&mut self, tracker: MountTracker) {
    self.mount_tracker = Some(tracker);
  }

  pub fn detach_mount_tracker(&mut self) -> Option<MountTracker> {
    self.mount_tracker.take()
  }

  pub fn annotation_index(&self) -> AnnotationIndex {
    self.annotation_index
  }

  pub fn set_annotation_index(&mut self, index: AnnotationIndex) {
    self.annotation_index = index;
  }

  pub fn state(&self) -> MountState {
    self.state
  }

  pub fn set_state(&mut self, state: MountState) {
    self.state = state;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn descriptor(value: Value) -> Map<String, Value> {
    match value {
      Value::Object(map) => map,
      _ => unreachable!(),
    }
  }

  #[test]
  fn metadata_defaults() {
    let metadata = AppMetadata::from_descriptor("foo", &descriptor(json!({ "root": "/apps/foo" }))).unwrap();
    assert_eq!(metadata.root(), Path::new("/apps/foo"));
    assert_eq!(metadata.application_name(), "foo");
    assert!(metadata.resolve_dependencies());
    assert!(metadata.profiles().is_empty());
  }

  #[test]
  fn metadata_reads_all_fields() {
    let metadata = AppMetadata::from_descriptor(
      "foo",
      &descriptor(json!({ "root": "/apps/foo", "resolve_dependencies": false, "profiles": ["dev", "test"] })),
    )
    .unwrap();
    assert!(!metadata.resolve_dependencies());
    assert_eq!(metadata.profiles(), ["dev", "test"]);
  }

  #[test]
  fn empty_profile_table_means_no_profiles() {
    let metadata =
      AppMetadata::from_descriptor("foo", &descriptor(json!({ "root": "/apps/foo", "profiles": {} }))).unwrap();
    assert!(metadata.profiles().is_empty());
  }

  #[test]
  fn root_is_required() {
    let err = AppMetadata::from_descriptor("foo", &descriptor(json!({ "profiles": [] }))).unwrap_err();
    assert!(matches!(err, DescriptorError::MissingField("root")));

    let err = AppMetadata::from_descriptor("foo", &descriptor(json!({ "root": 7 }))).unwrap_err();
    assert!(matches!(err, DescriptorError::InvalidField { field: "root", .. }));
  }

  #[test]
  fn profiles_must_be_names() {
    let err =
      AppMetadata::from_descriptor("foo", &descriptor(json!({ "root": "/a", "profiles": ["dev", 3] }))).unwrap_err();
    assert!(matches!(err, DescriptorError::InvalidField { field: "profiles", .. }));
  }

  #[test]
  fn module_roots_follow_registration_order() {
    let mut unit = DeploymentUnit::new("foo.lua");
    unit.add_resource_root(ResourceRoot::mounted(MountHandle::new("/repo/a.jar", "/mnt/a")));
    unit.add_resource_root(ResourceRoot::directory("/apps/foo/resources"));

    assert_eq!(
      unit.module_roots(),
      vec![PathBuf::from("/mnt/a"), PathBuf::from("/apps/foo/resources")]
    );
    assert_eq!(unit.state(), MountState::NotStarted);
    assert_eq!(unit.annotation_index(), AnnotationIndex::Unset);
  }

  #[test]
  fn taking_roots_hands_back_mount_handles() {
    let mut unit = DeploymentUnit::new("foo.lua");
    unit.add_resource_root(ResourceRoot::mounted(MountHandle::new("/repo/a.jar", "/mnt/a")));
    unit.add_resource_root(ResourceRoot::directory("/apps/foo/resources"));

    let handles: Vec<_> = unit.take_resource_roots().into_iter().filter_map(ResourceRoot::into_mount).collect();
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].source(), Path::new("/repo/a.jar"));
    assert!(unit.module_roots().is_empty());
  }
}
