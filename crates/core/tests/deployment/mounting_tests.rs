//! Failure handling and cleanup around mounting.

use std::fs;

use immutant_core::{DeploymentUnit, DeploymentUnitProcessor, FailureKind, MountState};

use super::common::{TestEnv, write_jar};

#[test]
fn partial_failure_is_cleaned_up_by_undeploy() {
  let env = TestEnv::new();
  write_jar(&env.app_root.join("lib"), "a-1.0.jar", &[("a/core.lua", "return {}")]);
  env.write_file("lib/b-1.0.jar", "not a zip archive");

  let mounter = env.mounter();
  let mut unit = env.unit();

  let err = mounter.deploy(&mut unit).unwrap_err();
  assert_eq!(err.kind(), FailureKind::Mount);
  assert!(err.to_string().contains("b-1.0.jar"), "unexpected error: {err}");
  assert_eq!(unit.state(), MountState::Failed);

  // The first archive stays mounted; there is no rollback.
  assert_eq!(unit.mount_tracker().unwrap().len(), 1);
  assert!(env.scratch().exists());

  mounter.undeploy(&mut unit);
  assert!(!env.scratch().exists());
  assert!(unit.mount_tracker().is_none());
  assert_eq!(unit.state(), MountState::Undeployed);
}

#[test]
fn missing_dependency_is_a_resolution_failure() {
  let env = TestEnv::new();
  env.write_file("project.lua", r#"return { dependencies = { { "ring", "1.0" } } }"#);

  let mounter = env.mounter();
  let mut unit = env.unit();

  let err = mounter.deploy(&mut unit).unwrap_err();
  assert_eq!(err.kind(), FailureKind::DependencyResolution);
  assert_eq!(err.unit, "foo.lua");
  assert!(!env.scratch().exists());

  mounter.undeploy(&mut unit);
  assert_eq!(unit.state(), MountState::Undeployed);
}

#[test]
fn offline_deploy_uses_prefetched_archives() {
  let env = TestEnv::new();
  env.write_file("project.lua", r#"return { dependencies = { { "ring", "1.0" } } }"#);
  let ring = write_jar(&env.app_root.join("lib"), "ring-1.0.jar", &[("ring/core.lua", "return {}")]);

  let mut unit = DeploymentUnit::new("foo.lua").with_metadata(
    immutant_core::AppMetadata::new("foo", &env.app_root).with_resolve_dependencies(false),
  );
  env.mounter().deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  assert!(tracker.iter().any(|(_, original)| original == ring));
}

#[test]
fn missing_bundled_runtime_fails_the_deployment() {
  let env = TestEnv::new();
  fs::remove_file(env.install.bundled_language_runtime()).unwrap();

  let mounter = env.mounter();
  let mut unit = env.unit();

  let err = mounter.deploy(&mut unit).unwrap_err();
  assert_eq!(err.kind(), FailureKind::Mount);

  mounter.undeploy(&mut unit);
  assert!(!env.scratch().exists());
}

#[test]
fn archived_unit_needs_metadata() {
  let env = TestEnv::new();
  let mut unit = DeploymentUnit::new("foo.ima").archived();

  let err = env.mounter().deploy(&mut unit).unwrap_err();
  assert_eq!(err.kind(), FailureKind::MissingMetadata);
}

#[test]
fn each_deployment_gets_fresh_targets() {
  let env = TestEnv::new();
  write_jar(&env.app_root.join("lib"), "ring-1.0.jar", &[("ring/core.lua", "return {}")]);
  let mounter = env.mounter();

  let mut first = env.unit();
  mounter.deploy(&mut first).unwrap();
  let mut second = env.unit();
  mounter.deploy(&mut second).unwrap();

  let first_targets: Vec<_> = first.module_roots();
  for target in second.mount_tracker().unwrap().iter().map(|(target, _)| target) {
    assert!(!first_targets.iter().any(|t| t == target));
    assert!(target.starts_with(env.scratch()));
  }
}
