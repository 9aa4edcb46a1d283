//! The canonical deployment: one declared dependency, no shipped language
//! runtime, one resource directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use immutant_core::{AnnotationIndex, DeploymentUnitProcessor, MountState};
use tracing_test::traced_test;

use super::common::{BUNDLED_VERSION, DirResolver, TestEnv, write_jar};

const PROJECT: &str = r#"
return {
  name = "foo",
  dependencies = { { "ring", "1.0" } },
  source_paths = {},
  resource_paths = { "resources" },
  compile_path = false,
}
"#;

#[test]
#[traced_test]
fn deploys_dependency_fallback_and_support() {
  let env = TestEnv::new();
  env.write_file("project.lua", PROJECT);
  let ring = write_jar(&env.repo, "ring-1.0.jar", &[("ring/core.lua", "return {}")]);

  let mounter = env.mounter_with(Arc::new(DirResolver(env.repo.clone())));
  let mut unit = env.unit();
  mounter.deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  assert_eq!(tracker.len(), 3);
  let mut originals: Vec<PathBuf> = tracker.iter().map(|(_, original)| original.to_path_buf()).collect();
  originals.sort();
  let mut expected = vec![
    ring.clone(),
    env.install.bundled_language_runtime(),
    env.install.runtime_support_archive(),
  ];
  expected.sort();
  assert_eq!(originals, expected);

  let directories: Vec<&Path> = unit
    .resource_roots()
    .iter()
    .filter(|root| root.mount().is_none())
    .map(|root| root.path())
    .collect();
  assert_eq!(directories, vec![env.app_root.join("resources")]);
  assert!(unit.resource_roots().iter().all(|root| root.is_module_root()));

  assert_eq!(unit.state(), MountState::Mounted);
  assert_eq!(unit.annotation_index(), AnnotationIndex::Empty);
  assert!(logs_contain(&format!(
    "No clojure.jar found within foo, using built-in clojure.jar (v{})",
    BUNDLED_VERSION
  )));
}

#[test]
fn module_roots_are_ordered() {
  let env = TestEnv::new();
  env.write_file("project.lua", PROJECT);
  let ring = write_jar(&env.repo, "ring-1.0.jar", &[("ring/core.lua", "return {}")]);

  let mounter = env.mounter_with(Arc::new(DirResolver(env.repo.clone())));
  let mut unit = env.unit();
  mounter.deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  let origins: Vec<PathBuf> = unit
    .module_roots()
    .iter()
    .map(|root| tracker.get(root).map(Path::to_path_buf).unwrap_or_else(|| root.clone()))
    .collect();

  assert_eq!(
    origins,
    vec![
      ring,
      env.install.bundled_language_runtime(),
      env.install.runtime_support_archive(),
      env.app_root.join("resources"),
    ]
  );
}

#[test]
fn resource_dirs_follow_declaration_order() {
  let env = TestEnv::new();
  env.write_file(
    "project.lua",
    r#"return { source_paths = {}, resource_paths = { "resources" } }"#,
  );

  let mut unit = env.unit();
  env.mounter().deploy(&mut unit).unwrap();

  let directories: Vec<PathBuf> = unit
    .resource_roots()
    .iter()
    .filter(|root| root.mount().is_none())
    .map(|root| root.path().to_path_buf())
    .collect();
  assert_eq!(
    directories,
    vec![env.app_root.join("resources"), env.app_root.join("classes")]
  );
}

#[test]
#[traced_test]
fn every_app_without_a_runtime_gets_one_fallback() {
  let env = TestEnv::new();
  write_jar(&env.app_root.join("lib"), "ring-1.0.jar", &[("ring/core.lua", "return {}")]);
  write_jar(
    &env.app_root.join("lib"),
    "compojure-1.2.jar",
    &[("compojure/core.lua", "return {}")],
  );

  let mut unit = env.unit();
  env.mounter().deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  let fallbacks = tracker
    .iter()
    .filter(|(_, original)| *original == env.install.bundled_language_runtime())
    .count();
  assert_eq!(fallbacks, 1);
  assert_eq!(tracker.len(), 4);
  assert!(logs_contain("No clojure.jar found within foo"));
}

#[test]
#[traced_test]
fn shipped_runtime_means_no_fallback() {
  let env = TestEnv::new();
  write_jar(
    &env.app_root.join("lib"),
    "clojure-1.4.0.jar",
    &[("clojure/core.lua", "return {}")],
  );

  let mut unit = env.unit();
  env.mounter().deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  assert!(
    tracker
      .iter()
      .all(|(_, original)| original != env.install.bundled_language_runtime())
  );
  assert_eq!(tracker.len(), 2);
  assert!(!logs_contain("No clojure.jar found"));
}

#[test]
fn two_part_versions_do_not_count_as_a_runtime() {
  let env = TestEnv::new();
  write_jar(
    &env.app_root.join("lib"),
    "clojure-1.10.jar",
    &[("clojure/core.lua", "return {}")],
  );

  let mut unit = env.unit();
  env.mounter().deploy(&mut unit).unwrap();

  let tracker = unit.mount_tracker().unwrap();
  assert!(
    tracker
      .iter()
      .any(|(_, original)| original == env.install.bundled_language_runtime())
  );
}
