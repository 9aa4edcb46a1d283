//! Shared test helpers for deployment integration tests.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use immutant_core::{
  AppMetadata, BootstrapGateway, Coordinate, DependencyMounter, DependencyResolver, DeploymentUnit, InstallConfig,
  LocalRepository, ResolutionError,
};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Version recorded for the bundled language runtime.
pub const BUNDLED_VERSION: &str = "1.4.0";

/// Resolves every coordinate to `<dir>/<artifact>-<version>.jar`, whether or
/// not it exists.
pub struct DirResolver(pub PathBuf);

impl DependencyResolver for DirResolver {
  fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolutionError> {
    Ok(self.0.join(coordinate.file_name()))
  }
}

/// Isolated install, repository and application root.
pub struct TestEnv {
  pub _temp: TempDir,
  pub app_root: PathBuf,
  pub repo: PathBuf,
  pub install: InstallConfig,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    let app_root = temp.path().join("apps").join("foo");
    let repo = temp.path().join("repo");
    let install = InstallConfig::new(temp.path().join("install"), &repo);
    fs::create_dir_all(&app_root).unwrap();

    let bundled = install.bundled_dir();
    write_jar(&bundled, "clojure.jar", &[("clojure/core.lua", "return { bundled = true }")]);
    write_jar(
      &bundled,
      "immutant-runtime-impl.jar",
      &[("immutant/runtime/impl.lua", "return { impl = true }")],
    );
    fs::write(bundled.join("clojure.version"), BUNDLED_VERSION).unwrap();

    Self {
      _temp: temp,
      app_root,
      repo,
      install,
    }
  }

  /// Write a file relative to the application root.
  pub fn write_file(&self, relative_path: &str, content: &str) -> PathBuf {
    let path = self.app_root.join(relative_path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(&path, content).unwrap();
    path
  }

  pub fn scratch(&self) -> PathBuf {
    self.app_root.join(".tmp_jar_mounts")
  }

  pub fn unit(&self) -> DeploymentUnit {
    DeploymentUnit::new("foo.lua").with_metadata(AppMetadata::new("foo", &self.app_root))
  }

  /// A mounter resolving from the local repository.
  pub fn mounter(&self) -> DependencyMounter {
    self.mounter_with(Arc::new(LocalRepository::new(&self.repo)))
  }

  pub fn mounter_with(&self, resolver: Arc<dyn DependencyResolver>) -> DependencyMounter {
    DependencyMounter::new(Arc::new(BootstrapGateway::new(resolver)), self.install.clone())
  }
}

/// Write a zip archive named `name` under `dir` holding the given entries.
pub fn write_jar(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
  fs::create_dir_all(dir).unwrap();
  let path = dir.join(name);
  let mut zip = ZipWriter::new(File::create(&path).unwrap());
  for (entry, content) in entries {
    zip.start_file(*entry, SimpleFileOptions::default()).unwrap();
    zip.write_all(content.as_bytes()).unwrap();
  }
  zip.finish().unwrap();
  path
}
