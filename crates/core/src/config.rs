//! Installation layout and environment-derived configuration.

use std::fs;
use std::path::{Path, PathBuf};

use crate::deployment::RuntimeVersion;

/// Directory under an application root that holds its mounted archives.
pub const SCRATCH_DIR_NAME: &str = ".tmp_jar_mounts";

/// Bundled artifacts, relative to the install root.
pub const BUNDLED_MODULE_DIR: &str = "modules/org/immutant/core/main";

/// Language runtime archive used when an application does not ship one.
pub const LANGUAGE_RUNTIME_ARCHIVE: &str = "clojure.jar";

/// Runtime support archive mounted into every application.
pub const RUNTIME_SUPPORT_ARCHIVE: &str = "immutant-runtime-impl.jar";

/// Records the version of the bundled language runtime, next to the archive.
const LANGUAGE_VERSION_FILE: &str = "clojure.version";

const UNKNOWN_VERSION: &str = "unknown";

/// Where the host is installed and where dependencies are resolved from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallConfig {
  install_root: PathBuf,
  repository: PathBuf,
}

impl InstallConfig {
  pub fn new(install_root: impl Into<PathBuf>, repository: impl Into<PathBuf>) -> Self {
    Self {
      install_root: install_root.into(),
      repository: repository.into(),
    }
  }

  /// Resolve both locations from the environment.
  pub fn from_env() -> Self {
    Self::new(install_root(), repository_dir())
  }

  pub fn with_install_root(mut self, install_root: impl Into<PathBuf>) -> Self {
    self.install_root = install_root.into();
    self
  }

  pub fn with_repository(mut self, repository: impl Into<PathBuf>) -> Self {
    self.repository = repository.into();
    self
  }

  pub fn install_root(&self) -> &Path {
    &self.install_root
  }

  pub fn repository(&self) -> &Path {
    &self.repository
  }

  pub fn bundled_dir(&self) -> PathBuf {
    self.install_root.join(BUNDLED_MODULE_DIR)
  }

  pub fn bundled_language_runtime(&self) -> PathBuf {
    self.bundled_dir().join(LANGUAGE_RUNTIME_ARCHIVE)
  }

  pub fn runtime_support_archive(&self) -> PathBuf {
    self.bundled_dir().join(RUNTIME_SUPPORT_ARCHIVE)
  }

  /// Version of the bundled language runtime, or `"unknown"` when the
  /// installation does not record one.
  pub fn language_version(&self) -> String {
    fs::read_to_string(self.bundled_dir().join(LANGUAGE_VERSION_FILE))
      .ok()
      .map(|version| version.trim().to_string())
      .filter(|version| !version.is_empty())
      .unwrap_or_else(|| UNKNOWN_VERSION.to_string())
  }
}

impl RuntimeVersion for InstallConfig {
  fn runtime_language_version(&self) -> String {
    self.language_version()
  }
}

/// Returns the installation root: `IMMUTANT_HOME`, then `JBOSS_HOME`, then the
/// current directory.
pub fn install_root() -> PathBuf {
  ["IMMUTANT_HOME", "JBOSS_HOME"]
    .iter()
    .find_map(|var| std::env::var_os(var).filter(|value| !value.is_empty()))
    .map(PathBuf::from)
    .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Returns the local artifact repository: `IMMUTANT_REPOSITORY`, then
/// `~/.m2/repository`.
pub fn repository_dir() -> PathBuf {
  std::env::var_os("IMMUTANT_REPOSITORY")
    .filter(|value| !value.is_empty())
    .map(PathBuf::from)
    .unwrap_or_else(|| {
      dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".m2")
        .join("repository")
    })
}
