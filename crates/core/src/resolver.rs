//! Turning declared dependency coordinates into artifact files.
//!
//! Computing a dependency graph is not done here; a resolver maps one
//! coordinate to one archive on disk.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Directory under an application root holding pre-fetched archives.
pub const LIB_DIR_NAME: &str = "lib";

const ARCHIVE_EXTENSION: &str = "jar";

#[derive(Debug, Error)]
pub enum ResolutionError {
  #[error("artifact {coordinate} not found (looked for {})", path.display())]
  Missing { coordinate: String, path: PathBuf },

  #[error("failed to list artifacts in {}: {source}", dir.display())]
  List {
    dir: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// A declared dependency: `group/artifact` plus a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
  pub group: String,
  pub artifact: String,
  pub version: String,
}

impl Coordinate {
  /// Parse a `group/artifact` name. A name without a group uses the artifact
  /// name as its group.
  pub fn parse(name: &str, version: impl Into<String>) -> Self {
    let (group, artifact) = name.split_once('/').unwrap_or((name, name));
    Self {
      group: group.to_string(),
      artifact: artifact.to_string(),
      version: version.into(),
    }
  }

  /// `<artifact>-<version>.jar`
  pub fn file_name(&self) -> String {
    format!("{}-{}.{}", self.artifact, self.version, ARCHIVE_EXTENSION)
  }
}

impl fmt::Display for Coordinate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}/{} {}", self.group, self.artifact, self.version)
  }
}

/// Maps a coordinate to an archive on disk.
pub trait DependencyResolver: Send + Sync {
  fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolutionError>;
}

/// A local repository in the Maven layout:
/// `<root>/<group as path>/<artifact>/<version>/<artifact>-<version>.jar`.
#[derive(Debug, Clone)]
pub struct LocalRepository {
  root: PathBuf,
}

impl LocalRepository {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  pub fn artifact_path(&self, coordinate: &Coordinate) -> PathBuf {
    let mut path = self.root.clone();
    path.extend(coordinate.group.split('.'));
    path.push(&coordinate.artifact);
    path.push(&coordinate.version);
    path.push(coordinate.file_name());
    path
  }
}

impl DependencyResolver for LocalRepository {
  fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolutionError> {
    existing(coordinate, self.artifact_path(coordinate))
  }
}

/// Archives already fetched into an application's `lib` directory. Used when
/// resolution is turned off for a deployment.
#[derive(Debug, Clone)]
pub struct CachedArtifacts {
  lib_dir: PathBuf,
}

impl CachedArtifacts {
  pub fn for_app(app_root: &Path) -> Self {
    Self {
      lib_dir: app_root.join(LIB_DIR_NAME),
    }
  }
}

impl DependencyResolver for CachedArtifacts {
  fn resolve(&self, coordinate: &Coordinate) -> Result<PathBuf, ResolutionError> {
    existing(coordinate, self.lib_dir.join(coordinate.file_name()))
  }
}

fn existing(coordinate: &Coordinate, path: PathBuf) -> Result<PathBuf, ResolutionError> {
  if path.is_file() {
    debug!("resolved {} to {}", coordinate, path.display());
    Ok(path)
  } else {
    Err(ResolutionError::Missing {
      coordinate: coordinate.to_string(),
      path,
    })
  }
}

/// Every archive in `dir`, sorted by file name. A missing directory holds
/// nothing.
pub fn list_archives(dir: &Path) -> Result<Vec<PathBuf>, ResolutionError> {
  let entries = match fs::read_dir(dir) {
    Ok(entries) => entries,
    Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
    Err(source) => {
      return Err(ResolutionError::List {
        dir: dir.to_path_buf(),
        source,
      });
    }
  };

  let mut archives = Vec::new();
  for entry in entries {
    let path = entry
      .map_err(|source| ResolutionError::List {
        dir: dir.to_path_buf(),
        source,
      })?
      .path();
    if path.is_file() && path.extension().is_some_and(|ext| ext == ARCHIVE_EXTENSION) {
      archives.push(path);
    }
  }
  archives.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
  Ok(archives)
}
