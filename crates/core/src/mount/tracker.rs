//! Record of where each archive of a deployment was mounted.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maps a mounted (sandboxed) path back to the artifact it came from.
///
/// One tracker belongs to one deployment unit. Iteration order is unspecified.
#[derive(Debug, Default, Clone)]
pub struct MountTracker {
  mounts: HashMap<PathBuf, PathBuf>,
}

impl MountTracker {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a mount. Returns the previously recorded original if the
  /// sandboxed path was already tracked.
  pub fn put(&mut self, sandboxed: impl Into<PathBuf>, original: impl Into<PathBuf>) -> Option<PathBuf> {
    self.mounts.insert(sandboxed.into(), original.into())
  }

  pub fn get(&self, sandboxed: &Path) -> Option<&Path> {
    self.mounts.get(sandboxed).map(PathBuf::as_path)
  }

  pub fn len(&self) -> usize {
    self.mounts.len()
  }

  pub fn is_empty(&self) -> bool {
    self.mounts.is_empty()
  }

  /// (sandboxed, original) pairs.
  pub fn iter(&self) -> impl Iterator<Item = (&Path, &Path)> {
    self
      .mounts
      .iter()
      .map(|(sandboxed, original)| (sandboxed.as_path(), original.as_path()))
  }

  /// Map any path inside a mounted root back to its artifact and the path of
  /// the entry within that artifact.
  ///
  /// Used to turn locations reported by a runtime (e.g. in a stack trace)
  /// into something a user recognizes.
  pub fn locate(&self, path: &Path) -> Option<(&Path, PathBuf)> {
    self
      .mounts
      .iter()
      .filter_map(|(sandboxed, original)| {
        path
          .strip_prefix(sandboxed)
          .ok()
          .map(|inner| (sandboxed.components().count(), original.as_path(), inner.to_path_buf()))
      })
      .max_by_key(|(depth, _, _)| *depth)
      .map(|(_, original, inner)| (original, inner))
  }
}
