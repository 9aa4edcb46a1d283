//! Test utilities for immutant-core.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::ZipWriter;
use zip::write::SimpleFileOptions;

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

/// Write `content` to `root/relative`, creating parent directories.
pub fn write_file(root: &Path, relative: &str, content: &str) -> PathBuf {
  let path = root.join(relative);
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(&path, content).unwrap();
  path
}
