//! Config command: print an application's full configuration.

use std::path::{Path, PathBuf};

use anyhow::Result;
use immutant_core::BootstrapGateway;

use super::application_name;

/// Prints the configuration exactly as handed to the application runtime.
///
/// Without `--root`, the root named by the descriptor is used.
pub fn cmd_config(gateway: &BootstrapGateway, descriptor: &Path, root: Option<PathBuf>) -> Result<()> {
  let root = match root {
    Some(root) => root,
    None => gateway
      .read_app_metadata(&application_name(descriptor), descriptor)?
      .root()
      .to_path_buf(),
  };

  println!("{}", gateway.read_full_app_config_as_string(descriptor, &root)?);
  Ok(())
}
