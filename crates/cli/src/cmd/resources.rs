//! Resources command: list an application's resource directories in order.

use std::path::Path;

use anyhow::Result;
use immutant_core::BootstrapGateway;

use crate::output::{OutputFormat, print_json};

pub fn cmd_resources(gateway: &BootstrapGateway, root: &Path, profiles: &[String], format: OutputFormat) -> Result<()> {
  let dirs = gateway.resource_dirs(root, profiles)?;

  if format.is_json() {
    print_json(&dirs)?;
  } else {
    for dir in dirs {
      println!("{}", dir);
    }
  }
  Ok(())
}
