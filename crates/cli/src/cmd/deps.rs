//! Deps command: list the archives an application depends on.

use std::path::Path;

use anyhow::Result;
use immutant_core::BootstrapGateway;

use crate::output::{OutputFormat, print_info, print_json};

pub fn cmd_deps(
  gateway: &BootstrapGateway,
  root: &Path,
  offline: bool,
  profiles: &[String],
  format: OutputFormat,
) -> Result<()> {
  let artifacts = gateway.get_dependencies(root, !offline, profiles)?;

  if format.is_json() {
    print_json(&artifacts)?;
  } else if artifacts.is_empty() {
    print_info(&format!("No dependencies for {}", root.display()));
  } else {
    for artifact in artifacts {
      println!("{}", artifact.display());
    }
  }
  Ok(())
}
