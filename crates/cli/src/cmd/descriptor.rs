//! Descriptor command: print a descriptor as the bootstrap runtime reads it.

use std::path::Path;

use anyhow::Result;
use immutant_core::BootstrapGateway;

use crate::output::print_json;

pub fn cmd_descriptor(gateway: &BootstrapGateway, descriptor: &Path) -> Result<()> {
  let map = gateway.parse_descriptor(descriptor)?;
  print_json(&map)
}
