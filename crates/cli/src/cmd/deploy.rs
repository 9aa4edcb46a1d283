//! Deploy command: run one deploy/undeploy cycle for a descriptor.
//!
//! Mounts everything the application needs, reports the resulting module
//! roots and mount records, then undeploys unless `--keep` is given.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use immutant_core::{BootstrapGateway, DependencyMounter, DeploymentUnit, DeploymentUnitProcessor, InstallConfig};
use serde::Serialize;
use tracing::debug;

use super::application_name;
use crate::output::{
  OutputFormat, format_duration, print_error, print_info, print_json, print_mapping, print_stat, print_success,
};

#[derive(Debug, Serialize)]
struct MountRecord {
  mounted: PathBuf,
  original: PathBuf,
}

#[derive(Debug, Serialize)]
struct DeployReport {
  unit: String,
  state: String,
  module_roots: Vec<PathBuf>,
  mounts: Vec<MountRecord>,
  kept: bool,
}

pub fn cmd_deploy(descriptor: &Path, install: InstallConfig, keep: bool, format: OutputFormat) -> Result<()> {
  let gateway = Arc::new(BootstrapGateway::with_repository(install.repository()));
  let name = application_name(descriptor);
  let metadata = gateway.read_app_metadata(&name, descriptor)?;

  let unit_name = descriptor
    .file_name()
    .map(|file| file.to_string_lossy().into_owned())
    .unwrap_or_else(|| name.clone());
  let mut unit = DeploymentUnit::new(unit_name).with_metadata(metadata);
  let mounter = DependencyMounter::new(gateway, install);

  let start = Instant::now();
  if let Err(e) = mounter.deploy(&mut unit) {
    if !format.is_json() {
      print_error(&format!("Deployment of {} failed", name));
    }
    mounter.undeploy(&mut unit);
    return Err(e.into());
  }
  let elapsed = start.elapsed();
  debug!("deployed {} in {:?}", name, elapsed);

  let report = report(&unit, keep);
  if !keep {
    mounter.undeploy(&mut unit);
  }

  if format.is_json() {
    print_json(&report)?;
  } else {
    print_success(&format!("Deployed {} in {}", name, format_duration(elapsed)));
    print_stat("State", &report.state);
    print_stat("Module roots", &report.module_roots.len().to_string());
    for root in &report.module_roots {
      println!("    {}", root.display());
    }
    println!();
    println!("Mounts:");
    for mount in &report.mounts {
      print_mapping(&mount.original.display().to_string(), &mount.mounted.display().to_string());
    }
    println!();
    if keep {
      print_info("Kept mounted archives in place");
    } else {
      print_info(&format!("Undeployed {}", name));
    }
  }

  Ok(())
}

fn report(unit: &DeploymentUnit, kept: bool) -> DeployReport {
  let mut mounts: Vec<MountRecord> = unit
    .mount_tracker()
    .map(|tracker| {
      tracker
        .iter()
        .map(|(mounted, original)| MountRecord {
          mounted: mounted.to_path_buf(),
          original: original.to_path_buf(),
        })
        .collect()
    })
    .unwrap_or_default();
  mounts.sort_by(|a, b| a.original.cmp(&b.original));

  DeployReport {
    unit: unit.name().to_string(),
    state: format!("{:?}", unit.state()),
    module_roots: unit.module_roots(),
    mounts,
    kept,
  }
}
