//! immutant-core: deployment-time bootstrap and mounting
//!
//! This crate provides:
//! - `BootstrapGateway`: bootstrap operations run against the global runtime
//! - `DependencyMounter`: mounts an application's dependencies as module roots
//! - `MountTracker`: maps mounted paths back to the artifacts they came from
//! - `InstallConfig`: where the host is installed and resolves artifacts from

pub mod bootstrap;
pub mod config;
pub mod deployment;
pub mod error;
pub mod mount;
pub mod resolver;
mod util;

pub use bootstrap::{BOOTSTRAP_NAMESPACE, BootstrapGateway};
pub use config::InstallConfig;
pub use deployment::{
  AnnotationIndex, AppMetadata, DependencyMounter, DeploymentUnit, DeploymentUnitProcessor, MountState, ResourceRoot,
  RuntimeVersion,
};
pub use error::{
  BootstrapError, DeploymentProcessingError, DescriptorError, FailureKind, MountError, ProcessingFailure,
};
pub use mount::{ArchiveMounter, MountHandle, MountTracker, ZipMounter};
pub use resolver::{Coordinate, DependencyResolver, LocalRepository, ResolutionError};
