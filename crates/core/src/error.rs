//! Error types for immutant-core

use std::io;
use std::path::PathBuf;

use immutant_runtime::{InvocationError, RuntimeError};
use thiserror::Error;

/// Errors raised by bootstrap operations run against the global runtime.
#[derive(Debug, Error)]
pub enum BootstrapError {
  #[error("failed to initialize the bootstrap runtime: {0}")]
  Runtime(#[from] RuntimeError),

  #[error("failed to parse descriptor {}: {source}", path.display())]
  DescriptorParse {
    path: PathBuf,
    #[source]
    source: InvocationError,
  },

  #[error("invalid descriptor {}: {source}", path.display())]
  InvalidDescriptor {
    path: PathBuf,
    #[source]
    source: DescriptorError,
  },

  #[error("failed to resolve dependencies for {}: {source}", root.display())]
  DependencyResolution {
    root: PathBuf,
    #[source]
    source: InvocationError,
  },

  #[error("bootstrap operation '{operation}' failed: {source}")]
  Invocation {
    operation: &'static str,
    #[source]
    source: InvocationError,
  },
}

/// A parsed descriptor that lacks what a deployment needs.
#[derive(Debug, Error)]
pub enum DescriptorError {
  #[error("missing required field '{0}'")]
  MissingField(&'static str),

  #[error("field '{field}' must be {expected}")]
  InvalidField { field: &'static str, expected: &'static str },
}

#[derive(Debug, Error)]
pub enum MountError {
  #[error("failed to create scratch area in {}: {source}", dir.display())]
  Scratch {
    dir: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to create mount target for {} in {}: {source}", archive.display(), dir.display())]
  Target {
    archive: PathBuf,
    dir: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to open archive {}: {source}", archive.display())]
  Open {
    archive: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to read archive {}: {source}", archive.display())]
  Archive {
    archive: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("archive path has no file name: {}", .0.display())]
  NoFileName(PathBuf),
}

/// What went wrong while processing a deployment unit.
#[derive(Debug, Error)]
pub enum ProcessingFailure {
  #[error("archived deployment carries no application metadata")]
  MissingMetadata,

  #[error(transparent)]
  Bootstrap(#[from] BootstrapError),

  #[error(transparent)]
  Mount(#[from] MountError),
}

/// Coarse classification of a [`ProcessingFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
  MissingMetadata,
  Runtime,
  DescriptorParse,
  DependencyResolution,
  Invocation,
  Mount,
}

/// The single error a deployment step reports to the host.
#[derive(Debug, Error)]
#[error("failed to process deployment unit '{unit}': {cause}")]
pub struct DeploymentProcessingError {
  pub unit: String,
  #[source]
  pub cause: ProcessingFailure,
}

impl DeploymentProcessingError {
  pub fn kind(&self) -> FailureKind {
    match &self.cause {
      ProcessingFailure::MissingMetadata => FailureKind::MissingMetadata,
      ProcessingFailure::Mount(_) => FailureKind::Mount,
      ProcessingFailure::Bootstrap(err) => match err {
        BootstrapError::Runtime(_) => FailureKind::Runtime,
        BootstrapError::DescriptorParse { .. } | BootstrapError::InvalidDescriptor { .. } => {
          FailureKind::DescriptorParse
        }
        BootstrapError::DependencyResolution { .. } => FailureKind::DependencyResolution,
        BootstrapError::Invocation { .. } => FailureKind::Invocation,
      },
    }
  }
}
