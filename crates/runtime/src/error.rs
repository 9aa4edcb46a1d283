//! Error types for immutant-runtime

use thiserror::Error;

/// Errors raised while building a runtime.
#[derive(Debug, Error)]
pub enum RuntimeError {
  #[error("failed to initialize Lua runtime '{name}': {source}")]
  Init {
    name: String,
    #[source]
    source: mlua::Error,
  },

  #[error("failed to load module '{module}': {source}")]
  Module {
    module: String,
    #[source]
    source: mlua::Error,
  },
}

/// Errors raised by a call into a runtime.
///
/// The runtime's own failure is carried untranslated as the source; callers
/// interpret it themselves.
#[derive(Debug, Error)]
pub enum InvocationError {
  /// The target module loaded, but does not export a function under that name.
  #[error("function '{function}' not found")]
  FunctionNotFound { function: String },

  /// Loading the target, or the call itself, raised an error inside the runtime.
  #[error("invocation of '{function}' failed: {source}")]
  Lua {
    function: String,
    #[source]
    source: mlua::Error,
  },

  /// An argument or the result could not cross the runtime boundary.
  #[error("cannot convert value for '{function}': {source}")]
  Conversion {
    function: String,
    #[source]
    source: mlua::Error,
  },

  /// The call returned, but not the shape the caller asked for.
  #[error("'{function}' returned {found}, expected {expected}")]
  UnexpectedResult {
    function: String,
    expected: &'static str,
    found: String,
  },
}

impl InvocationError {
  pub fn function(&self) -> &str {
    match self {
      Self::FunctionNotFound { function }
      | Self::Lua { function, .. }
      | Self::Conversion { function, .. }
      | Self::UnexpectedResult { function, .. } => function,
    }
  }
}
