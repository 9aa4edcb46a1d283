//! Invocation bridge for a managed application runtime.
//!
//! A [`ManagedRuntime`] owns one runtime instance and the application context
//! it runs in. Every call goes through an [`IsolationExecutor`] targeted at that
//! context, so modules are resolved from the application's module roots no
//! matter which context the calling thread had.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use tracing::info;

use crate::error::{InvocationError, RuntimeError};
use crate::isolation::{IsolationExecutor, RuntimeContext};
use crate::lua::{DynamicRuntime, LuaRuntime};

/// Stops all background work owned by a managed runtime.
pub const SHUTDOWN_FUNCTION: &str = "immutant.runtime/shutdown-agents";

/// Lifecycle callbacks driven by the host.
pub trait Service {
  type Error;

  fn start(&self) -> Result<(), Self::Error>;
  fn stop(&self) -> Result<(), Self::Error>;
}

/// A named runtime instance bound to its application context.
pub struct ManagedRuntime<R = LuaRuntime> {
  name: String,
  executor: IsolationExecutor,
  runtime: R,
  stop_lock: Mutex<()>,
}

impl ManagedRuntime<LuaRuntime> {
  /// Build a Lua runtime for `name` that resolves modules from `module_roots`.
  pub fn new(name: impl Into<String>, module_roots: Vec<PathBuf>) -> Result<Self, RuntimeError> {
    let name = name.into();
    let context = Arc::new(RuntimeContext::new(name.clone(), module_roots));
    let runtime = LuaRuntime::new(name.clone())?;
    Ok(Self::with_runtime(name, context, runtime))
  }
}

impl<R: DynamicRuntime> ManagedRuntime<R> {
  pub fn with_runtime(name: impl Into<String>, context: Arc<RuntimeContext>, runtime: R) -> Self {
    Self {
      name: name.into(),
      executor: IsolationExecutor::new(context),
      runtime,
      stop_lock: Mutex::new(()),
    }
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn context(&self) -> &Arc<RuntimeContext> {
    self.executor.context()
  }

  pub fn runtime(&self) -> &R {
    &self.runtime
  }

  /// Call `function` with any number of untyped arguments.
  ///
  /// Arguments are not validated. A missing function or a failure raised by
  /// the function is returned as-is; nothing is retried.
  pub fn invoke(&self, function: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
    self.executor.run_isolated(|| self.runtime.invoke(function, args))
  }
}

impl<R: DynamicRuntime> Service for ManagedRuntime<R> {
  type Error = InvocationError;

  /// The runtime is initialized before the service starts.
  fn start(&self) -> Result<(), InvocationError> {
    Ok(())
  }

  fn stop(&self) -> Result<(), InvocationError> {
    let _stopping = self.stop_lock.lock().unwrap_or_else(PoisonError::into_inner);
    info!("Shutting down runtime for {}", self.name);
    self.invoke(SHUTDOWN_FUNCTION, Vec::new()).map(|_| ())
  }
}

impl<R> std::fmt::Debug for ManagedRuntime<R> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ManagedRuntime")
      .field("name", &self.name)
      .field("context", self.executor.context())
      .finish_non_exhaustive()
  }
}

/// Invoke a function on a [`ManagedRuntime`] with arguments of any type that
/// converts into `serde_json::Value`.
///
/// ```ignore
/// let reply = invoke!(runtime, "app.handler/greet", "world", 3)?;
/// ```
#[macro_export]
macro_rules! invoke {
  ($runtime:expr, $function:expr $(, $arg:expr)* $(,)?) => {
    $runtime.invoke($function, vec![$(::serde_json::Value::from($arg)),*])
  };
}
