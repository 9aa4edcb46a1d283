//! immutant-runtime: managed Lua runtimes for hosted applications
//!
//! This crate provides:
//! - `isolation`: per-thread execution contexts and the scoped executor that
//!   swaps them
//! - `lua`: the embedded Lua runtime with context-aware module loading
//! - `managed`: the invocation bridge for a running application runtime
//! - `convert`: Lua value <-> plain data conversion used at the boundary

pub mod convert;
pub mod error;
pub mod isolation;
pub mod lua;
pub mod managed;

pub use error::{InvocationError, RuntimeError};
pub use isolation::{ContextGuard, IsolationExecutor, RuntimeContext};
pub use lua::{DynamicRuntime, LuaRuntime, SUPPORT_NAMESPACE};
pub use managed::{ManagedRuntime, SHUTDOWN_FUNCTION, Service};
