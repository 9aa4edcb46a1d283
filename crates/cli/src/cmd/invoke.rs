//! Invoke command: call one function in a managed runtime and print the result.

use std::path::PathBuf;

use anyhow::{Context, Result};
use immutant_runtime::{ManagedRuntime, Service};
use serde_json::Value;

use crate::output::print_json;

/// Each argument is parsed as JSON. The runtime is stopped whether or not the
/// call succeeds.
pub fn cmd_invoke(function: &str, roots: Vec<PathBuf>, args: &[String]) -> Result<()> {
  let args = args
    .iter()
    .map(|arg| serde_json::from_str(arg).with_context(|| format!("Argument is not valid JSON: {}", arg)))
    .collect::<Result<Vec<Value>>>()?;

  let runtime = ManagedRuntime::new("cli", roots)?;
  runtime.start()?;
  let result = runtime.invoke(function, args);
  let stopped = runtime.stop();

  let value = result?;
  stopped?;
  print_json(&value)
}
