//! Running application code over the module roots of a deployment.

use immutant_core::{BootstrapGateway, DeploymentUnitProcessor};
use immutant_runtime::{InvocationError, ManagedRuntime, Service, invoke};
use serde_json::json;

use super::common::{TestEnv, write_jar};

fn deployed_app(env: &TestEnv) -> immutant_core::DeploymentUnit {
  write_jar(
    &env.app_root.join("lib"),
    "ring-1.0.jar",
    &[(
      "ring/core.lua",
      r#"
        local M = {}
        M["wrap"] = function(body) return "<" .. body .. ">" end
        return M
      "#,
    )],
  );
  env.write_file(
    "src/app/handler.lua",
    r#"
      local ring = require("ring.core")
      local runtime = require("immutant.runtime")
      local M = { stopped = false }
      M["handle"] = function(name) return ring.wrap("hello " .. name) end
      M["start"] = function() runtime["on-shutdown"](function() M.stopped = true end) end
      M["stopped?"] = function() return M.stopped end
      return M
    "#,
  );

  let mut unit = env.unit();
  env.mounter().deploy(&mut unit).unwrap();
  unit
}

#[test]
fn app_code_requires_mounted_dependencies() {
  let env = TestEnv::new();
  let unit = deployed_app(&env);

  let runtime = ManagedRuntime::new("foo", unit.module_roots()).unwrap();
  assert_eq!(invoke!(runtime, "app.handler/handle", "bob").unwrap(), json!("<hello bob>"));
}

#[test]
fn stop_runs_registered_shutdown_hooks() {
  let env = TestEnv::new();
  let unit = deployed_app(&env);

  let runtime = ManagedRuntime::new("foo", unit.module_roots()).unwrap();
  runtime.start().unwrap();
  runtime.invoke("app.handler/start", Vec::new()).unwrap();
  runtime.stop().unwrap();

  assert_eq!(runtime.invoke("app.handler/stopped?", Vec::new()).unwrap(), json!(true));
}

#[test]
fn app_modules_are_invisible_to_other_runtimes() {
  let env = TestEnv::new();
  let unit = deployed_app(&env);

  let other = ManagedRuntime::new("bar", Vec::new()).unwrap();
  let err = other.invoke("app.handler/handle", vec![json!("bob")]).unwrap_err();
  assert!(matches!(err, InvocationError::Lua { .. }));

  let runtime = ManagedRuntime::new("foo", unit.module_roots()).unwrap();
  assert!(runtime.invoke("app.handler/handle", vec![json!("bob")]).is_ok());
}

#[test]
fn bootstrap_runs_outside_the_application_context() {
  let env = TestEnv::new();
  let unit = deployed_app(&env);
  let runtime = ManagedRuntime::new("foo", unit.module_roots()).unwrap();
  let gateway = BootstrapGateway::with_repository(&env.repo);

  // A bootstrap call made while the app context is active sees only the
  // bootstrap namespace, and the app context is intact afterwards.
  let dirs = immutant_runtime::isolation::run_in(runtime.context().clone(), || {
    let dirs = gateway.resource_dirs(&env.app_root, &[]).unwrap();
    assert_eq!(
      immutant_runtime::isolation::current().map(|ctx| ctx.name().to_string()),
      Some("foo".to_string())
    );
    dirs
  });
  assert_eq!(dirs.len(), 3);
}
