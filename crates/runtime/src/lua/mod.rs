//! Embedded Lua runtime.
//!
//! A [`LuaRuntime`] is one Lua state with:
//! - the context-aware module searcher from [`loaders`]
//! - a `log` global forwarding to `tracing`
//! - the `immutant.runtime` support namespace preloaded
//!
//! Named functions are addressed as `"module.path/function"`; the module is
//! loaded with `require` and the function is looked up as a field of it. A name
//! without `/` refers to a global function.

pub mod loaders;

use mlua::prelude::*;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::convert::{json_to_lua, lua_to_json};
use crate::error::{InvocationError, RuntimeError};

/// Namespace of the runtime support module.
pub const SUPPORT_NAMESPACE: &str = "immutant.runtime";

const SUPPORT_SOURCE: &str = include_str!("support.lua");

/// Something that can call a named function with untyped arguments.
///
/// No checking is done on arity or argument types; caller and callee agree on
/// those out of band.
pub trait DynamicRuntime: Send + Sync {
  fn invoke(&self, function: &str, args: Vec<Value>) -> Result<Value, InvocationError>;
}

/// A Lua state prepared for hosting application or bootstrap code.
pub struct LuaRuntime {
  name: String,
  lua: Lua,
}

impl LuaRuntime {
  pub fn new(name: impl Into<String>) -> Result<Self, RuntimeError> {
    let name = name.into();
    let lua = Lua::new();

    Self::prepare(&lua).map_err(|source| RuntimeError::Init {
      name: name.clone(),
      source,
    })?;

    let runtime = Self { name, lua };
    runtime.preload(SUPPORT_NAMESPACE, SUPPORT_SOURCE)?;
    debug!("created Lua runtime '{}'", runtime.name);
    Ok(runtime)
  }

  fn prepare(lua: &Lua) -> LuaResult<()> {
    loaders::install_loaders(lua)?;
    register_log(lua)?;
    Ok(())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Get access to the raw Lua state.
  pub fn lua(&self) -> &Lua {
    &self.lua
  }

  /// Register Lua source as a module loadable from every context.
  pub fn preload(&self, module: &str, source: &str) -> Result<(), RuntimeError> {
    let register = || -> LuaResult<()> {
      let loader = self
        .lua
        .load(source)
        .set_name(format!("={}", module))
        .into_function()?;
      let preload: LuaTable = self.lua.globals().get::<LuaTable>("package")?.get("preload")?;
      preload.set(module, loader)
    };
    register().map_err(|source| RuntimeError::Module {
      module: module.to_string(),
      source,
    })
  }

  /// Register an already-built table as a loaded module.
  pub fn provide(&self, module: &str, table: LuaTable) -> Result<(), RuntimeError> {
    let register = || -> LuaResult<()> {
      let loaded: LuaTable = self.lua.globals().get::<LuaTable>("package")?.get("loaded")?;
      loaded.set(module, table)
    };
    register().map_err(|source| RuntimeError::Module {
      module: module.to_string(),
      source,
    })
  }

  /// Load a module (once; `require` caches it).
  pub fn require(&self, module: &str) -> Result<LuaValue, RuntimeError> {
    let require = || -> LuaResult<LuaValue> {
      let require: LuaFunction = self.lua.globals().get("require")?;
      require.call(module)
    };
    require().map_err(|source| RuntimeError::Module {
      module: module.to_string(),
      source,
    })
  }

  fn resolve_function(&self, function: &str) -> Result<LuaFunction, InvocationError> {
    let lua_failure = |source| InvocationError::Lua {
      function: function.to_string(),
      source,
    };

    let target: LuaValue = match function.rsplit_once('/') {
      Some((module, name)) => {
        let require: LuaFunction = self.lua.globals().get("require").map_err(lua_failure)?;
        match require.call::<LuaValue>(module).map_err(lua_failure)? {
          LuaValue::Table(exports) => exports.get(name).map_err(lua_failure)?,
          _ => LuaValue::Nil,
        }
      }
      None => self.lua.globals().get(function).map_err(lua_failure)?,
    };

    match target {
      LuaValue::Function(f) => Ok(f),
      _ => Err(InvocationError::FunctionNotFound {
        function: function.to_string(),
      }),
    }
  }
}

impl DynamicRuntime for LuaRuntime {
  fn invoke(&self, function: &str, args: Vec<Value>) -> Result<Value, InvocationError> {
    let target = self.resolve_function(function)?;

    let conversion = |source| InvocationError::Conversion {
      function: function.to_string(),
      source,
    };

    let mut lua_args = Vec::with_capacity(args.len());
    for arg in &args {
      lua_args.push(json_to_lua(&self.lua, arg).map_err(conversion)?);
    }

    let results: LuaMultiValue = target
      .call(LuaMultiValue::from_vec(lua_args))
      .map_err(|source| InvocationError::Lua {
        function: function.to_string(),
        source,
      })?;

    match results.into_iter().next() {
      Some(value) => lua_to_json(&value).map_err(conversion),
      None => Ok(Value::Null),
    }
  }
}

/// Register the `log` global: `log.debug/info/warn/error(message)`.
fn register_log(lua: &Lua) -> LuaResult<()> {
  let log = lua.create_table()?;

  log.set(
    "debug",
    lua.create_function(|_, message: String| {
      debug!(target: "immutant::lua", "{}", message);
      Ok(())
    })?,
  )?;
  log.set(
    "info",
    lua.create_function(|_, message: String| {
      info!(target: "immutant::lua", "{}", message);
      Ok(())
    })?,
  )?;
  log.set(
    "warn",
    lua.create_function(|_, message: String| {
      warn!(target: "immutant::lua", "{}", message);
      Ok(())
    })?,
  )?;
  log.set(
    "error",
    lua.create_function(|_, message: String| {
      error!(target: "immutant::lua", "{}", message);
      Ok(())
    })?,
  )?;

  lua.globals().set("log", log)
}
