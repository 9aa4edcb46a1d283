//! Context-aware module loading.
//!
//! The stock file searchers follow `package.path`/`package.cpath`, which are
//! process-wide. We replace them with one searcher that resolves modules only
//! against the module roots of the calling thread's [`RuntimeContext`], so a
//! runtime can only `require` what its active context can see.
//!
//! `package.preload` (searcher 1) is left alone; built-in namespaces are
//! registered there and stay visible from every context.
//!
//! [`RuntimeContext`]: crate::isolation::RuntimeContext

use std::fs;
use std::path::{Path, PathBuf};

use mlua::prelude::*;

use crate::isolation;

/// Map a module name to the candidate files inside one root.
fn candidates(root: &Path, module: &str) -> [PathBuf; 2] {
  let relative: PathBuf = module.split('.').collect();
  [relative.with_extension("lua"), relative.join("init.lua")].map(|candidate| root.join(candidate))
}

/// Find the file providing `module` in the given roots, in root order.
pub fn find_module(roots: &[PathBuf], module: &str) -> Option<PathBuf> {
  roots
    .iter()
    .flat_map(|root| candidates(root, module))
    .find(|candidate| candidate.is_file())
}

fn load_module_file(lua: &Lua, path: &Path) -> LuaResult<LuaFunction> {
  let source = fs::read_to_string(path)
    .map_err(|e| LuaError::external(format!("cannot read '{}': {}", path.display(), e)))?;
  lua
    .load(source.as_str())
    .set_name(format!("@{}", path.display()))
    .into_function()
}

fn create_context_searcher(lua: &Lua) -> LuaResult<LuaFunction> {
  lua.create_function(|lua, module: String| {
    let Some(context) = isolation::current() else {
      let message = format!("\n\tno active context to resolve module '{}'", module);
      return Ok((LuaValue::Nil, LuaValue::String(lua.create_string(message)?)));
    };

    match find_module(context.module_roots(), &module) {
      Some(path) => {
        let loader = load_module_file(lua, &path)?;
        let origin = lua.create_string(path.to_string_lossy().as_bytes())?;
        Ok((LuaValue::Function(loader), LuaValue::String(origin)))
      }
      None => {
        let message = format!(
          "\n\tno module root of context '{}' provides '{}'",
          context.name(),
          module
        );
        Ok((LuaValue::Nil, LuaValue::String(lua.create_string(message)?)))
      }
    }
  })
}

/// Install the context-aware searcher in place of the file searchers.
pub fn install_loaders(lua: &Lua) -> LuaResult<()> {
  let package: LuaTable = lua.globals().get("package")?;
  package.set("path", "")?;
  package.set("cpath", "")?;

  let searchers: LuaTable = package.get("searchers")?;
  for index in (3..=searchers.raw_len()).rev() {
    searchers.raw_set(index, LuaValue::Nil)?;
  }
  searchers.raw_set(2, create_context_searcher(lua)?)?;

  Ok(())
}
