//! Bootstrap operations against the global runtime.
//!
//! Deployment-time work (reading descriptors, assembling configuration,
//! resolving dependencies) runs in one process-wide Lua runtime, never in an
//! application's own runtime. Every operation is executed through an
//! [`IsolationExecutor`] targeted at the global context, so nothing an
//! application can `require` leaks into bootstrap code and the caller's
//! context is back in place afterwards.
//!
//! The bootstrap namespace is loaded into the global runtime the first time
//! any operation runs, and only once.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use immutant_runtime::convert::describe;
use immutant_runtime::{DynamicRuntime, InvocationError, IsolationExecutor, LuaRuntime, RuntimeContext, RuntimeError};
use mlua::prelude::*;
use serde_json::{Map, Value};
use tracing::debug;

use crate::deployment::AppMetadata;
use crate::error::BootstrapError;
use crate::resolver::{self, CachedArtifacts, Coordinate, DependencyResolver, LocalRepository};

pub const BOOTSTRAP_NAMESPACE: &str = "immutant.runtime.bootstrap";

const BOOTSTRAP_SOURCE: &str = include_str!("bootstrap.lua");
const FS_MODULE: &str = "immutant.fs";
const RESOLVER_MODULE: &str = "immutant.resolver";

const READ_DESCRIPTOR: &str = "read-and-stringify-descriptor";
const READ_FULL_APP_CONFIG: &str = "read-and-stringify-full-app-config";
const RESOURCE_PATHS: &str = "resource-paths";
const GET_DEPENDENCIES: &str = "get-dependencies";

/// Entry point for bootstrap operations.
pub struct BootstrapGateway {
  resolver: Arc<dyn DependencyResolver>,
  executor: IsolationExecutor,
  runtime: OnceLock<LuaRuntime>,
  init_lock: Mutex<()>,
}

impl BootstrapGateway {
  pub fn new(resolver: Arc<dyn DependencyResolver>) -> Self {
    Self {
      resolver,
      executor: IsolationExecutor::new(Arc::new(RuntimeContext::global())),
      runtime: OnceLock::new(),
      init_lock: Mutex::new(()),
    }
  }

  /// A gateway resolving dependencies from a local repository.
  pub fn with_repository(repository: impl Into<PathBuf>) -> Self {
    Self::new(Arc::new(LocalRepository::new(repository)))
  }

  /// Whether the bootstrap namespace has been loaded yet.
  pub fn is_loaded(&self) -> bool {
    self.runtime.get().is_some()
  }

  /// Parse a descriptor into a map with all keys as text.
  pub fn parse_descriptor(&self, path: &Path) -> Result<Map<String, Value>, BootstrapError> {
    let failure = |source| BootstrapError::DescriptorParse {
      path: path.to_path_buf(),
      source,
    };
    let value = self.call(READ_DESCRIPTOR, vec![path_arg(path)], failure)?;
    expect_map(READ_DESCRIPTOR, value).map_err(failure)
  }

  /// Parse a descriptor and build the deployment metadata it describes.
  pub fn read_app_metadata(&self, application_name: &str, path: &Path) -> Result<AppMetadata, BootstrapError> {
    let descriptor = self.parse_descriptor(path)?;
    AppMetadata::from_descriptor(application_name, &descriptor).map_err(|source| BootstrapError::InvalidDescriptor {
      path: path.to_path_buf(),
      source,
    })
  }

  /// The application's full configuration: its project settings overlaid
  /// with the descriptor. Always carries `root`.
  pub fn read_full_app_config(&self, descriptor: &Path, app_root: &Path) -> Result<Map<String, Value>, BootstrapError> {
    let failure = |source| BootstrapError::Invocation {
      operation: READ_FULL_APP_CONFIG,
      source,
    };
    let value = self.call(
      READ_FULL_APP_CONFIG,
      vec![path_arg(descriptor), path_arg(app_root)],
      failure,
    )?;
    expect_map(READ_FULL_APP_CONFIG, value).map_err(failure)
  }

  /// [`read_full_app_config`](Self::read_full_app_config) serialized as JSON.
  pub fn read_full_app_config_as_string(&self, descriptor: &Path, app_root: &Path) -> Result<String, BootstrapError> {
    let config = self.read_full_app_config(descriptor, app_root)?;
    Ok(Value::Object(config).to_string())
  }

  /// Directories holding the application's own code and resources, in order.
  pub fn resource_dirs(&self, app_root: &Path, profiles: &[String]) -> Result<Vec<String>, BootstrapError> {
    let failure = |source| BootstrapError::Invocation {
      operation: RESOURCE_PATHS,
      source,
    };
    let value = self.call(RESOURCE_PATHS, vec![path_arg(app_root), profiles_arg(profiles)], failure)?;
    expect_strings(RESOURCE_PATHS, value).map_err(failure)
  }

  /// Archives the application depends on, in resolver order.
  ///
  /// With `resolve_dependencies == false` only archives already present in
  /// the application's `lib` directory are used.
  pub fn get_dependencies(
    &self,
    app_root: &Path,
    resolve_dependencies: bool,
    profiles: &[String],
  ) -> Result<Vec<PathBuf>, BootstrapError> {
    let failure = |source| BootstrapError::DependencyResolution {
      root: app_root.to_path_buf(),
      source,
    };
    let args = vec![
      path_arg(app_root),
      Value::Bool(resolve_dependencies),
      profiles_arg(profiles),
    ];
    let value = self.call(GET_DEPENDENCIES, args, failure)?;
    let paths = expect_strings(GET_DEPENDENCIES, value).map_err(failure)?;
    Ok(paths.into_iter().map(PathBuf::from).collect())
  }

  fn call(
    &self,
    operation: &'static str,
    args: Vec<Value>,
    failure: impl FnOnce(InvocationError) -> BootstrapError,
  ) -> Result<Value, BootstrapError> {
    self.executor.run_isolated(|| {
      let runtime = self.runtime()?;
      runtime.invoke(&qualified(operation), args).map_err(failure)
    })
  }

  fn runtime(&self) -> Result<&LuaRuntime, BootstrapError> {
    if let Some(runtime) = self.runtime.get() {
      return Ok(runtime);
    }

    let _init = self.init_lock.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(runtime) = self.runtime.get() {
      return Ok(runtime);
    }
    let runtime = self.load_runtime()?;
    Ok(self.runtime.get_or_init(|| runtime))
  }

  fn load_runtime(&self) -> Result<LuaRuntime, RuntimeError> {
    let runtime = LuaRuntime::new("bootstrap")?;
    let lua = runtime.lua();

    let module_error = |module: &str| {
      let module = module.to_string();
      move |source| RuntimeError::Module { module, source }
    };
    runtime.provide(FS_MODULE, create_fs_module(lua).map_err(module_error(FS_MODULE))?)?;
    runtime.provide(
      RESOLVER_MODULE,
      create_resolver_module(lua, Arc::clone(&self.resolver)).map_err(module_error(RESOLVER_MODULE))?,
    )?;
    runtime.preload(BOOTSTRAP_NAMESPACE, BOOTSTRAP_SOURCE)?;
    runtime.require(BOOTSTRAP_NAMESPACE)?;

    debug!("loaded {} into the global runtime", BOOTSTRAP_NAMESPACE);
    Ok(runtime)
  }
}

impl std::fmt::Debug for BootstrapGateway {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("BootstrapGateway")
      .field("loaded", &self.is_loaded())
      .finish_non_exhaustive()
  }
}

fn qualified(operation: &str) -> String {
  format!("{}/{}", BOOTSTRAP_NAMESPACE, operation)
}

fn path_arg(path: &Path) -> Value {
  Value::String(path.to_string_lossy().into_owned())
}

fn profiles_arg(profiles: &[String]) -> Value {
  Value::Array(profiles.iter().cloned().map(Value::String).collect())
}

fn expect_map(operation: &str, value: Value) -> Result<Map<String, Value>, InvocationError> {
  match value {
    Value::Object(map) => Ok(map),
    other => Err(InvocationError::UnexpectedResult {
      function: qualified(operation),
      expected: "a map",
      found: describe(&other),
    }),
  }
}

/// Lists come back from Lua as arrays, or as an empty map when they are empty.
fn expect_strings(operation: &str, value: Value) -> Result<Vec<String>, InvocationError> {
  let unexpected = |found: &Value| InvocationError::UnexpectedResult {
    function: qualified(operation),
    expected: "a list of strings",
    found: describe(found),
  };

  match value {
    Value::Object(ref map) if map.is_empty() => Ok(Vec::new()),
    Value::Array(items) => items
      .into_iter()
      .map(|item| match item {
        Value::String(s) => Ok(s),
        other => Err(unexpected(&other)),
      })
      .collect(),
    other => Err(unexpected(&other)),
  }
}

fn path_string(path: &Path) -> String {
  path.to_string_lossy().into_owned()
}

/// `immutant.fs`: the file system access bootstrap code is allowed.
fn create_fs_module(lua: &Lua) -> LuaResult<LuaTable> {
  let module = lua.create_table()?;

  module.set(
    "join",
    lua.create_function(|_, (base, path): (String, String)| Ok(path_string(&Path::new(&base).join(path))))?,
  )?;
  module.set(
    "is-file",
    lua.create_function(|_, path: String| Ok(Path::new(&path).is_file()))?,
  )?;
  module.set(
    "archives",
    lua.create_function(|_, dir: String| {
      let archives = resolver::list_archives(Path::new(&dir)).map_err(LuaError::external)?;
      Ok(archives.iter().map(|path| path_string(path)).collect::<Vec<_>>())
    })?,
  )?;
  // Evaluates a data file in an empty environment and returns its value.
  module.set(
    "load",
    lua.create_function(|lua, path: String| {
      let source =
        fs::read_to_string(&path).map_err(|e| LuaError::external(format!("cannot read '{}': {}", path, e)))?;
      lua
        .load(source.as_str())
        .set_name(format!("@{}", path))
        .set_environment(lua.create_table()?)
        .call::<LuaValue>(())
    })?,
  )?;

  Ok(module)
}

/// `immutant.resolver`: `resolve(name, version, resolve, root)` returns the
/// path of the archive for one declared dependency.
fn create_resolver_module(lua: &Lua, resolver: Arc<dyn DependencyResolver>) -> LuaResult<LuaTable> {
  let module = lua.create_table()?;

  module.set(
    "resolve",
    lua.create_function(
      move |_, (name, version, resolve, root): (String, String, bool, String)| {
        let coordinate = Coordinate::parse(&name, version);
        let artifact = if resolve {
          resolver.resolve(&coordinate)
        } else {
          CachedArtifacts::for_app(Path::new(&root)).resolve(&coordinate)
        };
        artifact.map(|path| path_string(&path)).map_err(LuaError::external)
      },
    )?,
  )?;

  Ok(module)
}
