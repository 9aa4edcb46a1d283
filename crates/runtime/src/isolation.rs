//! Per-thread execution contexts.
//!
//! Every thread has at most one active [`RuntimeContext`]. Module lookup inside
//! any Lua runtime (`require`) consults the context of the calling thread, so
//! which context is active decides which module roots a runtime can see.
//!
//! Contexts are swapped with a scoped guard: [`enter`] installs a context and
//! returns a [`ContextGuard`] that puts the previous one back when dropped,
//! including during unwinding. The guard is `!Send`, so the restore always
//! happens on the thread that performed the substitution.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;

thread_local! {
  static CURRENT: RefCell<Option<Arc<RuntimeContext>>> = const { RefCell::new(None) };
}

/// A named execution context and the module roots visible from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeContext {
  name: String,
  module_roots: Vec<PathBuf>,
}

impl RuntimeContext {
  pub fn new(name: impl Into<String>, module_roots: Vec<PathBuf>) -> Self {
    Self {
      name: name.into(),
      module_roots,
    }
  }

  /// The context that owns the global runtime. It sees no module roots; the
  /// bootstrap namespace is preloaded rather than looked up.
  pub fn global() -> Self {
    Self::new("global", Vec::new())
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Module roots in lookup order.
  pub fn module_roots(&self) -> &[PathBuf] {
    &self.module_roots
  }
}

/// Returns the calling thread's active context, if any.
pub fn current() -> Option<Arc<RuntimeContext>> {
  CURRENT.with(|slot| slot.borrow().clone())
}

/// Makes `context` the calling thread's active context until the returned
/// guard is dropped.
pub fn enter(context: Arc<RuntimeContext>) -> ContextGuard {
  let previous = CURRENT.with(|slot| slot.borrow_mut().replace(context));
  ContextGuard {
    previous,
    _not_send: PhantomData,
  }
}

/// Runs `work` with `context` active and restores the previous context on every
/// exit path.
pub fn run_in<T>(context: Arc<RuntimeContext>, work: impl FnOnce() -> T) -> T {
  let _guard = enter(context);
  work()
}

/// Restores the previously active context on drop.
#[must_use = "the previous context is restored as soon as the guard is dropped"]
pub struct ContextGuard {
  previous: Option<Arc<RuntimeContext>>,
  _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
  fn drop(&mut self) {
    let previous = self.previous.take();
    CURRENT.with(|slot| *slot.borrow_mut() = previous);
  }
}

/// Runs units of work with one fixed context substituted for the caller's.
///
/// The bootstrap gateway holds one of these targeted at the global context;
/// a managed runtime holds one targeted at its own application context.
#[derive(Debug, Clone)]
pub struct IsolationExecutor {
  context: Arc<RuntimeContext>,
}

impl IsolationExecutor {
  pub fn new(context: Arc<RuntimeContext>) -> Self {
    Self { context }
  }

  pub fn context(&self) -> &Arc<RuntimeContext> {
    &self.context
  }

  /// Runs `work` with this executor's context active.
  ///
  /// Whatever `work` returns, including an `Err`, is handed back unchanged
  /// after the caller's context has been restored. A panic in `work` also
  /// restores the context before it continues unwinding.
  pub fn run_isolated<T>(&self, work: impl FnOnce() -> T) -> T {
    run_in(Arc::clone(&self.context), work)
  }
}
