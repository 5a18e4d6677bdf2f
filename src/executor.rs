//! Where asynchronous auto-observables run their futures.
//!
//! The default executor spawns onto the current tokio `LocalSet`. Hosts that
//! drive their own loop can install a different one with [`set_default`].

use std::cell::RefCell;
use std::rc::Rc;

use futures::executor::LocalSpawner;
use futures::future::LocalBoxFuture;
use futures::task::LocalSpawnExt;

pub trait Executor {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>);
}

/// Spawns with [`tokio::task::spawn_local`].
///
/// # Panics
///
/// Spawning panics outside of a `LocalSet` context.
#[derive(Default, Clone, Copy, Debug)]
pub struct TokioLocal;

impl Executor for TokioLocal {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		tokio::task::spawn_local(future);
	}
}

impl Executor for LocalSpawner {
	fn spawn(&self, future: LocalBoxFuture<'static, ()>) {
		if let Err(error) = self.spawn_local(future) {
			tracing::error!(%error, "failed to spawn an async computation");
		}
	}
}

thread_local! {
	static DEFAULT: RefCell<Rc<dyn Executor>> = RefCell::new(Rc::new(TokioLocal));
}

pub fn default() -> Rc<dyn Executor> {
	DEFAULT.with(|executor| executor.borrow().clone())
}

/// Install the executor used on this thread, returning the previous one.
pub fn set_default(executor: Rc<dyn Executor>) -> Rc<dyn Executor> {
	DEFAULT.with(|current| current.replace(executor))
}

pub(crate) fn spawn(future: LocalBoxFuture<'static, ()>) {
	default().spawn(future);
}
