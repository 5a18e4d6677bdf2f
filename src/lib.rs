//! Fine-grained reactive state.
//!
//! Mutable [`State`] cells feed derived [`Auto`] computations. Every read made
//! inside a computation is recorded, so an auto-observable recomputes lazily and
//! only when something it actually read has changed. [`Binding`]s connect the
//! graph to the outside world through a pluggable [`Scheduler`].

pub mod config;
pub mod executor;
pub mod macros;
pub mod scheduler;

mod addr;
mod r#async;
mod batch;
mod binding;
mod comparer;
mod computation;
mod computed;
mod r#const;
mod dispatcher;
mod error;
mod evaluation;
mod external;
mod manual;
mod stream;
mod subscription;
mod transform;
mod value;
mod var;

#[cfg(target_arch = "wasm32")]
mod microtask;

use std::cell::Cell;
use std::rc::Rc;

pub use batch::BatchScheduler;
pub use binding::{auto_run, auto_run_with, Binding};
pub use comparer::Comparer;
pub use computed::Auto;
pub use config::{Config, Divergence};
pub use error::Error;
pub use evaluation::untracked;
pub use external::{External, Hooks, Invalidator};
pub use manual::Manual;
pub use r#async::AsyncResult;
pub use r#const::Const;
pub use scheduler::{Direct, Schedulable, Scheduler};
pub use stream::Stream;
pub use tokio_util::sync::CancellationToken;
pub use value::Value;
pub use var::{State, Toggle};

/// Anything that can be told that a value it depends on has changed.
pub trait Observer: 'static {
	fn notify(self: Rc<Self>);
}

/// A node of the reactive graph.
pub trait Observable: 'static {
	/// Revision of the current value. A new, greater revision is produced
	/// every time the node fires.
	fn revision(&self) -> Revision;

	/// Whether this node can ever fire again.
	fn can_fire(&self) -> bool;

	/// Start delivering notifications to `observer`.
	fn subscribe(&self, observer: Rc<dyn Observer>);

	/// Stop delivering notifications to `observer`.
	fn unsubscribe(&self, observer: &Rc<dyn Observer>);
}

/// A node that holds a value.
pub trait Access<T>: Observable {
	/// Current value, without recording a dependency.
	fn value(&self) -> T;

	/// Comparer used to decide whether two values of this node differ.
	fn comparer(&self) -> Comparer<T>;
}

thread_local! {
	static CLOCK: Cell<u64> = const { Cell::new(0) };
}

/// Monotonic stamp used to detect stale values without comparing them.
#[derive(PartialEq, Eq, PartialOrd, Ord, Clone, Copy, Hash, Debug)]
pub struct Revision(u64);

impl Revision {
	/// Take the next revision from the clock.
	pub fn new() -> Self {
		CLOCK.with(|clock| {
			let next = clock.get() + 1;
			clock.set(next);
			Revision(next)
		})
	}
}

impl Default for Revision {
	fn default() -> Self {
		Revision::new()
	}
}

#[cfg(test)]
mod tests {
	use super::Revision;

	#[test]
	fn revisions_increase() {
		let first = Revision::new();
		let second = Revision::new();
		assert!(second > first);
		assert!(Revision::default() > second);
	}
}
