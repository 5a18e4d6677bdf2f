use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::scheduler::{Schedulable, Scheduler};

/// Queues scheduled work until [`BatchScheduler::flush`].
///
/// Work scheduled while flushing goes to a second buffer that is drained by
/// the same flush; the two buffers are swapped so their allocations are
/// reused.
pub struct BatchScheduler {
	queue: RefCell<Vec<Rc<dyn Schedulable>>>,
	/// Spare buffer, empty outside of a flush.
	next: RefCell<Vec<Rc<dyn Schedulable>>>,
	flushing: Cell<bool>,
	#[cfg(target_arch = "wasm32")]
	microtask: Cell<bool>,
	#[cfg(target_arch = "wasm32")]
	this: std::rc::Weak<BatchScheduler>,
}

impl Default for BatchScheduler {
	fn default() -> Self {
		BatchScheduler::new()
	}
}

impl BatchScheduler {
	pub fn new() -> Self {
		BatchScheduler {
			queue: RefCell::new(Vec::new()),
			next: RefCell::new(Vec::new()),
			flushing: Cell::new(false),
			#[cfg(target_arch = "wasm32")]
			microtask: Cell::new(false),
			#[cfg(target_arch = "wasm32")]
			this: std::rc::Weak::new(),
		}
	}

	pub fn is_scheduled(&self) -> bool {
		!self.queue.borrow().is_empty()
	}

	/// Run queued work until nothing is left. Reentrant calls do nothing.
	pub fn flush(&self) {
		if self.flushing.replace(true) {
			return;
		}

		let _flushing = Flushing(&self.flushing);
		let mut runs = 0;
		loop {
			let mut items = self.queue.replace(self.next.take());
			if items.is_empty() {
				self.next.replace(items);
				break;
			}

			runs += items.len();
			for item in items.drain(..) {
				item.run();
			}

			self.next.replace(items);
		}

		if runs > 0 {
			tracing::debug!(runs, "batch flushed");
		}
	}

	/// Run `func`, then flush everything it scheduled.
	pub fn batch<R>(&self, func: impl FnOnce() -> R) -> R {
		let result = func();
		self.flush();
		result
	}
}

/// Clears the flushing flag on drop, including during unwinding.
struct Flushing<'a>(&'a Cell<bool>);

impl Drop for Flushing<'_> {
	fn drop(&mut self) {
		self.0.set(false);
	}
}

impl Scheduler for BatchScheduler {
	fn schedule(&self, item: Rc<dyn Schedulable>) {
		self.queue.borrow_mut().push(item);

		#[cfg(target_arch = "wasm32")]
		self.schedule_microtask();
	}
}

#[cfg(target_arch = "wasm32")]
impl BatchScheduler {
	/// A scheduler that also flushes itself from a JS microtask.
	pub fn with_microtasks() -> Rc<Self> {
		Rc::new_cyclic(|this| BatchScheduler {
			this: this.clone(),
			..BatchScheduler::new()
		})
	}

	fn schedule_microtask(&self) {
		let Some(this) = self.this.upgrade() else {
			return;
		};

		if self.flushing.get() || self.microtask.replace(true) {
			return;
		}

		crate::microtask::queue(move || {
			this.microtask.set(false);
			this.flush();
		});
	}
}
