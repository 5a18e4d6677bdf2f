//! When binding callbacks run.

use std::cell::RefCell;
use std::rc::Rc;

use crate::BatchScheduler;

/// Work queued by a binding whose source has changed.
pub trait Schedulable {
	fn run(&self);
}

pub trait Scheduler {
	fn schedule(&self, item: Rc<dyn Schedulable>);
}

/// Runs every item immediately.
#[derive(Default, Clone, Copy, Debug)]
pub struct Direct;

impl Scheduler for Direct {
	fn schedule(&self, item: Rc<dyn Schedulable>) {
		item.run();
	}
}

thread_local! {
	static DEFAULT: RefCell<Rc<dyn Scheduler>> = RefCell::new(Rc::new(Direct));
}

/// Scheduler used by bindings created without an explicit one.
pub fn default() -> Rc<dyn Scheduler> {
	DEFAULT.with(|scheduler| scheduler.borrow().clone())
}

/// Install the default scheduler of this thread, returning the previous one.
pub fn set_default(scheduler: Rc<dyn Scheduler>) -> Rc<dyn Scheduler> {
	DEFAULT.with(|current| current.replace(scheduler))
}

/// Install a fresh [`BatchScheduler`] as the default and return it.
pub fn batched() -> Rc<BatchScheduler> {
	let scheduler = Rc::new(BatchScheduler::new());
	set_default(scheduler.clone());
	scheduler
}
