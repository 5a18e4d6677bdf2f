use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::binding::{Binding, Disposable};
use crate::dispatcher::Dispatcher;
use crate::evaluation::untracked;
use crate::scheduler::{self, Schedulable, Scheduler};
use crate::Observer;

/// Events without a current value.
///
/// Every dispatched item reaches every binding, in order; bindings that use a
/// deferring scheduler receive the items queued since their last run.
pub struct Stream<T: 'static> {
	body: Rc<StreamBody<T>>,
}

struct StreamBody<T> {
	dispatcher: Dispatcher,
	/// Item being delivered by the current fire pass.
	dispatched: RefCell<Option<T>>,
}

impl<T> Clone for Stream<T> {
	fn clone(&self) -> Self {
		Stream {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for Stream<T>
where
	T: Clone + 'static,
{
	fn default() -> Self {
		Stream::new()
	}
}

impl<T> Stream<T>
where
	T: Clone + 'static,
{
	pub fn new() -> Self {
		Stream {
			body: Rc::new(StreamBody {
				dispatcher: Dispatcher::new(),
				dispatched: RefCell::new(None),
			}),
		}
	}

	pub fn dispatch(&self, item: T) {
		let previous = self.body.dispatched.replace(Some(item));
		let _ = self.body.dispatcher.fire();
		*self.body.dispatched.borrow_mut() = previous;
	}

	pub fn bind(&self, callback: impl Fn(T) + 'static) -> Binding {
		self.bind_with(callback, None)
	}

	pub fn bind_with(&self, callback: impl Fn(T) + 'static, scheduler: Option<Rc<dyn Scheduler>>) -> Binding {
		let body = Rc::new_cyclic(|this| StreamBinding {
			stream: self.body.clone(),
			status: Cell::new(Status::Unscheduled),
			callback: RefCell::new(Some(Rc::new(callback))),
			scheduler: scheduler.unwrap_or_else(scheduler::default),
			queue: RefCell::new(Vec::new()),
			this: this.clone(),
		});

		let _ = self.body.dispatcher.subscribe(body.clone());
		Binding::new(body)
	}
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Status {
	Unscheduled,
	Scheduled,
	Disposed,
}

struct StreamBinding<T: 'static> {
	stream: Rc<StreamBody<T>>,
	status: Cell<Status>,
	callback: RefCell<Option<Rc<dyn Fn(T)>>>,
	scheduler: Rc<dyn Scheduler>,
	queue: RefCell<Vec<T>>,
	this: Weak<StreamBinding<T>>,
}

impl<T> Observer for StreamBinding<T>
where
	T: Clone + 'static,
{
	fn notify(self: Rc<Self>) {
		if self.status.get() == Status::Disposed {
			return;
		}

		let item = self.stream.dispatched.borrow().clone();
		if let Some(item) = item {
			self.queue.borrow_mut().push(item);
		}

		if self.status.get() == Status::Unscheduled {
			self.status.set(Status::Scheduled);
			self.scheduler.schedule(self.clone());
		}
	}
}

impl<T> Schedulable for StreamBinding<T>
where
	T: Clone + 'static,
{
	fn run(&self) {
		if self.status.get() != Status::Scheduled {
			return;
		}

		self.status.set(Status::Unscheduled);
		let queue = std::mem::take(&mut *self.queue.borrow_mut());
		for item in queue {
			// The callback may dispose this binding.
			let callback = self.callback.borrow().clone();
			let Some(callback) = callback else {
				break;
			};

			untracked(|| callback(item));
		}
	}
}

impl<T> Disposable for StreamBinding<T>
where
	T: Clone + 'static,
{
	fn dispose(&self) {
		if self.status.replace(Status::Disposed) == Status::Disposed {
			return;
		}

		if let Some(this) = self.this.upgrade() {
			let _ = self.stream.dispatcher.unsubscribe(&(this as Rc<dyn Observer>));
		}

		self.callback.borrow_mut().take();
		self.queue.borrow_mut().clear();
	}

	fn is_disposed(&self) -> bool {
		self.status.get() == Status::Disposed
	}
}
