use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::evaluation::untracked;
use crate::scheduler::{self, Schedulable, Scheduler};
use crate::{Access, Auto, Comparer, Observer};

/// Something a [`Binding`] handle can tear down.
pub(crate) trait Disposable {
	fn dispose(&self);

	fn is_disposed(&self) -> bool;
}

/// Handle to a callback subscribed to an observable.
///
/// The callback stays subscribed until [`Binding::dispose`] is called;
/// dropping the handle does not unsubscribe it.
#[must_use = "a binding stays subscribed until it is disposed"]
#[derive(Clone)]
pub struct Binding {
	body: Option<Rc<dyn Disposable>>,
}

impl Binding {
	pub(crate) fn new(body: Rc<dyn Disposable>) -> Self {
		Binding { body: Some(body) }
	}

	/// A binding to a source that can never fire.
	pub(crate) fn noop() -> Self {
		Binding { body: None }
	}

	/// Unsubscribe and release the callback. Calling it again does nothing.
	pub fn dispose(&self) {
		if let Some(body) = &self.body {
			body.dispose();
		}
	}

	pub fn is_disposed(&self) -> bool {
		self.body.as_ref().map_or(true, |body| body.is_disposed())
	}
}

impl std::fmt::Debug for Binding {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Binding")
			.field("disposed", &self.is_disposed())
			.finish()
	}
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Status {
	Valid,
	/// Scheduled to run.
	Invalid,
	Disposed,
}

struct BindingBody<T: 'static> {
	status: Cell<Status>,
	source: RefCell<Option<Rc<dyn Access<T>>>>,
	callback: RefCell<Option<Rc<dyn Fn(T)>>>,
	comparer: RefCell<Option<Comparer<T>>>,
	scheduler: Rc<dyn Scheduler>,
	last: RefCell<T>,
	this: Weak<BindingBody<T>>,
}

/// Invoke `callback` with the current value of `source` now and after every
/// change of it.
pub(crate) fn bind<T>(
	source: Rc<dyn Access<T>>,
	callback: Rc<dyn Fn(T)>,
	comparer: Option<Comparer<T>>,
	scheduler: Option<Rc<dyn Scheduler>>,
) -> Binding
where
	T: Clone + 'static,
{
	let value = untracked(|| source.value());
	if !source.can_fire() {
		untracked(|| callback(value));
		return Binding::noop();
	}

	let comparer = source.comparer().or(comparer);
	let body = Rc::new_cyclic(|this| BindingBody {
		status: Cell::new(Status::Valid),
		source: RefCell::new(Some(source.clone())),
		callback: RefCell::new(Some(callback.clone())),
		comparer: RefCell::new(Some(comparer)),
		scheduler: scheduler.unwrap_or_else(scheduler::default),
		last: RefCell::new(value.clone()),
		this: this.clone(),
	});

	source.subscribe(body.clone());
	untracked(|| callback(value));
	Binding::new(body)
}

impl<T> Observer for BindingBody<T>
where
	T: Clone + 'static,
{
	fn notify(self: Rc<Self>) {
		if self.status.get() == Status::Valid {
			self.status.set(Status::Invalid);
			self.scheduler.schedule(self.clone());
		}
	}
}

impl<T> Schedulable for BindingBody<T>
where
	T: Clone + 'static,
{
	fn run(&self) {
		if self.status.get() != Status::Invalid {
			return;
		}

		self.status.set(Status::Valid);

		let Some(source) = self.source.borrow().clone() else {
			return;
		};

		let next = untracked(|| source.value());
		let can_fire = source.can_fire();

		let previous = self.last.replace(next.clone());
		let changed = match &*self.comparer.borrow() {
			Some(comparer) => !comparer.eq(&previous, &next),
			None => false,
		};

		if changed {
			let callback = self.callback.borrow().clone();
			if let Some(callback) = callback {
				untracked(|| callback(next));
			}
		}

		if !can_fire {
			tracing::debug!("binding source can no longer fire, disposing");
			self.dispose();
		}
	}
}

impl<T> Disposable for BindingBody<T>
where
	T: Clone + 'static,
{
	fn dispose(&self) {
		if self.status.replace(Status::Disposed) == Status::Disposed {
			return;
		}

		let source = self.source.borrow_mut().take();
		if let (Some(source), Some(this)) = (source, self.this.upgrade()) {
			source.unsubscribe(&(this as Rc<dyn Observer>));
		}

		self.callback.borrow_mut().take();
		self.comparer.borrow_mut().take();
	}

	fn is_disposed(&self) -> bool {
		self.status.get() == Status::Disposed
	}
}

/// Run `action` now and again whenever anything it read changes.
pub fn auto_run(action: impl Fn() + 'static) -> Binding {
	auto_run_with(action, None)
}

pub fn auto_run_with(action: impl Fn() + 'static, scheduler: Option<Rc<dyn Scheduler>>) -> Binding {
	let counter = Cell::new(0u64);
	let auto = Auto::new(move || {
		counter.set(counter.get() + 1);
		action();
		counter.get()
	});

	auto.bind_with(|_| {}, None, scheduler)
}
