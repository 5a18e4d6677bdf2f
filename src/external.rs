use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::binding::{self, Binding};
use crate::dispatcher::{Dispatcher, Transition};
use crate::evaluation;
use crate::{Access, Comparer, Observable, Observer, Revision, Scheduler, Value};

/// Callbacks run when an [`External`] gains its first observer and loses its
/// last one.
pub trait Hooks: 'static {
	/// Start watching the outside source. Call the invalidator whenever it
	/// changes.
	fn wakeup(&self, invalidator: Invalidator);

	fn sleep(&self);
}

impl Hooks for () {
	fn wakeup(&self, _: Invalidator) {}

	fn sleep(&self) {}
}

impl<W, S> Hooks for (W, S)
where
	W: Fn(Invalidator) + 'static,
	S: Fn() + 'static,
{
	fn wakeup(&self, invalidator: Invalidator) {
		(self.0)(invalidator)
	}

	fn sleep(&self) {
		(self.1)()
	}
}

trait Invalidate {
	fn invalidate(&self);
}

/// Marks the value of an [`External`] stale. Does nothing once the node is
/// gone.
#[derive(Clone)]
pub struct Invalidator {
	target: Weak<dyn Invalidate>,
}

impl Invalidator {
	pub fn invalidate(&self) {
		if let Some(target) = self.target.upgrade() {
			target.invalidate();
		}
	}
}

/// A value owned by something outside of the graph.
///
/// The getter result is cached only while the node is observed; the owner
/// reports changes through [`External::invalidate`] or the [`Invalidator`]
/// passed to [`Hooks::wakeup`].
pub struct External<T: 'static> {
	body: Rc<ExternalBody<T>>,
}

impl<T> Clone for External<T> {
	fn clone(&self) -> Self {
		External {
			body: self.body.clone(),
		}
	}
}

struct ExternalBody<T: 'static> {
	dispatcher: Dispatcher,
	getter: Box<dyn Fn() -> T>,
	comparer: Comparer<T>,
	hooks: Box<dyn Hooks>,
	last: RefCell<Option<T>>,
	valid: Cell<bool>,
	active: Cell<bool>,
	this: Weak<ExternalBody<T>>,
}

impl<T> External<T>
where
	T: Clone + 'static,
{
	pub fn new(getter: impl Fn() -> T + 'static) -> Self
	where
		T: PartialEq,
	{
		Self::with_hooks(getter, (), Comparer::default())
	}

	pub fn with_hooks(getter: impl Fn() -> T + 'static, hooks: impl Hooks, comparer: Comparer<T>) -> Self {
		External {
			body: Rc::new_cyclic(|this| ExternalBody {
				dispatcher: Dispatcher::new(),
				getter: Box::new(getter),
				comparer,
				hooks: Box::new(hooks),
				last: RefCell::new(None),
				valid: Cell::new(false),
				active: Cell::new(false),
				this: this.clone(),
			}),
		}
	}

	#[inline]
	pub fn get(&self) -> T {
		evaluation::track(self.body.clone())
	}

	#[inline]
	pub fn get_once(&self) -> T {
		self.body.value()
	}

	pub fn invalidate(&self) {
		self.body.invalidate();
	}

	pub fn invalidator(&self) -> Invalidator {
		self.body.invalidator()
	}

	pub fn bind(&self, callback: impl Fn(T) + 'static) -> Binding {
		self.bind_with(callback, None, None)
	}

	pub fn bind_with(
		&self,
		callback: impl Fn(T) + 'static,
		comparer: Option<Comparer<T>>,
		scheduler: Option<Rc<dyn Scheduler>>,
	) -> Binding {
		binding::bind(self.body.clone(), Rc::new(callback), comparer, scheduler)
	}

	pub fn map<R>(&self, transform: impl Fn(&T) -> R + 'static) -> Value<R>
	where
		R: Clone + PartialEq + 'static,
	{
		Value::from(self.clone()).map(transform)
	}
}

impl<T> ExternalBody<T>
where
	T: Clone + 'static,
{
	fn calculate(&self) -> T {
		let value = (self.getter)();
		*self.last.borrow_mut() = Some(value.clone());
		self.valid.set(true);
		value
	}

	fn invalidator(&self) -> Invalidator {
		Invalidator {
			target: self.this.clone(),
		}
	}

	fn transition(&self, transition: Transition) {
		match transition {
			Transition::Activated => {
				self.active.set(true);
				self.calculate();
				self.hooks.wakeup(self.invalidator());
			}
			Transition::Deactivated => {
				self.active.set(false);
				self.hooks.sleep();
			}
		}
	}
}

impl<T> Invalidate for ExternalBody<T>
where
	T: Clone + 'static,
{
	fn invalidate(&self) {
		if self.valid.replace(false) {
			let _ = self.dispatcher.fire();
		}
	}
}

impl<T> Observable for ExternalBody<T>
where
	T: Clone + 'static,
{
	fn revision(&self) -> Revision {
		self.dispatcher.revision()
	}

	fn can_fire(&self) -> bool {
		true
	}

	fn subscribe(&self, observer: Rc<dyn Observer>) {
		if let Some(transition) = self.dispatcher.subscribe(observer) {
			self.transition(transition);
		}
	}

	fn unsubscribe(&self, observer: &Rc<dyn Observer>) {
		if let Some(transition) = self.dispatcher.unsubscribe(observer) {
			self.transition(transition);
		}
	}
}

impl<T> Access<T> for ExternalBody<T>
where
	T: Clone + 'static,
{
	fn value(&self) -> T {
		if self.valid.get() && self.active.get() {
			if let Some(value) = &*self.last.borrow() {
				return value.clone();
			}
		}

		self.calculate()
	}

	fn comparer(&self) -> Comparer<T> {
		self.comparer.clone()
	}
}

impl<T> From<External<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(external: External<T>) -> Self {
		Value::new(external.body)
	}
}
