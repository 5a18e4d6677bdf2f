use std::cell::RefCell;
use std::rc::Rc;

use crate::binding::{self, Binding};
use crate::dispatcher::Dispatcher;
use crate::evaluation;
use crate::{Access, Comparer, Observable, Observer, Revision, Scheduler, Value};

/// A container whose owner decides when it changed.
///
/// Values are never compared: every [`Manual::update`], [`Manual::modify`]
/// and [`Manual::invalidate`] notifies observers.
pub struct Manual<T: 'static> {
	body: Rc<ManualBody<T>>,
}

struct ManualBody<T> {
	dispatcher: Dispatcher,
	value: RefCell<T>,
}

impl<T> Clone for Manual<T> {
	fn clone(&self) -> Self {
		Manual {
			body: self.body.clone(),
		}
	}
}

impl<T> Manual<T>
where
	T: Clone + 'static,
{
	pub fn new(value: T) -> Self {
		Manual {
			body: Rc::new(ManualBody {
				dispatcher: Dispatcher::new(),
				value: RefCell::new(value),
			}),
		}
	}

	#[inline]
	pub fn get(&self) -> T {
		evaluation::track(self.body.clone())
	}

	#[inline]
	pub fn get_once(&self) -> T {
		self.body.value.borrow().clone()
	}

	pub fn update(&self, value: T) {
		*self.body.value.borrow_mut() = value;
		self.invalidate();
	}

	pub fn modify(&self, func: impl FnOnce(&mut T)) {
		func(&mut self.body.value.borrow_mut());
		self.invalidate();
	}

	pub fn invalidate(&self) {
		let _ = self.body.dispatcher.fire();
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

impl<T: 'static> Observable for ManualBody<T> {
	fn revision(&self) -> Revision {
		self.dispatcher.revision()
	}

	fn can_fire(&self) -> bool {
		true
	}

	fn subscribe(&self, observer: Rc<dyn Observer>) {
		let _ = self.dispatcher.subscribe(observer);
	}

	fn unsubscribe(&self, observer: &Rc<dyn Observer>) {
		let _ = self.dispatcher.unsubscribe(observer);
	}
}

impl<T> Access<T> for ManualBody<T>
where
	T: Clone + 'static,
{
	fn value(&self) -> T {
		self.value.borrow().clone()
	}

	fn comparer(&self) -> Comparer<T> {
		Comparer::never()
	}
}

impl<T> From<Manual<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(manual: Manual<T>) -> Self {
		Value::new(manual.body)
	}
}
