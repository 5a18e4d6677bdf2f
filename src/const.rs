use std::rc::Rc;

use crate::binding::Binding;
use crate::evaluation::untracked;
use crate::{Access, Comparer, Observable, Observer, Revision, Scheduler, Value};

/// A value that never changes.
pub struct Const<T: 'static> {
	body: Rc<ConstBody<T>>,
}

struct ConstBody<T> {
	value: T,
	revision: Revision,
}

impl<T> Clone for Const<T> {
	fn clone(&self) -> Self {
		Const {
			body: self.body.clone(),
		}
	}
}

impl<T> Const<T>
where
	T: Clone + 'static,
{
	pub fn new(value: T) -> Self {
		Const {
			body: Rc::new(ConstBody {
				value,
				revision: Revision::new(),
			}),
		}
	}

	pub fn get(&self) -> T {
		self.body.value.clone()
	}

	/// Invokes `callback` once, there is nothing to subscribe to.
	pub fn bind(&self, callback: impl Fn(T) + 'static) -> Binding {
		self.bind_with(callback, None, None)
	}

	/// Same as [`Const::bind`]. The comparer and the scheduler are never
	/// consulted since the value never changes.
	pub fn bind_with(
		&self,
		callback: impl Fn(T) + 'static,
		_comparer: Option<Comparer<T>>,
		_scheduler: Option<Rc<dyn Scheduler>>,
	) -> Binding {
		untracked(|| callback(self.get()));
		Binding::noop()
	}

	pub fn map<R>(&self, transform: impl Fn(&T) -> R + 'static) -> Value<R>
	where
		R: Clone + PartialEq + 'static,
	{
		Value::from(self.clone()).map(transform)
	}
}

impl<T: 'static> Observable for ConstBody<T> {
	fn revision(&self) -> Revision {
		self.revision
	}

	fn can_fire(&self) -> bool {
		false
	}

	fn subscribe(&self, _: Rc<dyn Observer>) {}

	fn unsubscribe(&self, _: &Rc<dyn Observer>) {}
}

impl<T> Access<T> for ConstBody<T>
where
	T: Clone + 'static,
{
	fn value(&self) -> T {
		self.value.clone()
	}

	fn comparer(&self) -> Comparer<T> {
		Comparer::never()
	}
}

impl<T> From<Const<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(value: Const<T>) -> Self {
		Value::new(value.body)
	}
}

impl<T> From<T> for Const<T>
where
	T: Clone + 'static,
{
	fn from(value: T) -> Self {
		Const::new(value)
	}
}
