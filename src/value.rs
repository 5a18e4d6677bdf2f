use std::rc::Rc;

use crate::binding::{self, Binding};
use crate::evaluation;
use crate::transform::{OnceTransformBody, TransformBody};
use crate::{Access, Comparer, Revision, Scheduler};

/// A read-only handle to any node.
pub struct Value<T: 'static> {
	value: Rc<dyn Access<T>>,
}

impl<T> Clone for Value<T> {
	fn clone(&self) -> Self {
		Value {
			value: self.value.clone(),
		}
	}
}

impl<T> Value<T>
where
	T: Clone + 'static,
{
	pub(crate) fn new(value: Rc<dyn Access<T>>) -> Self {
		Value { value }
	}

	#[inline]
	pub fn get(&self) -> T {
		evaluation::track(self.value.clone())
	}

	#[inline]
	pub fn get_once(&self) -> T {
		self.value.value()
	}

	pub fn revision(&self) -> Revision {
		self.value.revision()
	}

	pub fn can_fire(&self) -> bool {
		self.value.can_fire()
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
		binding::bind(self.value.clone(), Rc::new(callback), comparer, scheduler)
	}

	pub fn map<R>(&self, transform: impl Fn(&T) -> R + 'static) -> Value<R>
	where
		R: Clone + PartialEq + 'static,
	{
		self.map_with(transform, Comparer::default())
	}

	pub fn map_with<R>(&self, transform: impl Fn(&T) -> R + 'static, comparer: Comparer<R>) -> Value<R>
	where
		R: Clone + 'static,
	{
		let source = self.value.clone();
		let transform = Box::new(transform);
		if source.can_fire() {
			Value::new(TransformBody::new(source, transform, comparer))
		} else {
			Value::new(Rc::new(OnceTransformBody::new(source, transform, comparer)))
		}
	}
}

impl<T> std::fmt::Debug for Value<T>
where
	T: Clone + std::fmt::Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.get_once().fmt(f)
	}
}
