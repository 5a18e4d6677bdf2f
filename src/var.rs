use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use crate::binding::{self, Binding};
use crate::dispatcher::Dispatcher;
use crate::evaluation;
use crate::{Access, Comparer, Observable, Observer, Revision, Scheduler, Value};

/// A mutable observable cell.
pub struct State<T: 'static> {
	body: Rc<VarBody<T>>,
}

struct VarBody<T: 'static> {
	dispatcher: Dispatcher,
	value: RefCell<T>,
	comparer: Comparer<T>,
}

impl<T> Clone for State<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

impl<T> Default for State<T>
where
	T: Default + Clone + PartialEq + 'static,
{
	fn default() -> Self {
		State::new(Default::default())
	}
}

pub trait Toggle {
	fn toggle(&mut self);
}

impl Toggle for bool {
	fn toggle(&mut self) {
		*self = !*self
	}
}

impl<T> State<T>
where
	T: Clone + 'static,
{
	pub fn new(value: T) -> Self
	where
		T: PartialEq,
	{
		Self::with_comparer(value, Comparer::default())
	}

	pub fn with_comparer(value: T, comparer: Comparer<T>) -> Self {
		State {
			body: Rc::new(VarBody {
				dispatcher: Dispatcher::new(),
				value: RefCell::new(value),
				comparer,
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

	/// Store `value`, notifying observers if it differs from the current one.
	#[inline]
	pub fn set(&self, value: T) {
		let _ = self.replace(value);
	}

	/// Like [`State::set`], returning the previous value. A value equal to the
	/// current one is handed back and the state is left untouched.
	pub fn replace(&self, value: T) -> T {
		if self.body.comparer.eq(&self.body.value.borrow(), &value) {
			return value;
		}

		let previous = self.body.value.replace(value);
		self.body.fire();
		previous
	}

	/// Mutate the value in place. Observers are notified if the result differs
	/// from the value before the call.
	pub fn update(&self, func: impl FnOnce(&mut T)) {
		let mut value = self.get_once();
		func(&mut value);
		self.set(value);
	}

	#[inline]
	pub fn toggle(&self)
	where
		T: Toggle,
	{
		self.update(T::toggle)
	}

	/// Notify observers even though the value did not change, e.g. after
	/// mutating data shared through it.
	pub fn force_invalidate(&self) {
		self.body.fire();
	}

	pub fn revision(&self) -> Revision {
		self.body.dispatcher.revision()
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

impl<T: 'static> VarBody<T> {
	fn fire(&self) {
		// A state has nothing upstream to connect, transitions are ignored.
		let _ = self.dispatcher.fire();
	}
}

impl<T: 'static> Observable for VarBody<T> {
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

impl<T> Access<T> for VarBody<T>
where
	T: Clone + 'static,
{
	fn value(&self) -> T {
		self.value.borrow().clone()
	}

	fn comparer(&self) -> Comparer<T> {
		self.comparer.clone()
	}
}

impl<T> From<State<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(state: State<T>) -> Self {
		Value::new(state.body)
	}
}

impl<T> Debug for State<T>
where
	T: Debug + 'static,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		self.body.value.borrow().fmt(f)
	}
}
