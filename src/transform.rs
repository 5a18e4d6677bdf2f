use std::cell::{OnceCell, RefCell};
use std::rc::{Rc, Weak};

use crate::dispatcher::{Dispatcher, Transition};
use crate::{Access, Comparer, Observable, Observer, Revision};

/// A pure function of another node.
///
/// Shares the revision of its source. Readers subscribe to the transform's own
/// dispatcher, and the transform stays subscribed to the source only while it
/// has readers. The function runs lazily, at most once per source revision.
pub(crate) struct TransformBody<S: 'static, T: 'static> {
	dispatcher: Dispatcher,
	source: Rc<dyn Access<S>>,
	transform: Box<dyn Fn(&S) -> T>,
	comparer: Comparer<T>,
	cache: RefCell<Option<(Revision, T)>>,
	this: Weak<TransformBody<S, T>>,
}

impl<S, T> TransformBody<S, T>
where
	S: 'static,
	T: Clone + 'static,
{
	pub fn new(source: Rc<dyn Access<S>>, transform: Box<dyn Fn(&S) -> T>, comparer: Comparer<T>) -> Rc<Self> {
		Rc::new_cyclic(|this| TransformBody {
			dispatcher: Dispatcher::new(),
			source,
			transform,
			comparer,
			cache: RefCell::new(None),
			this: this.clone(),
		})
	}
}

impl<S, T> TransformBody<S, T>
where
	S: 'static,
	T: 'static,
{
	fn transition(&self, transition: Transition) {
		let Some(this) = self.this.upgrade() else {
			return;
		};

		let this: Rc<dyn Observer> = this;
		match transition {
			Transition::Activated => self.source.subscribe(this),
			Transition::Deactivated => self.source.unsubscribe(&this),
		}
	}
}

impl<S, T> Observer for TransformBody<S, T>
where
	S: 'static,
	T: 'static,
{
	fn notify(self: Rc<Self>) {
		if let Some(transition) = self.dispatcher.fire() {
			self.transition(transition);
		}
	}
}

impl<S, T> Observable for TransformBody<S, T>
where
	S: 'static,
	T: 'static,
{
	fn revision(&self) -> Revision {
		self.source.revision()
	}

	fn can_fire(&self) -> bool {
		self.source.can_fire()
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

impl<S, T> Access<T> for TransformBody<S, T>
where
	S: 'static,
	T: Clone + 'static,
{
	fn value(&self) -> T {
		let revision = self.source.revision();
		if let Some((cached, value)) = &*self.cache.borrow() {
			if *cached >= revision {
				return value.clone();
			}
		}

		let value = (self.transform)(&self.source.value());
		*self.cache.borrow_mut() = Some((revision, value.clone()));
		value
	}

	fn comparer(&self) -> Comparer<T> {
		self.comparer.clone()
	}
}

/// Transform of a node that can never fire: computed once, on first read.
pub(crate) struct OnceTransformBody<S: 'static, T: 'static> {
	source: Rc<dyn Access<S>>,
	transform: Box<dyn Fn(&S) -> T>,
	comparer: Comparer<T>,
	value: OnceCell<T>,
}

impl<S, T> OnceTransformBody<S, T>
where
	S: 'static,
	T: Clone + 'static,
{
	pub fn new(source: Rc<dyn Access<S>>, transform: Box<dyn Fn(&S) -> T>, comparer: Comparer<T>) -> Self {
		OnceTransformBody {
			source,
			transform,
			comparer,
			value: OnceCell::new(),
		}
	}
}

impl<S, T> Observable for OnceTransformBody<S, T>
where
	S: 'static,
	T: 'static,
{
	fn revision(&self) -> Revision {
		self.source.revision()
	}

	fn can_fire(&self) -> bool {
		false
	}

	fn subscribe(&self, _: Rc<dyn Observer>) {}

	fn unsubscribe(&self, _: &Rc<dyn Observer>) {}
}

impl<S, T> Access<T> for OnceTransformBody<S, T>
where
	S: 'static,
	T: Clone + 'static,
{
	fn value(&self) -> T {
		self.value
			.get_or_init(|| (self.transform)(&self.source.value()))
			.clone()
	}

	fn comparer(&self) -> Comparer<T> {
		self.comparer.clone()
	}
}

#[cfg(test)]
mod tests {
	use std::cell::Cell;
	use std::rc::Rc;

	use crate::{Auto, Const, State};

	#[test]
	fn runs_once_per_source_revision() {
		let state = State::new(2);
		let runs = Rc::new(Cell::new(0));
		let doubled = state.map({
			let runs = runs.clone();
			move |v| {
				runs.set(runs.get() + 1);
				v * 2
			}
		});

		assert!(doubled.can_fire());
		assert_eq!(doubled.get_once(), 4);
		assert_eq!(doubled.get_once(), 4);
		assert_eq!(runs.get(), 1);
		assert_eq!(doubled.revision(), state.revision());

		state.set(5);
		assert_eq!(doubled.get_once(), 10);
		assert_eq!(runs.get(), 2);
	}

	#[test]
	fn constant_source_maps_once() {
		let mapped = Const::new(3).map(|v| v + 1);
		assert!(!mapped.can_fire());
		assert_eq!(mapped.get_once(), 4);

		let folded = Auto::new(|| 10).map(|v| v / 2);
		assert_eq!(folded.get_once(), 5);
	}
}
