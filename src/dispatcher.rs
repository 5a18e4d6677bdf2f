use std::cell::{Cell, RefCell};
use std::rc::Rc;

use smallvec::SmallVec;

use crate::addr::RcAddr;
use crate::{Observer, Revision};

/// Change of the "has observers" status of a dispatcher.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub(crate) enum Transition {
	Activated,
	Deactivated,
}

enum Change {
	Add(RcAddr<dyn Observer>),
	Remove(RcAddr<dyn Observer>),
}

type Observers = SmallVec<[RcAddr<dyn Observer>; 2]>;

/// Observer list shared by every firing node.
///
/// While a fire pass is running, subscribe and unsubscribe requests are queued
/// and applied once every observer of the pass has been notified. Owners react
/// to the returned [`Transition`]s to wake up or go to sleep.
pub(crate) struct Dispatcher {
	revision: Cell<Revision>,
	/// `None` once disposed.
	observers: RefCell<Option<Observers>>,
	depth: Cell<usize>,
	deferred: RefCell<Vec<Change>>,
}

impl Dispatcher {
	pub fn new() -> Self {
		Dispatcher {
			revision: Cell::new(Revision::new()),
			observers: RefCell::new(Some(SmallVec::new())),
			depth: Cell::new(0),
			deferred: RefCell::new(Vec::new()),
		}
	}

	pub fn revision(&self) -> Revision {
		self.revision.get()
	}

	pub fn set_revision(&self, revision: Revision) {
		self.revision.set(revision);
	}

	pub fn can_fire(&self) -> bool {
		self.observers.borrow().is_some()
	}

	pub fn subscribe(&self, observer: Rc<dyn Observer>) -> Option<Transition> {
		let observer = RcAddr::new(observer);
		if self.is_firing() {
			self.deferred.borrow_mut().push(Change::Add(observer));
			return None;
		}

		self.add(observer)
	}

	pub fn unsubscribe(&self, observer: &Rc<dyn Observer>) -> Option<Transition> {
		let observer = RcAddr::new(observer.clone());
		if self.is_firing() {
			self.deferred.borrow_mut().push(Change::Remove(observer));
			return None;
		}

		self.remove(&observer)
	}

	/// Bump the revision and notify observers in subscription order.
	pub fn fire(&self) -> Option<Transition> {
		self.revision.set(Revision::new());
		self.depth.set(self.depth.get() + 1);

		let mut index = 0;
		loop {
			let observer = {
				let observers = self.observers.borrow();
				let observer = observers.as_ref().and_then(|o| o.get(index)).cloned();
				observer
			};

			let Some(observer) = observer else {
				break;
			};

			Rc::clone(&*observer).notify();
			index += 1;
		}

		self.depth.set(self.depth.get() - 1);
		if self.is_firing() {
			return None;
		}

		self.apply_deferred()
	}

	/// Forget every observer. The dispatcher can never fire again.
	pub fn dispose(&self) {
		*self.observers.borrow_mut() = None;
		self.deferred.borrow_mut().clear();
	}

	fn is_firing(&self) -> bool {
		self.depth.get() > 0
	}

	fn is_empty(&self) -> Option<bool> {
		self.observers.borrow().as_ref().map(|o| o.is_empty())
	}

	fn add(&self, observer: RcAddr<dyn Observer>) -> Option<Transition> {
		let mut observers = self.observers.borrow_mut();
		let observers = observers.as_mut()?;
		if observers.contains(&observer) {
			return None;
		}

		let was_empty = observers.is_empty();
		observers.push(observer);
		was_empty.then_some(Transition::Activated)
	}

	fn remove(&self, observer: &RcAddr<dyn Observer>) -> Option<Transition> {
		let mut observers = self.observers.borrow_mut();
		let observers = observers.as_mut()?;
		let index = observers.iter().position(|o| o == observer)?;
		observers.remove(index);
		observers.is_empty().then_some(Transition::Deactivated)
	}

	fn apply_deferred(&self) -> Option<Transition> {
		let changes = std::mem::take(&mut *self.deferred.borrow_mut());
		if changes.is_empty() {
			return None;
		}

		let was_empty = self.is_empty()?;
		for change in changes {
			match change {
				Change::Add(observer) => {
					self.add(observer);
				}
				Change::Remove(observer) => {
					self.remove(&observer);
				}
			}
		}

		match (was_empty, self.is_empty()?) {
			(true, false) => Some(Transition::Activated),
			(false, true) => Some(Transition::Deactivated),
			_ => None,
		}
	}
}
