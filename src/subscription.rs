use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::{addr, Access, Observer, Revision};

/// Type-erased view of a [`Subscription`], as stored by its owner.
pub(crate) trait Dependency: 'static {
	/// Identity of the source.
	fn key(&self) -> usize;

	fn source_revision(&self) -> Revision;

	fn is_used(&self) -> bool;

	fn set_used(&self, used: bool);

	/// The source has not fired since the value was captured.
	fn is_valid(&self) -> bool;

	/// Refresh the captured value and report whether it differs.
	fn has_changed(&self) -> bool;

	fn connect(&self);

	fn disconnect(&self);

	fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

/// Link between a derived node and one of the sources it read.
pub(crate) struct Subscription<T: 'static> {
	source: Rc<dyn Access<T>>,
	owner: Weak<dyn Observer>,
	used: Cell<bool>,
	last: RefCell<T>,
	revision: Cell<Revision>,
}

impl<T> Subscription<T>
where
	T: Clone + 'static,
{
	pub fn new(source: Rc<dyn Access<T>>, owner: Weak<dyn Observer>, connect: bool) -> Self {
		let revision = source.revision();
		if connect {
			if let Some(owner) = owner.upgrade() {
				source.subscribe(owner);
			}
		}

		let last = source.value();
		Subscription {
			source,
			owner,
			used: Cell::new(true),
			last: RefCell::new(last),
			revision: Cell::new(revision),
		}
	}

	pub fn last(&self) -> T {
		self.last.borrow().clone()
	}

	pub fn reuse(&self) {
		self.used.set(true);
		let value = self.source.value();
		*self.last.borrow_mut() = value;
		self.revision.set(self.source.revision());
	}
}

impl<T> Dependency for Subscription<T>
where
	T: Clone + 'static,
{
	fn key(&self) -> usize {
		addr::key(&self.source)
	}

	fn source_revision(&self) -> Revision {
		self.source.revision()
	}

	fn is_used(&self) -> bool {
		self.used.get()
	}

	fn set_used(&self, used: bool) {
		self.used.set(used);
	}

	fn is_valid(&self) -> bool {
		self.source.revision() == self.revision.get()
	}

	fn has_changed(&self) -> bool {
		let next = self.source.revision();
		if next == self.revision.get() {
			return false;
		}

		self.revision.set(next);
		let value = self.source.value();
		let before = self.last.replace(value.clone());
		!self.source.comparer().eq(&value, &before)
	}

	fn connect(&self) {
		if let Some(owner) = self.owner.upgrade() {
			self.source.subscribe(owner);
		}
	}

	fn disconnect(&self) {
		if let Some(owner) = self.owner.upgrade() {
			self.source.unsubscribe(&owner);
		}
	}

	fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
		self
	}
}
