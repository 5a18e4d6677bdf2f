use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::addr;
use crate::subscription::{Dependency, Subscription};
use crate::{Access, Observer};

/// A node that records what it reads while computing.
pub(crate) trait Derived: 'static {
	fn dependency(&self, key: usize) -> Option<Rc<dyn Dependency>>;

	/// Register a dependency created during the current pass.
	fn add_dependency(&self, key: usize, dependency: Rc<dyn Dependency>);

	/// Keep a dependency from the previous pass.
	fn reuse_dependency(&self, dependency: Rc<dyn Dependency>);

	fn is_active(&self) -> bool;

	fn observer(&self) -> Weak<dyn Observer>;
}

thread_local! {
	static CURRENT: RefCell<Option<Weak<dyn Derived>>> = const { RefCell::new(None) };
}

/// Scope that attributes reads to a derived node.
///
/// The previous owner is restored on drop, including during unwinding.
pub(crate) struct Evaluation {
	previous: Option<Weak<dyn Derived>>,
}

impl Evaluation {
	pub fn enter(owner: Option<Weak<dyn Derived>>) -> Self {
		let previous = CURRENT.with(|current| current.replace(owner));
		Evaluation { previous }
	}
}

impl Drop for Evaluation {
	fn drop(&mut self) {
		let previous = self.previous.take();
		CURRENT.with(|current| *current.borrow_mut() = previous);
	}
}

/// Run `func` without recording any of its reads.
pub fn untracked<R>(func: impl FnOnce() -> R) -> R {
	let _evaluation = Evaluation::enter(None);
	func()
}

fn current() -> Option<Rc<dyn Derived>> {
	CURRENT.with(|current| current.borrow().as_ref().and_then(Weak::upgrade))
}

/// Read `source`, recording it as a dependency of the node being computed.
///
/// A source read twice within one pass keeps a single subscription; the
/// second read goes straight to the source.
pub(crate) fn track<T>(source: Rc<dyn Access<T>>) -> T
where
	T: Clone + 'static,
{
	let Some(derived) = current() else {
		return source.value();
	};

	if !source.can_fire() {
		return source.value();
	}

	let key = addr::key(&source);
	match derived.dependency(key) {
		None => {
			let owner = derived.observer();
			let subscription = Rc::new(Subscription::new(source, owner, derived.is_active()));
			let value = subscription.last();
			derived.add_dependency(key, subscription);
			value
		}
		Some(dependency) if !dependency.is_used() => {
			match dependency.into_any().downcast::<Subscription<T>>() {
				Ok(subscription) => {
					subscription.reuse();
					let value = subscription.last();
					derived.reuse_dependency(subscription);
					value
				}
				Err(_) => source.value(),
			}
		}
		Some(_) => source.value(),
	}
}

#[cfg(test)]
mod tests {
	use std::rc::{Rc, Weak};

	use super::{current, untracked, Derived, Evaluation};
	use crate::subscription::Dependency;
	use crate::Observer;

	struct Nobody;

	impl Observer for Nobody {
		fn notify(self: Rc<Self>) {}
	}

	impl Derived for Nobody {
		fn dependency(&self, _: usize) -> Option<Rc<dyn Dependency>> {
			None
		}
		fn add_dependency(&self, _: usize, _: Rc<dyn Dependency>) {}
		fn reuse_dependency(&self, _: Rc<dyn Dependency>) {}
		fn is_active(&self) -> bool {
			false
		}
		fn observer(&self) -> Weak<dyn Observer> {
			Weak::<Nobody>::new()
		}
	}

	#[test]
	fn scopes_nest_and_restore() {
		let outer = Rc::new(Nobody);
		let inner = Rc::new(Nobody);
		let outer_dyn: Rc<dyn Derived> = outer.clone();

		assert!(current().is_none());
		{
			let _outer = Evaluation::enter(Some(Rc::downgrade(&outer) as Weak<dyn Derived>));
			{
				let _inner = Evaluation::enter(Some(Rc::downgrade(&inner) as Weak<dyn Derived>));
				untracked(|| assert!(current().is_none()));
			}
			let active = current().unwrap();
			assert!(Rc::ptr_eq(&active, &outer_dyn));
		}
		assert!(current().is_none());
	}

	#[test]
	fn scope_is_restored_on_panic() {
		let owner = Rc::new(Nobody);
		let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
			let _scope = Evaluation::enter(Some(Rc::downgrade(&owner) as Weak<dyn Derived>));
			panic!("computation failed");
		}));
		assert!(result.is_err());
		assert!(current().is_none());
	}
}
