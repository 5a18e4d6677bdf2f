use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use fxhash::FxHashMap;

use crate::binding::{self, Binding};
use crate::computation::{Computation, SyncComputation};
use crate::config::{self, Divergence};
use crate::dispatcher::{Dispatcher, Transition};
use crate::evaluation::{self, Derived, Evaluation};
use crate::subscription::Dependency;
use crate::{Access, Comparer, Error, Observable, Observer, Revision, Scheduler, Value};

/// A memoized value computed from other observables.
///
/// Every observable read inside the computation is recorded. The value is
/// computed lazily on first read and recomputed only when one of the recorded
/// dependencies reports a different value.
pub struct Auto<T: 'static> {
	pub(crate) body: Rc<AutoBody<T>>,
}

impl<T> Clone for Auto<T> {
	fn clone(&self) -> Self {
		Self {
			body: self.body.clone(),
		}
	}
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
enum Status {
	Fresh,
	Computing,
	Computed,
	Dirty,
}

pub(crate) struct AutoBody<T: 'static> {
	dispatcher: Dispatcher,
	computation: Rc<dyn Computation<T>>,
	comparer: Comparer<T>,
	status: Cell<Status>,
	active: Cell<bool>,
	/// Dependencies recorded by the latest pass, in read order.
	subscriptions: RefCell<Vec<Rc<dyn Dependency>>>,
	/// The same dependencies keyed by source identity.
	dependencies: RefCell<FxHashMap<usize, Rc<dyn Dependency>>>,
	last: RefCell<Option<T>>,
	this: Weak<AutoBody<T>>,
}

impl<T> Auto<T>
where
	T: Clone + 'static,
{
	pub fn new(func: impl Fn() -> T + 'static) -> Self
	where
		T: PartialEq,
	{
		Self::with_comparer(func, Comparer::default())
	}

	pub fn with_comparer(func: impl Fn() -> T + 'static, comparer: Comparer<T>) -> Self {
		Self::from_computation(comparer, |_| Rc::new(SyncComputation::new(func)))
	}

	pub(crate) fn from_computation(
		comparer: Comparer<T>,
		computation: impl FnOnce(Weak<AutoBody<T>>) -> Rc<dyn Computation<T>>,
	) -> Self {
		Auto {
			body: Rc::new_cyclic(|this| AutoBody {
				dispatcher: Dispatcher::new(),
				computation: computation(this.clone()),
				comparer,
				status: Cell::new(Status::Fresh),
				active: Cell::new(false),
				subscriptions: RefCell::new(Vec::new()),
				dependencies: RefCell::new(FxHashMap::default()),
				last: RefCell::new(None),
				this: this.clone(),
			}),
		}
	}

	/// Current value, recorded as a dependency of the computation in progress.
	#[inline]
	pub fn get(&self) -> T {
		evaluation::track(self.body.clone())
	}

	/// Current value without recording a dependency.
	///
	/// # Panics
	///
	/// If the computation does not settle and [`Divergence::Panic`] is
	/// configured.
	#[inline]
	pub fn get_once(&self) -> T {
		self.body.get_value(false)
	}

	/// Like [`Auto::get_once`], but reports divergence as an error.
	pub fn try_get_once(&self) -> Result<T, Error> {
		self.body.compute_value(false)
	}

	pub fn revision(&self) -> Revision {
		self.body.revision()
	}

	/// `false` once the last computation read nothing that can change.
	pub fn can_fire(&self) -> bool {
		self.body.dispatcher.can_fire()
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

impl<T> AutoBody<T>
where
	T: Clone + 'static,
{
	pub fn get_value(&self, force: bool) -> T {
		match self.compute_value(force) {
			Ok(value) => value,
			Err(error) => match config::get().divergence {
				Divergence::Panic => {
					tracing::error!(%error, "auto-observable diverged");
					panic!("{error}");
				}
				Divergence::Warn => {
					tracing::warn!(%error, "auto-observable diverged, using the last value");
					self.cached()
				}
			},
		}
	}

	fn compute_value(&self, mut force: bool) -> Result<T, Error> {
		let max_iterations = config::get().max_iterations;

		let mut count = 0;
		while force || !self.is_valid() {
			force = false;
			count += 1;
			if count > max_iterations {
				return Err(Error::Diverged {
					iterations: max_iterations,
				});
			}

			if self.status.get() == Status::Fresh || self.any_changed() {
				self.compute();
			} else {
				self.status.set(Status::Computed);
			}
		}

		Ok(self.cached())
	}

	fn cached(&self) -> T {
		match &*self.last.borrow() {
			Some(value) => value.clone(),
			None => unreachable!("auto-observable read before its first computation"),
		}
	}

	fn compute(&self) {
		self.status.set(Status::Computing);

		let previous = std::mem::take(&mut *self.subscriptions.borrow_mut());
		for subscription in &previous {
			subscription.set_used(false);
		}

		let value = {
			let _evaluation = Evaluation::enter(Some(self.this.clone() as Weak<dyn Derived>));
			self.computation.next()
		};
		*self.last.borrow_mut() = Some(value);

		// A dependency fired while we were computing: keep the status dirty so
		// the caller loops.
		if self.status.get() == Status::Computing {
			self.status.set(Status::Computed);
		}

		for subscription in previous {
			if !subscription.is_used() {
				self.dependencies.borrow_mut().remove(&subscription.key());
				if self.active.get() {
					subscription.disconnect();
				}
			}
		}

		let count = self.subscriptions.borrow().len();
		tracing::trace!(dependencies = count, "auto-observable computed");

		if count == 0 && !self.computation.is_pending() {
			self.dispose();
		}
	}

	fn is_valid(&self) -> bool {
		self.status.get() == Status::Computed && (self.active.get() || self.all_valid())
	}

	fn all_valid(&self) -> bool {
		!self.any_dependency(|s| !s.is_valid())
	}

	/// Stops at the first change; dependencies after it are refreshed when
	/// they are reused by the recomputation.
	fn any_changed(&self) -> bool {
		self.any_dependency(|s| s.has_changed())
	}

	fn any_dependency(&self, predicate: impl Fn(&dyn Dependency) -> bool) -> bool {
		let mut index = 0;
		loop {
			let subscription = self.subscriptions.borrow().get(index).cloned();
			match subscription {
				Some(subscription) if predicate(&*subscription) => return true,
				Some(_) => index += 1,
				None => return false,
			}
		}
	}

	pub fn revision(&self) -> Revision {
		if self.active.get() {
			return self.dispatcher.revision();
		}

		if self.status.get() == Status::Fresh {
			self.get_value(false);
		}

		self.sync_revision()
	}

	/// Move our revision past the revision of any source that fired since.
	fn sync_revision(&self) -> Revision {
		let own = self.dispatcher.revision();
		if self.any_dependency(|s| s.source_revision() > own) {
			let revision = Revision::new();
			self.dispatcher.set_revision(revision);
			return revision;
		}

		own
	}

	/// Store the result of work that finished outside of a pull.
	///
	/// Only the current run delivers here, so the result is applied whatever
	/// the status. A dirty node still revalidates on its next pull.
	pub fn trigger_async(&self, value: T) {
		*self.last.borrow_mut() = Some(value);
		self.fire();

		if self.subscriptions.borrow().is_empty() && !self.computation.is_pending() {
			self.dispose();
		}
	}

	fn fire(&self) {
		if let Some(transition) = self.dispatcher.fire() {
			self.transition(transition);
		}
	}

	fn dispose(&self) {
		tracing::debug!("auto-observable has no dependencies left, folding into a constant");
		self.dispatcher.dispose();
	}

	fn transition(&self, transition: Transition) {
		match transition {
			Transition::Activated => self.wakeup(),
			Transition::Deactivated => self.sleep(),
		}
	}

	fn wakeup(&self) {
		self.computation.wakeup();
		self.active.set(true);
		self.for_each_dependency(|s| s.connect());
		self.get_value(true);
		self.sync_revision();
	}

	fn sleep(&self) {
		self.computation.sleep();
		self.active.set(false);
		self.for_each_dependency(|s| s.disconnect());
	}

	fn for_each_dependency(&self, func: impl Fn(&dyn Dependency)) {
		let subscriptions = self.subscriptions.borrow().clone();
		for subscription in subscriptions {
			func(&*subscription);
		}
	}
}

impl<T> Observer for AutoBody<T>
where
	T: Clone + 'static,
{
	fn notify(self: Rc<Self>) {
		match self.status.get() {
			Status::Computed => {
				self.status.set(Status::Dirty);
				self.fire();
			}
			Status::Computing => self.status.set(Status::Dirty),
			Status::Fresh | Status::Dirty => {}
		}
	}
}

impl<T> Observable for AutoBody<T>
where
	T: Clone + 'static,
{
	fn revision(&self) -> Revision {
		AutoBody::revision(self)
	}

	fn can_fire(&self) -> bool {
		self.dispatcher.can_fire()
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

impl<T> Access<T> for AutoBody<T>
where
	T: Clone + 'static,
{
	fn value(&self) -> T {
		self.get_value(false)
	}

	fn comparer(&self) -> Comparer<T> {
		self.comparer.clone()
	}
}

impl<T> Derived for AutoBody<T>
where
	T: Clone + 'static,
{
	fn dependency(&self, key: usize) -> Option<Rc<dyn Dependency>> {
		self.dependencies.borrow().get(&key).cloned()
	}

	fn add_dependency(&self, key: usize, dependency: Rc<dyn Dependency>) {
		self.dependencies.borrow_mut().insert(key, dependency.clone());
		self.subscriptions.borrow_mut().push(dependency);
	}

	fn reuse_dependency(&self, dependency: Rc<dyn Dependency>) {
		self.subscriptions.borrow_mut().push(dependency);
	}

	fn is_active(&self) -> bool {
		self.active.get()
	}

	fn observer(&self) -> Weak<dyn Observer> {
		self.this.clone()
	}
}

impl<T> From<Auto<T>> for Value<T>
where
	T: Clone + 'static,
{
	fn from(auto: Auto<T>) -> Self {
		Value::new(auto.body)
	}
}

impl<T> std::fmt::Debug for Auto<T>
where
	T: std::fmt::Debug,
{
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Auto")
			.field("status", &self.body.status.get())
			.field("value", &self.body.last.borrow())
			.finish()
	}
}
