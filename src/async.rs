use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll};

use futures::future::LocalBoxFuture;
use futures::task::noop_waker_ref;
use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::computation::Computation;
use crate::computed::{Auto, AutoBody};
use crate::evaluation::{Derived, Evaluation};
use crate::{executor, Comparer};

/// State of an asynchronous computation.
#[derive(Debug)]
pub enum AsyncResult<T> {
	Loading,
	Done(T),
	Failed(Rc<anyhow::Error>),
}

impl<T> AsyncResult<T> {
	pub fn is_loading(&self) -> bool {
		matches!(self, AsyncResult::Loading)
	}

	pub fn value(&self) -> Option<&T> {
		match self {
			AsyncResult::Done(value) => Some(value),
			_ => None,
		}
	}

	pub fn error(&self) -> Option<&anyhow::Error> {
		match self {
			AsyncResult::Failed(error) => Some(error),
			_ => None,
		}
	}

	/// Transform the value of a finished computation.
	pub fn map<R>(self, func: impl FnOnce(T) -> R) -> AsyncResult<R> {
		match self {
			AsyncResult::Loading => AsyncResult::Loading,
			AsyncResult::Done(value) => AsyncResult::Done(func(value)),
			AsyncResult::Failed(error) => AsyncResult::Failed(error),
		}
	}
}

impl<T: Clone> Clone for AsyncResult<T> {
	fn clone(&self) -> Self {
		match self {
			AsyncResult::Loading => AsyncResult::Loading,
			AsyncResult::Done(value) => AsyncResult::Done(value.clone()),
			AsyncResult::Failed(error) => AsyncResult::Failed(error.clone()),
		}
	}
}

/// Errors are equal only when they are the same failure.
impl<T: PartialEq> PartialEq for AsyncResult<T> {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(AsyncResult::Loading, AsyncResult::Loading) => true,
			(AsyncResult::Done(a), AsyncResult::Done(b)) => a == b,
			(AsyncResult::Failed(a), AsyncResult::Failed(b)) => Rc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl<T> From<anyhow::Result<T>> for AsyncResult<T> {
	fn from(result: anyhow::Result<T>) -> Self {
		match result {
			Ok(value) => AsyncResult::Done(value),
			Err(error) => AsyncResult::Failed(Rc::new(error)),
		}
	}
}

type Start<T> = Box<dyn Fn(CancellationToken) -> LocalBoxFuture<'static, anyhow::Result<T>>>;

/// One invocation of the async function.
struct Run {
	/// Cleared when a newer run replaces this one or when it completes.
	attached: Cell<bool>,
	token: CancellationToken,
}

impl Run {
	fn detach(&self) {
		self.attached.set(false);
		self.token.cancel();
	}
}

struct AsyncComputation<T: 'static> {
	start: Start<T>,
	owner: Weak<AutoBody<AsyncResult<T>>>,
	run: RefCell<Option<Rc<Run>>>,
}

impl<T> Computation<AsyncResult<T>> for AsyncComputation<T>
where
	T: Clone + 'static,
{
	fn next(&self) -> AsyncResult<T> {
		if let Some(previous) = self.run.borrow_mut().take() {
			previous.detach();
		}

		let token = CancellationToken::new();
		let mut future = Box::pin(Tracked {
			future: (self.start)(token.clone()),
			owner: self.owner.clone() as Weak<dyn Derived>,
		});

		let mut cx = Context::from_waker(noop_waker_ref());
		if let Poll::Ready(result) = future.as_mut().poll(&mut cx) {
			return AsyncResult::from(result);
		}

		let run = Rc::new(Run {
			attached: Cell::new(true),
			token,
		});
		*self.run.borrow_mut() = Some(run.clone());

		let owner = self.owner.clone();
		executor::spawn(
			async move {
				let result = future.await;
				if !run.attached.replace(false) {
					return;
				}

				if let Some(owner) = owner.upgrade() {
					owner.trigger_async(AsyncResult::from(result));
				}
			}
			.boxed_local(),
		);

		AsyncResult::Loading
	}

	fn is_pending(&self) -> bool {
		self.run
			.borrow()
			.as_ref()
			.map_or(false, |run| run.attached.get())
	}
}

impl<T: 'static> Drop for AsyncComputation<T> {
	fn drop(&mut self) {
		if let Some(run) = self.run.get_mut().take() {
			run.detach();
		}
	}
}

/// Attributes every poll of the inner future to the owning node.
struct Tracked<T> {
	future: LocalBoxFuture<'static, T>,
	owner: Weak<dyn Derived>,
}

impl<T> Future for Tracked<T> {
	type Output = T;

	fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
		let this = self.get_mut();
		let _evaluation = Evaluation::enter(Some(this.owner.clone()));
		this.future.as_mut().poll(cx)
	}
}

impl<T> Auto<AsyncResult<T>>
where
	T: Clone + PartialEq + 'static,
{
	/// An auto-observable backed by a future.
	///
	/// A future that completes on its first poll yields its result directly.
	/// Otherwise the node reports [`AsyncResult::Loading`] and the rest of the
	/// future runs on the default [`executor`](crate::executor). Results of runs
	/// replaced by a newer one are dropped.
	pub fn new_async<F, Fut>(func: F) -> Self
	where
		F: Fn() -> Fut + 'static,
		Fut: Future<Output = anyhow::Result<T>> + 'static,
	{
		Self::from_start(Box::new(move |_| func().boxed_local()))
	}

	/// Like [`Auto::new_async`], the token is cancelled once the run is replaced
	/// or the node is dropped.
	pub fn new_cancelable<F, Fut>(func: F) -> Self
	where
		F: Fn(CancellationToken) -> Fut + 'static,
		Fut: Future<Output = anyhow::Result<T>> + 'static,
	{
		Self::from_start(Box::new(move |token| func(token).boxed_local()))
	}

	fn from_start(start: Start<T>) -> Self {
		Auto::from_computation(Comparer::default(), |owner| {
			Rc::new(AsyncComputation {
				start,
				owner,
				run: RefCell::new(None),
			})
		})
	}
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::AsyncResult;

	#[test]
	fn failures_compare_by_identity() {
		let error = Rc::new(anyhow::anyhow!("boom"));
		let a = AsyncResult::<i32>::Failed(error.clone());
		let b = AsyncResult::<i32>::Failed(error);
		let c = AsyncResult::<i32>::Failed(Rc::new(anyhow::anyhow!("boom")));

		assert_eq!(a, b);
		assert_ne!(a, c);
		assert_eq!(AsyncResult::<i32>::Loading, AsyncResult::Loading);
	}

	#[test]
	fn map_keeps_state() {
		assert_eq!(AsyncResult::Done(2).map(|v| v * 10), AsyncResult::Done(20));
		assert!(AsyncResult::<i32>::Loading.map(|v| v + 1).is_loading());

		let failed = AsyncResult::<i32>::from(Err(anyhow::anyhow!("nope")));
		let mapped = failed.map(|v| v.to_string());
		assert_eq!(mapped.error().map(|e| e.to_string()), Some("nope".to_owned()));
	}
}
