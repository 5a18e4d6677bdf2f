/// How an auto-observable produces its next value.
pub(crate) trait Computation<T>: 'static {
	fn next(&self) -> T;

	/// Work started by the last `next` call has not delivered its result yet.
	fn is_pending(&self) -> bool {
		false
	}

	fn wakeup(&self) {}

	fn sleep(&self) {}
}

pub(crate) struct SyncComputation<F> {
	func: F,
}

impl<F> SyncComputation<F> {
	pub fn new(func: F) -> Self {
		SyncComputation { func }
	}
}

impl<T, F> Computation<T> for SyncComputation<F>
where
	F: Fn() -> T + 'static,
{
	fn next(&self) -> T {
		(self.func)()
	}
}
