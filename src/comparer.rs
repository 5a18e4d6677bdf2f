use std::hash::Hash;
use std::rc::Rc;

/// Decides whether two values of a node are equal, i.e. whether a change
/// needs to be propagated.
pub struct Comparer<T: ?Sized> {
	func: Rc<dyn Fn(&T, &T) -> bool>,
}

impl<T: ?Sized> Clone for Comparer<T> {
	fn clone(&self) -> Self {
		Comparer {
			func: self.func.clone(),
		}
	}
}

impl<T> Default for Comparer<T>
where
	T: PartialEq + ?Sized + 'static,
{
	fn default() -> Self {
		Comparer::new(|a: &T, b: &T| a == b)
	}
}

impl<T: ?Sized + 'static> Comparer<T> {
	pub fn new(func: impl Fn(&T, &T) -> bool + 'static) -> Self {
		Comparer {
			func: Rc::new(func),
		}
	}

	/// Treats every assignment as a change.
	pub fn never() -> Self {
		Comparer::new(|_, _| false)
	}

	/// Compares values by their `fxhash` digest.
	pub fn by_hash() -> Self
	where
		T: Hash,
	{
		Comparer::new(|a: &T, b: &T| fxhash::hash64(a) == fxhash::hash64(b))
	}

	pub fn eq(&self, a: &T, b: &T) -> bool {
		(self.func)(a, b)
	}

	/// Values are equal if either comparer says so.
	pub fn or(self, other: Option<Comparer<T>>) -> Comparer<T> {
		match other {
			None => self,
			Some(other) => Comparer::new(move |a: &T, b: &T| self.eq(a, b) || other.eq(a, b)),
		}
	}
}

impl<T: ?Sized> std::fmt::Debug for Comparer<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Comparer").finish_non_exhaustive()
	}
}
