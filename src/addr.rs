use std::ops::Deref;
use std::rc::Rc;

/// Compares `Rc`s by the address of the allocation they point to.
pub struct RcAddr<T: ?Sized> {
	ptr: Rc<T>,
}

impl<T: ?Sized> RcAddr<T> {
	pub fn new(ptr: Rc<T>) -> Self {
		RcAddr { ptr }
	}

	pub fn key(&self) -> usize {
		key(&self.ptr)
	}
}

impl<T: ?Sized> Clone for RcAddr<T> {
	fn clone(&self) -> Self {
		RcAddr {
			ptr: self.ptr.clone(),
		}
	}
}

impl<T: ?Sized> Deref for RcAddr<T> {
	type Target = Rc<T>;
	fn deref(&self) -> &Self::Target {
		&self.ptr
	}
}

impl<T: ?Sized> PartialEq for RcAddr<T> {
	fn eq(&self, other: &Self) -> bool {
		self.key() == other.key()
	}
}

impl<T: ?Sized> Eq for RcAddr<T> {}

/// Identity of an allocation, ignoring any vtable part of the pointer.
pub fn key<T: ?Sized>(ptr: &Rc<T>) -> usize {
	Rc::as_ptr(ptr).cast::<()>() as usize
}

#[cfg(test)]
mod tests {
	use std::rc::Rc;

	use super::RcAddr;

	#[test]
	fn equality_follows_allocation() {
		let a = Rc::new(1);
		let b = Rc::new(1);
		assert!(RcAddr::new(a.clone()) == RcAddr::new(a.clone()));
		assert!(RcAddr::new(a) != RcAddr::new(b));
	}
}
