pub use enclose::*;

/// Create an [`Auto`](crate::Auto), cloning the listed captures into the
/// computation.
///
/// ```
/// use observe::{auto, State};
///
/// let a = State::new(1);
/// let b = State::new(2);
/// let sum = auto!((a, b) => a.get() + b.get());
/// assert_eq!(sum.get_once(), 3);
/// ```
#[macro_export]
macro_rules! auto {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::Auto::new($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::Auto::new(move || { $($b)* })
    };
}

/// Run a block now and whenever anything it read changes, returning the
/// [`Binding`](crate::Binding).
///
/// ```
/// use observe::{autorun, State};
///
/// let name = State::new("world".to_owned());
/// let binding = autorun!((name) => println!("hello {}", name.get()));
/// name.set("there".to_owned());
/// binding.dispose();
/// ```
#[macro_export]
macro_rules! autorun {
    (( $($d_tt:tt)* ) => $($b:tt)*) => {
        $crate::auto_run($crate::macros::enclose!(($( $d_tt )*) move || { $($b)* }))
    };
    (=> $($b:tt)*) => {
        $crate::auto_run(move || { $($b)* })
    };
}
