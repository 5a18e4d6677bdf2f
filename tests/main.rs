use std::cell::Cell;
use std::rc::Rc;

use mockall::predicate;
use observe::config::{self, Config, Divergence};
use observe::{auto, Auto, Const, Error, State};


fn counter() -> Rc<Cell<usize>> {
	Rc::new(Cell::new(0))
}

fn bump(counter: &Cell<usize>) {
	counter.set(counter.get() + 1);
}

#[test]
fn basic() {
	let s1 = State::new(1);
	let s2 = State::new(2);
	let computes = counter();

	let o = Auto::new({
		let (s1, s2, computes) = (s1.clone(), s2.clone(), computes.clone());
		move || {
			bump(&computes);
			s1.get() + s2.get()
		}
	});

	assert_eq!(computes.get(), 0);
	assert_eq!(o.get_once(), 3);
	assert_eq!(o.get_once(), 3);
	assert_eq!(computes.get(), 1);

	s1.set(2);
	s2.set(3);
	assert_eq!(computes.get(), 1);

	assert_eq!(o.get_once(), 5);
	assert_eq!(o.get_once(), 5);
	assert_eq!(computes.get(), 2);
}

#[test]
fn nested_and_binding() {
	let s1 = State::new(1);
	let s2 = State::new(2);
	let s3 = State::new(3);
	let c = Const::new(10);
	let computes1 = counter();
	let computes2 = counter();

	let o1 = Auto::new({
		let (s1, s2, computes1) = (s1.clone(), s2.clone(), computes1.clone());
		move || {
			bump(&computes1);
			s1.get() + s2.get()
		}
	});

	let o2 = Auto::new({
		let (o1, s3, c, computes2) = (o1.clone(), s3.clone(), c.clone(), computes2.clone());
		move || {
			bump(&computes2);
			o1.get() + s3.get() + c.get()
		}
	});

	assert_eq!(o2.get_once(), 16);
	assert_eq!(o2.get_once(), 16);
	assert_eq!((computes1.get(), computes2.get()), (1, 1));

	s3.set(4);
	assert_eq!(o2.get_once(), 17);
	assert_eq!((computes1.get(), computes2.get()), (1, 2));

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(17)).times(1).return_const(());

	let binding = o2.bind({
		let mock = mock.clone();
		move |v| mock.trigger(v)
	});

	mock.get().checkpoint();
	assert_eq!((computes1.get(), computes2.get()), (1, 2));

	mock.get().expect_trigger().with(predicate::eq(18)).times(1).return_const(());
	s1.set(2);
	mock.get().checkpoint();
	assert_eq!((computes1.get(), computes2.get()), (2, 3));

	binding.dispose();
	mock.get().expect_trigger().times(0).return_const(());
	s1.set(3);
	mock.get().checkpoint();
	assert_eq!((computes1.get(), computes2.get()), (2, 3));

	assert_eq!(o2.get_once(), 19);
	assert_eq!((computes1.get(), computes2.get()), (3, 4));
}

#[test]
fn mutating_leaf_recomputes_only_dependents() {
	let s1 = State::new(1);
	let s2 = State::new(2);
	let s3 = State::new(3);
	let computes1 = counter();
	let computes2 = counter();

	let o1 = Auto::new({
		let (s1, s2, computes1) = (s1.clone(), s2.clone(), computes1.clone());
		move || {
			bump(&computes1);
			s1.get() + s2.get()
		}
	});
	let o2 = Auto::new({
		let (o1, s3, computes2) = (o1.clone(), s3.clone(), computes2.clone());
		move || {
			bump(&computes2);
			o1.get() + s3.get()
		}
	});

	let binding = o2.bind(|_| {});
	s3.set(10);
	assert_eq!(o2.get_once(), 13);
	assert_eq!((computes1.get(), computes2.get()), (1, 2));
	binding.dispose();
}

#[test]
fn chain_recomputes_once_per_change() {
	let a = State::new(1);
	let computes_b = counter();
	let computes_c = counter();

	let b = Auto::new({
		let (a, computes_b) = (a.clone(), computes_b.clone());
		move || {
			bump(&computes_b);
			a.get() * 2
		}
	});
	let c = Auto::new({
		let (b, computes_c) = (b.clone(), computes_c.clone());
		move || {
			bump(&computes_c);
			b.get() + 1
		}
	});

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(3)).times(1).return_const(());
	let binding = c.bind({
		let mock = mock.clone();
		move |v| mock.trigger(v)
	});
	mock.get().checkpoint();

	mock.get().expect_trigger().with(predicate::eq(5)).times(1).return_const(());
	a.set(2);
	mock.get().checkpoint();

	assert_eq!((computes_b.get(), computes_c.get()), (2, 2));
	binding.dispose();
}

#[test]
fn conditional_subscriptions() {
	let sb = State::new(true);
	let s1 = State::new("foo".to_owned());
	let s2 = State::new("bar".to_owned());
	let s3 = State::new("!".to_owned());

	let o = Auto::new({
		let (sb, s1, s2, s3) = (sb.clone(), s1.clone(), s2.clone(), s3.clone());
		move || {
			let head = if sb.get() { s1.get() } else { s2.get() };
			head + &s3.get()
		}
	});

	let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
	let binding = o.bind({
		let seen = seen.clone();
		move |v| seen.borrow_mut().push(v)
	});

	s1.set("baz".to_owned());
	s2.set("qux".to_owned());
	sb.set(false);
	s1.set("thud".to_owned());
	sb.set(true);

	assert_eq!(*seen.borrow(), vec!["foo!", "baz!", "qux!", "thud!"]);
	binding.dispose();
}

#[test]
fn conditional_subscriptions_through_map() {
	let cond = State::new(true);
	let s = State::new(1);
	let mapped = s.map(|v| v * 10);

	let o = Auto::new({
		let (cond, s, mapped) = (cond.clone(), s.clone(), mapped.clone());
		move || if cond.get() { mapped.get() + s.get() } else { s.get() }
	});

	let seen = Rc::new(std::cell::RefCell::new(Vec::new()));
	let binding = o.bind({
		let seen = seen.clone();
		move |v| seen.borrow_mut().push(v)
	});

	s.set(2);
	cond.set(false);
	s.set(5);
	assert_eq!(o.get_once(), 5);

	cond.set(true);
	s.set(3);

	assert_eq!(*seen.borrow(), vec![11, 22, 2, 5, 55, 33]);
	binding.dispose();
}

#[test]
fn no_subscriptions_folds_into_constant() {
	let c = Const::new(41);
	let o = Auto::new(move || c.get() + 1);
	assert_eq!(o.get_once(), 42);
	assert!(!o.can_fire());

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(42)).times(1).return_const(());
	let binding = o.bind({
		let mock = mock.clone();
		move |v| mock.trigger(v)
	});
	mock.get().checkpoint();

	assert!(binding.is_disposed());
	binding.dispose();
}

#[test]
fn no_subscriptions_anymore() {
	let s = State::new(10);
	let track = Rc::new(Cell::new(true));
	let o = Auto::new({
		let (s, track) = (s.clone(), track.clone());
		move || if track.get() { s.get() + 1 } else { 42 }
	});

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(11)).times(1).return_const(());
	let binding = o.bind({
		let mock = mock.clone();
		move |v| mock.trigger(v)
	});
	mock.get().checkpoint();

	track.set(false);
	mock.get().expect_trigger().with(predicate::eq(42)).times(1).return_const(());
	s.update(|v| *v += 1);
	mock.get().checkpoint();
	assert!(binding.is_disposed());
	assert!(!o.can_fire());

	mock.get().expect_trigger().times(0).return_const(());
	s.update(|v| *v += 1);
	mock.get().checkpoint();
}

#[test]
fn settled_back_source_skips_recompute() {
	let s = State::new(10);
	let computes = counter();
	let o = Auto::new({
		let (s, computes) = (s.clone(), computes.clone());
		move || {
			bump(&computes);
			s.get()
		}
	});

	assert_eq!(o.get_once(), 10);
	assert_eq!(computes.get(), 1);

	s.set(15);
	s.set(10);
	assert_eq!(o.get_once(), 10);
	assert_eq!(computes.get(), 1);
}

#[test]
fn same_source_read_twice() {
	let s = State::new(10);
	let o = auto!((s) => s.get() + s.get());
	assert_eq!(o.get_once(), 20);

	s.set(20);
	assert_eq!(o.get_once(), 40);
}

#[test]
fn changes_while_computing() {
	let s1 = State::new(0);
	let s2 = State::new(0);
	let s3 = State::new(0);
	let computes = counter();

	let o = Auto::new({
		let (s1, s2, s3, computes) = (s1.clone(), s2.clone(), s3.clone(), computes.clone());
		move || {
			bump(&computes);
			if s1.get() < 10 {
				s1.update(|v| *v += 1);
			}
			if s2.get() < 10 {
				s2.update(|v| *v += 1);
			}
			s1.get() + s2.get() + s3.get()
		}
	});

	assert_eq!(o.get_once(), 20);
	assert_eq!((s1.get_once(), s2.get_once()), (10, 10));
	assert_eq!(computes.get(), 11);

	computes.set(0);
	s1.set(0);
	s2.set(0);
	s3.set(1);

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(21)).times(1).return_const(());
	let binding = o.bind({
		let mock = mock.clone();
		move |v| mock.trigger(v)
	});
	mock.get().checkpoint();
	assert_eq!(computes.get(), 11);

	mock.get().expect_trigger().with(predicate::eq(23)).times(1).return_const(());
	s3.set(3);
	mock.get().checkpoint();
	assert_eq!(computes.get(), 12);
	binding.dispose();
}

fn runaway() -> (State<i64>, Auto<i64>, Rc<Cell<usize>>) {
	let s = State::new(0i64);
	let computes = counter();
	let o = Auto::new({
		let (s, computes) = (s.clone(), computes.clone());
		move || {
			bump(&computes);
			let v = s.get();
			s.set(v + 1);
			v
		}
	});

	(s, o, computes)
}

#[test]
fn divergence_is_reported() {
	let (_, o, computes) = runaway();
	assert_eq!(o.try_get_once(), Err(Error::Diverged { iterations: 100 }));
	assert_eq!(computes.get(), 100);
}

#[test]
#[should_panic(expected = "did not settle")]
fn divergence_panics_by_default() {
	let (_, o, _) = runaway();
	o.get_once();
}

#[test]
fn divergence_can_warn() {
	let _ = tracing_subscriber::fmt().with_test_writer().try_init();
	let previous = config::set(Config {
		max_iterations: 5,
		divergence: Divergence::Warn,
	});

	let (s, o, computes) = runaway();
	assert_eq!(o.get_once(), 4);
	assert_eq!(computes.get(), 5);
	assert_eq!(s.get_once(), 5);

	config::set(previous);
}

#[test]
fn auto_run() {
	let s1 = State::new(1);
	let s2 = State::new(2);

	let mock = mock::SharedMock::new();
	mock.get().expect_trigger().with(predicate::eq(3)).times(1).return_const(());

	let binding = observe::auto_run({
		let (s1, s2, mock) = (s1.clone(), s2.clone(), mock.clone());
		move || {
			let sum = s1.get() + s2.get();
			mock.trigger(sum);
		}
	});
	mock.get().checkpoint();

	mock.get().expect_trigger().with(predicate::eq(5)).times(1).return_const(());
	s1.set(3);
	mock.get().checkpoint();

	mock.get().expect_trigger().with(predicate::eq(6)).times(1).return_const(());
	s2.set(3);
	mock.get().checkpoint();

	binding.dispose();
	mock.get().expect_trigger().times(0).return_const(());
	s1.set(100);
	s2.set(500);
	mock.get().checkpoint();
}

#[test]
fn map_const() {
	let c = Const::new(10);
	let computes = counter();
	let o = Auto::new({
		let computes = computes.clone();
		move || {
			bump(&computes);
			c.get() * 2
		}
	});

	assert_eq!(o.get_once(), 20);
	assert_eq!(computes.get(), 1);

	let transforms = counter();
	let m = o.map({
		let transforms = transforms.clone();
		move |v| {
			bump(&transforms);
			(v * 2).to_string()
		}
	});

	assert_eq!(transforms.get(), 0);
	assert_eq!(m.get_once(), "40");
	assert_eq!(m.get_once(), "40");
	assert_eq!((computes.get(), transforms.get()), (1, 1));
	assert!(!m.can_fire());
}

#[test]
fn map_non_const() {
	let s = State::new(10);
	let computes = counter();
	let o = Auto::new({
		let (s, computes) = (s.clone(), computes.clone());
		move || {
			bump(&computes);
			s.get() * 2
		}
	});

	let transforms = counter();
	let m = o.map({
		let transforms = transforms.clone();
		move |v| {
			bump(&transforms);
			(v * 2).to_string()
		}
	});

	assert_eq!((computes.get(), transforms.get()), (0, 0));
	assert_eq!(m.get_once(), "40");
	assert_eq!(m.get_once(), "40");
	assert_eq!((computes.get(), transforms.get()), (1, 1));

	s.set(20);
	assert_eq!(m.get_once(), "80");
	assert_eq!((computes.get(), transforms.get()), (2, 2));
}

#[test]
fn revision_follows_pulled_sources() {
	let s = State::new(1);
	let o = auto!((s) => s.get() * 10);

	let first = o.revision();
	assert_eq!(o.revision(), first);

	s.set(2);
	let second = o.revision();
	assert!(second > first);
	assert_eq!(o.get_once(), 20);
	assert_eq!(o.revision(), second);
}
