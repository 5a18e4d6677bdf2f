//! Thread-local engine settings.

use std::cell::Cell;

/// What happens when an auto-observable keeps invalidating itself while
/// computing.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Default)]
pub enum Divergence {
	/// Panic in the reader that triggered the computation.
	#[default]
	Panic,
	/// Log a warning and hand out the last computed value.
	Warn,
}

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Config {
	/// Recomputation attempts before a read is considered divergent.
	pub max_iterations: usize,
	pub divergence: Divergence,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			max_iterations: 100,
			divergence: Divergence::Panic,
		}
	}
}

thread_local! {
	static CONFIG: Cell<Config> = Cell::new(Config::default());
}

pub fn get() -> Config {
	CONFIG.with(|c| c.get())
}

/// Replace the settings of the current thread, returning the previous ones.
pub fn set(config: Config) -> Config {
	CONFIG.with(|c| c.replace(config))
}
