use thiserror::Error;

#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum Error {
	#[error("auto-observable did not settle after {iterations} recomputations")]
	Diverged { iterations: usize },
}
