//! Run loop: the iterative request / merge / dispatch protocol.

pub mod limits;
pub mod runner;
pub mod types;

pub use limits::RunLimits;
pub use runner::RunLoop;
pub use types::{RunFailure, RunResult, RunState, RunStatus};
