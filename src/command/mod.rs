//! # The command being retried.
//!
//! - [`CommandSpec`] - program name and arguments, plus executable lookup
//! - [`ProcessRunner`] - runs one attempt with output capture and cancellation
//! - [`AttemptResult`] - outcome of one attempt

mod outcome;
mod runner;
mod spec;
mod usage;

pub use outcome::AttemptResult;
pub use runner::ProcessRunner;
pub use spec::CommandSpec;
