//! hostinv-exec: probe execution
//!
//! Runs one OS-native inventory tool per call as a child process with a fixed
//! argument vector and a wall-clock bound, and classifies what happened as a
//! [`ProbeOutcome`]. Nothing in this crate returns an error past `run`.

pub mod error;
pub mod invocation;
pub mod local;
pub mod observer;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use invocation::Invocation;
pub use local::LocalRunner;
pub use observer::ProbeObserver;
pub use result::{CommandResult, ProbeOutcome, RawOutput};
pub use traits::ProbeRunner;
