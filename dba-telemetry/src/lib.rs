//! Logging setup for the database access tooling.
//!
//! Wraps `tracing-subscriber` so the binary and the tests share one way of
//! emitting structured logs.

mod logging;

pub use logging::*;
