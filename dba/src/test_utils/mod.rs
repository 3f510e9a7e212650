//! In-memory fakes for exercising resolution and sessions without a cluster.
//!
//! Every fake records the calls it receives so tests can assert on ordering,
//! such as a probe tunnel being closed before the next one is opened.
pub mod directory;
pub mod fixtures;
pub mod probe;
pub mod session;
pub mod tunnel;
