//! Configuration management for the database access tooling.
//!
//! Provides environment detection, layered configuration loading from optional
//! YAML files and environment variables, and the shared configuration types
//! consumed by the cluster client, the primary probes and the session runner.

mod environment;
mod load;
pub mod shared;

pub use environment::*;
pub use load::*;
