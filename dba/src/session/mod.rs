//! External client sessions against a resolved target.
//!
//! The resolver never spawns processes. Sessions are driven through a
//! [`SessionRunner`], which builds the engine's client invocation from a
//! [`ClientSpec`] and runs it against the local end of a tunnel.

mod base;
mod client;
mod process;

pub use self::base::*;
pub use self::client::*;
pub use self::process::*;
