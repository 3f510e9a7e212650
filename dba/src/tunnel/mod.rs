//! Local-to-pod network forwards.
//!
//! A tunnel is a scoped resource: open it immediately before use and close it
//! on every exit path. [`Tunnel::close`] consumes the tunnel, so it can be
//! called at most once and the tunnel cannot be used afterwards.

mod base;
mod kubernetes;

pub use self::base::*;
pub use self::kubernetes::*;
