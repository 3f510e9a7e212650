mod base;
mod cluster;
mod dba;
mod probe;
mod session;

pub use base::*;
pub use cluster::*;
pub use dba::*;
pub use probe::*;
pub use session::*;
