//! Protocol-level primary checks issued through a tunnel.

mod base;
mod group_replication;
mod mongo;

pub use self::base::*;
pub use self::group_replication::*;
pub use self::mongo::*;
