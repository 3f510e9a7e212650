mod engine;
mod instance;
mod pod;
mod secret;
mod target;

pub use engine::*;
pub use instance::*;
pub use pod::*;
pub use secret::*;
pub use target::*;
