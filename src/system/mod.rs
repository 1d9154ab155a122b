pub mod clock;
pub mod config;
pub mod events;
pub mod host;

pub use clock::*;
pub use config::*;
pub use events::*;
pub use host::*;
