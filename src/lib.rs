pub mod controller;
pub mod input;
pub mod scale;
pub mod storage;
pub mod system;
pub mod types;
pub mod ui;

pub use types::*;
pub use controller::*;
