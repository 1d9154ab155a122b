pub mod buttons;
pub mod encoder;

pub use buttons::{decode_interrupt_flags, PersonButtons};
pub use encoder::QuadratureDecoder;
