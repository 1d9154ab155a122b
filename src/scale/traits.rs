//! Weight source abstraction
//!
//! The load cell driver, the simulator and scripted test sources all feed the
//! sampler through this trait.

use anyhow::Result;

/// A raw reader of weight in grams, already tared and calibrated.
pub trait WeightSource: Send {
    fn name(&self) -> &str;

    /// One blocking read. Errors are transient; the sampler logs and retries.
    fn read_grams(&mut self) -> Result<f32>;
}

impl<T: WeightSource + ?Sized> WeightSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_grams(&mut self) -> Result<f32> {
        (**self).read_grams()
    }
}
