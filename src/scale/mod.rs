pub mod pipeline;
pub mod sampler;
pub mod source;
pub mod stabilizer;
pub mod traits;

pub use pipeline::{Acknowledger, ScalePipeline, ScaleReadings};
pub use source::{ScriptedScale, SimulatedScale};
pub use stabilizer::Stabilizer;
pub use traits::WeightSource;
