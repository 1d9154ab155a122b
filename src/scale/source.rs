//! In-process weight sources used by the host simulator and the tests

use super::traits::WeightSource;
use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Conversion time of the load cell ADC at 80 samples per second.
pub const SIMULATED_READ_INTERVAL: Duration = Duration::from_millis(12);

/// Scale whose weight is set from outside, e.g. by console commands.
/// Reads block for one conversion like the real ADC.
#[derive(Clone)]
pub struct SimulatedScale {
    weight_g: Arc<Mutex<f32>>,
    reads: Arc<AtomicU64>,
    read_interval: Duration,
}

impl SimulatedScale {
    pub fn new(initial_g: f32) -> Self {
        Self {
            weight_g: Arc::new(Mutex::new(initial_g)),
            reads: Arc::new(AtomicU64::new(0)),
            read_interval: SIMULATED_READ_INTERVAL,
        }
    }

    /// Raw reads served so far, across every clone.
    pub fn read_count(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn set_weight(&self, weight_g: f32) {
        match self.weight_g.lock() {
            Ok(mut w) => *w = weight_g,
            Err(poisoned) => *poisoned.into_inner() = weight_g,
        }
    }

    pub fn weight(&self) -> f32 {
        match self.weight_g.lock() {
            Ok(w) => *w,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

impl WeightSource for SimulatedScale {
    fn name(&self) -> &str {
        "simulated"
    }

    fn read_grams(&mut self) -> Result<f32> {
        thread::sleep(self.read_interval);
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(self.weight())
    }
}

/// Replays a fixed list of readings, then fails.
pub struct ScriptedScale {
    readings: VecDeque<f32>,
}

impl ScriptedScale {
    pub fn new(readings: impl IntoIterator<Item = f32>) -> Self {
        Self {
            readings: readings.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

impl WeightSource for ScriptedScale {
    fn name(&self) -> &str {
        "scripted"
    }

    fn read_grams(&mut self) -> Result<f32> {
        self.readings
            .pop_front()
            .ok_or_else(|| anyhow!("scripted readings exhausted"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_scale_shares_weight() {
        let scale = SimulatedScale::new(0.0);
        let mut reader = scale.clone();
        scale.set_weight(1234.5);
        assert_eq!(reader.read_grams().unwrap(), 1234.5);
        assert_eq!(scale.read_count(), 1);
    }

    #[test]
    fn test_scripted_scale_runs_out() {
        let mut scale = ScriptedScale::new([1.0, 2.0]);
        assert_eq!(scale.read_grams().unwrap(), 1.0);
        assert_eq!(scale.read_grams().unwrap(), 2.0);
        assert!(scale.read_grams().is_err());
    }
}
