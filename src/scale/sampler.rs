//! Folds bursts of raw reads into one smoothed weight sample

use super::traits::WeightSource;
use crate::types::{SmoothingMethod, WeightSample};
use anyhow::{Context, Result};
use embassy_time::Instant;

/// Reduce a burst of reads to a single value. `None` for an empty burst.
pub fn smooth(method: SmoothingMethod, reads: &mut [f32]) -> Option<f32> {
    if reads.is_empty() {
        return None;
    }
    let value = match method {
        SmoothingMethod::Mean => reads.iter().sum::<f32>() / reads.len() as f32,
        SmoothingMethod::Median => {
            reads.sort_by(|a, b| a.total_cmp(b));
            let mid = reads.len() / 2;
            if reads.len() % 2 == 0 {
                (reads[mid - 1] + reads[mid]) / 2.0
            } else {
                reads[mid]
            }
        }
    };
    Some(value)
}

pub struct Sampler<S: WeightSource> {
    source: S,
    method: SmoothingMethod,
    burst: usize,
    reads: Vec<f32>,
}

impl<S: WeightSource> Sampler<S> {
    pub fn new(source: S, method: SmoothingMethod, burst: usize) -> Self {
        let burst = burst.max(1);
        Self {
            source,
            method,
            burst,
            reads: Vec::with_capacity(burst),
        }
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Read a full burst and smooth it. A failed read fails the whole sample.
    pub fn next_sample(&mut self) -> Result<WeightSample> {
        self.reads.clear();
        for _ in 0..self.burst {
            let grams = self
                .source
                .read_grams()
                .with_context(|| format!("read from {} scale failed", self.source.name()))?;
            self.reads.push(grams);
        }
        let weight_g = smooth(self.method, &mut self.reads).context("empty read burst")?;
        Ok(WeightSample::new(weight_g, Instant::now()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::source::ScriptedScale;

    #[test]
    fn test_median_rejects_spike() {
        let mut reads = [1000.0, 4000.0, 1002.0];
        assert_eq!(smooth(SmoothingMethod::Median, &mut reads), Some(1002.0));
    }

    #[test]
    fn test_median_of_even_burst() {
        let mut reads = [4.0, 1.0, 3.0, 2.0];
        assert_eq!(smooth(SmoothingMethod::Median, &mut reads), Some(2.5));
    }

    #[test]
    fn test_mean() {
        let mut reads = [10.0, 20.0, 30.0];
        assert_eq!(smooth(SmoothingMethod::Mean, &mut reads), Some(20.0));
        assert_eq!(smooth(SmoothingMethod::Mean, &mut []), None);
    }

    #[test]
    fn test_sampler_consumes_bursts() {
        let source = ScriptedScale::new([5.0, 500.0, 6.0, 7.0, 8.0, 9.0]);
        let mut sampler = Sampler::new(source, SmoothingMethod::Median, 3);
        assert_eq!(sampler.next_sample().unwrap().weight_g, 6.0);
        assert_eq!(sampler.next_sample().unwrap().weight_g, 8.0);
        assert!(sampler.next_sample().is_err());
    }
}
