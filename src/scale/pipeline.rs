//! Sampler and classifier threads feeding pour events to the supervisory loop
//!
//! The sampler thread smooths raw reads into samples and hands them over a
//! bounded queue. The classifier thread runs the [`Stabilizer`] on each sample
//! and publishes events on the [`PourChannel`]. After a pot removal or
//! replacement it waits for the UI to acknowledge before classifying more
//! samples, so the page switch happens before the next mug evaluation.

use super::sampler::Sampler;
use super::stabilizer::Stabilizer;
use super::traits::WeightSource;
use crate::system::config::ScaleConfig;
use crate::system::events::PourChannel;
use crate::types::{PourEvent, WeightSample};
use anyhow::{bail, Context, Result};
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

const SAMPLE_QUEUE_DEPTH: usize = 4;
const IDLE_POLL: Duration = Duration::from_millis(100);
const READ_RETRY_DELAY: Duration = Duration::from_millis(500);

/// Snapshot of the engine state for diagnostics and the UI.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScaleReadings {
    pub sample: Option<WeightSample>,
    pub has_pot: bool,
    pub stable_value: f32,
    pub last_mug_value: f32,
}

/// Handle given to the consumer of threshold events.
#[derive(Clone)]
pub struct Acknowledger {
    tx: SyncSender<()>,
}

impl Acknowledger {
    pub fn ack(&self) {
        // A full slot already holds an ack
        let _ = self.tx.try_send(());
    }
}

pub struct ScalePipeline {
    config: ScaleConfig,
    pours: Arc<PourChannel>,
    running: Arc<AtomicBool>,
    readings: Arc<Mutex<ScaleReadings>>,
    ack_tx: SyncSender<()>,
    ack_rx: Option<Receiver<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl ScalePipeline {
    pub fn new(config: ScaleConfig, pours: Arc<PourChannel>) -> Self {
        let (ack_tx, ack_rx) = mpsc::sync_channel(1);
        Self {
            config,
            pours,
            running: Arc::new(AtomicBool::new(false)),
            readings: Arc::new(Mutex::new(ScaleReadings {
                has_pot: true,
                ..ScaleReadings::default()
            })),
            ack_tx,
            ack_rx: Some(ack_rx),
            workers: Vec::new(),
        }
    }

    pub fn acknowledger(&self) -> Acknowledger {
        Acknowledger {
            tx: self.ack_tx.clone(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn latest_readings(&self) -> ScaleReadings {
        match self.readings.lock() {
            Ok(r) => *r,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Spawn the sampler and classifier threads. A pipeline runs once.
    pub fn start<S: WeightSource + 'static>(&mut self, source: S) -> Result<()> {
        let Some(ack_rx) = self.ack_rx.take() else {
            bail!("scale pipeline already started");
        };
        self.running.store(true, Ordering::Relaxed);

        let (sample_tx, sample_rx) = mpsc::sync_channel(SAMPLE_QUEUE_DEPTH);
        let sampler = Sampler::new(source, self.config.smoothing, self.config.smoothing_window);
        let interval = Duration::from_millis(self.config.sample_interval_ms);
        let running = self.running.clone();
        let sampler_handle = thread::Builder::new()
            .name("scale-sampler".into())
            .spawn(move || sampler_loop(sampler, sample_tx, interval, running))
            .context("failed to spawn sampler thread")?;
        self.workers.push(sampler_handle);

        let classifier = Classifier {
            stabilizer: Stabilizer::new(self.config.clone()),
            pours: self.pours.clone(),
            readings: self.readings.clone(),
            ack_rx,
            ack_timeout: Duration::from_millis(self.config.ack_timeout_ms),
        };
        let running = self.running.clone();
        let classifier_handle = thread::Builder::new()
            .name("scale-classifier".into())
            .spawn(move || classifier.run(sample_rx, running))
            .context("failed to spawn classifier thread")?;
        self.workers.push(classifier_handle);

        info!("Scale pipeline started");
        Ok(())
    }

    /// Stop both threads and wait for them.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Relaxed);
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                warn!("Scale worker panicked");
            }
        }
        info!("Scale pipeline stopped");
    }
}

impl Drop for ScalePipeline {
    fn drop(&mut self) {
        if !self.workers.is_empty() {
            self.stop();
        }
    }
}

fn sampler_loop<S: WeightSource>(
    mut sampler: Sampler<S>,
    tx: SyncSender<WeightSample>,
    interval: Duration,
    running: Arc<AtomicBool>,
) {
    info!("Sampling from {} scale", sampler.source_name());
    while running.load(Ordering::Relaxed) {
        match sampler.next_sample() {
            Ok(sample) => {
                if tx.send(sample).is_err() {
                    break;
                }
            }
            Err(e) => {
                warn!("Weight sample failed: {:#}", e);
                thread::sleep(READ_RETRY_DELAY);
                continue;
            }
        }
        if !interval.is_zero() {
            thread::sleep(interval);
        }
    }
    debug!("Sampler thread exiting");
}

struct Classifier {
    stabilizer: Stabilizer,
    pours: Arc<PourChannel>,
    readings: Arc<Mutex<ScaleReadings>>,
    ack_rx: Receiver<()>,
    ack_timeout: Duration,
}

impl Classifier {
    fn run(mut self, rx: Receiver<WeightSample>, running: Arc<AtomicBool>) {
        while running.load(Ordering::Relaxed) {
            let sample = match rx.recv_timeout(IDLE_POLL) {
                Ok(sample) => sample,
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            };

            let event = self.stabilizer.process(sample.weight_g);
            self.publish_readings(sample);

            if let Some(event) = event {
                self.publish(event);
            }
        }
        debug!("Classifier thread exiting");
    }

    fn publish_readings(&self, sample: WeightSample) {
        let snapshot = ScaleReadings {
            sample: Some(sample),
            has_pot: self.stabilizer.has_pot(),
            stable_value: self.stabilizer.stable_value(),
            last_mug_value: self.stabilizer.last_mug_value(),
        };
        match self.readings.lock() {
            Ok(mut r) => *r = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    fn publish(&self, event: PourEvent) {
        if event.needs_ack() {
            // Stale acks from an earlier timed-out wait
            while self.ack_rx.try_recv().is_ok() {}
        }

        embassy_futures::block_on(self.pours.send(event));
        debug!("Published {:?}", event);

        if event.needs_ack() {
            match self.ack_rx.recv_timeout(self.ack_timeout) {
                Ok(()) => debug!("{:?} acknowledged", event),
                Err(RecvTimeoutError::Timeout) => {
                    warn!("No acknowledgement for {:?}, resuming", event)
                }
                Err(RecvTimeoutError::Disconnected) => {}
            }
        }
    }
}
