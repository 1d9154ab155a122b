//! Pot-on-scale state machine turning noisy weight samples into pour events
//! States: PotOn, PotOff
//!
//! A coarse threshold on the sample-to-sample delta detects the pot being
//! lifted or put back. While the pot is on the scale, a dispersion check over
//! the sample window decides when the reading has settled; the first settled
//! reading after the pot comes back yields the weight of the mug just poured.

use crate::system::config::ScaleConfig;
use crate::types::{PourEvent, MAX_SETTLE_WINDOW};
use heapless::Vec;
use log::{debug, info};
use statig::prelude::*;

// Input to the state machine, one per published sample
#[derive(Debug, Clone, Copy)]
pub struct ScaleInput {
    pub weight_g: f32,
    /// Difference with the previous reading of the window (0 when it was empty).
    pub delta_g: f32,
}

#[derive(Debug)]
pub struct StabilizerContext {
    config: ScaleConfig,
    readings: Vec<f32, MAX_SETTLE_WINDOW>,
    pending_mug_update: bool,
    stable_value: f32,
    last_mug_value: f32,
    output: Option<PourEvent>,
}

impl StabilizerContext {
    fn new(config: ScaleConfig) -> Self {
        Self {
            config,
            readings: Vec::new(),
            pending_mug_update: false,
            stable_value: 0.0,
            last_mug_value: 0.0,
            output: None,
        }
    }

    fn window(&self) -> usize {
        self.config.window.clamp(2, MAX_SETTLE_WINDOW)
    }

    /// Append a reading, dropping the oldest one when the window is full.
    /// Returns the delta with the reading it follows.
    fn push_reading(&mut self, weight_g: f32) -> f32 {
        let previous = self.readings.last().copied().unwrap_or(0.0);
        if self.readings.len() >= self.window() {
            self.readings.remove(0);
        }
        let _ = self.readings.push(weight_g);
        weight_g - previous
    }
}

#[derive(Debug, Default)]
pub struct PotStateMachine;

#[state_machine(
    initial = "State::pot_on()",
    state(derive(Debug)),
    on_transition = "Self::on_transition"
)]
impl PotStateMachine {
    /// Pot sits on the scale: watch for removal, otherwise track the settled weight
    #[state]
    fn pot_on(context: &mut StabilizerContext, event: &ScaleInput) -> Response<State> {
        use Response::*;

        if event.delta_g <= -context.config.change_threshold_g {
            info!("Pot is removed - Delta: {:.1}", event.delta_g);
            context.output = Some(PourEvent::PotRemoved);
            return Transition(State::pot_off());
        }

        Self::update_stable_value(context);
        Handled
    }

    /// Pot lifted off the scale: settle tracking is suspended until it comes back
    #[state]
    fn pot_off(context: &mut StabilizerContext, event: &ScaleInput) -> Response<State> {
        use Response::*;

        if event.delta_g >= context.config.change_threshold_g {
            info!("Pot is back - Delta: {:.1}", event.delta_g);
            context.pending_mug_update = true;
            context.output = Some(PourEvent::PotReplaced);
            return Transition(State::pot_on());
        }

        Handled
    }
}

impl PotStateMachine {
    fn on_transition(&mut self, source: &State, target: &State) {
        debug!("Pot state transition: {:?} -> {:?}", source, target);
    }

    fn update_stable_value(context: &mut StabilizerContext) {
        let Some((mean, std_dev)) = window_stats(&context.readings) else {
            return;
        };
        // A NaN read keeps the window unsettled until it leaves the buffer
        if std_dev.is_nan() || std_dev > context.config.settle_threshold_g {
            return;
        }

        if context.pending_mug_update {
            context.pending_mug_update = false;
            let mug_weight = context.stable_value - mean;
            if mug_weight >= context.config.min_mug_g && mug_weight <= context.config.max_mug_g {
                info!("Mug {:.1}g", mug_weight);
                context.last_mug_value = mug_weight;
                context.output = Some(PourEvent::MugPoured {
                    weight_g: mug_weight,
                });
            } else {
                debug!(
                    "Discarding implausible mug weight {:.1}g (admissible {:.0}..{:.0})",
                    mug_weight, context.config.min_mug_g, context.config.max_mug_g
                );
            }
        }

        context.stable_value = mean;
    }
}

/// Mean and sample standard deviation, `None` below two readings.
pub fn window_stats(readings: &[f32]) -> Option<(f32, f32)> {
    if readings.len() < 2 {
        return None;
    }
    let n = readings.len() as f32;
    let mean = readings.iter().sum::<f32>() / n;
    let variance = readings.iter().map(|&x| (x - mean).powi(2)).sum::<f32>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

/// Stabilization engine: one instance per scale
pub struct Stabilizer {
    machine: statig::prelude::StateMachine<PotStateMachine>,
    context: StabilizerContext,
}

impl Stabilizer {
    pub fn new(config: ScaleConfig) -> Self {
        Self {
            machine: PotStateMachine::default().state_machine(),
            context: StabilizerContext::new(config),
        }
    }

    /// Classify one sample. At most one event comes out per call and a
    /// threshold crossing wins over mug evaluation.
    pub fn process(&mut self, weight_g: f32) -> Option<PourEvent> {
        self.context.output = None;
        let delta_g = self.context.push_reading(weight_g);
        let input = ScaleInput { weight_g, delta_g };
        debug!("Sample {:.1}g, delta {:.1}g", weight_g, delta_g);
        self.machine.handle_with_context(&input, &mut self.context);
        self.context.output.take()
    }

    pub fn has_pot(&self) -> bool {
        matches!(self.machine.state(), State::PotOn {})
    }

    pub fn stable_value(&self) -> f32 {
        self.context.stable_value
    }

    pub fn last_mug_value(&self) -> f32 {
        self.context.last_mug_value
    }

    pub fn pending_mug_update(&self) -> bool {
        self.context.pending_mug_update
    }

    pub fn readings(&self) -> &[f32] {
        &self.context.readings
    }

    pub fn config(&self) -> &ScaleConfig {
        &self.context.config
    }
}
