//! Quadrature decoding for the rotary encoder
//!
//! Both encoder pins are sampled on every edge. A detent is reported when the
//! pins return to the rest state `00`, in the direction of that last step.

use crate::system::events::InputEvent;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Right,
    Left,
}

#[derive(Debug, Default)]
pub struct QuadratureDecoder {
    state: u8,
}

impl QuadratureDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn step(from: u8, to: u8) -> Option<Step> {
        match (from, to) {
            (0b00, 0b01) | (0b01, 0b11) | (0b10, 0b00) => Some(Step::Right),
            (0b00, 0b10) | (0b01, 0b00) | (0b10, 0b11) => Some(Step::Left),
            _ => None,
        }
    }

    /// Feed the current level of the clock and data pins.
    pub fn update(&mut self, clk: bool, data: bool) -> Option<InputEvent> {
        let new_state = (u8::from(clk) << 1) | u8::from(data);
        let step = Self::step(self.state, new_state);
        trace!("Encoder {:02b} -> {:02b}: {:?}", self.state, new_state, step);
        self.state = new_state;

        match step {
            Some(step) if new_state == 0b00 => Some(InputEvent::Rotate {
                clockwise: step == Step::Left,
            }),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(decoder: &mut QuadratureDecoder, levels: &[(bool, bool)]) -> Vec<InputEvent> {
        levels
            .iter()
            .filter_map(|&(clk, data)| decoder.update(clk, data))
            .collect()
    }

    #[test]
    fn test_clockwise_detent() {
        let mut decoder = QuadratureDecoder::new();
        // 00 -> 10 -> 11 -> 01 -> 00
        let events = run(
            &mut decoder,
            &[(true, false), (true, true), (false, true), (false, false)],
        );
        assert_eq!(events, vec![InputEvent::Rotate { clockwise: true }]);
    }

    #[test]
    fn test_counter_clockwise_detent() {
        let mut decoder = QuadratureDecoder::new();
        // 00 -> 01 -> 11 -> 10 -> 00
        let events = run(
            &mut decoder,
            &[(false, true), (true, true), (true, false), (false, false)],
        );
        assert_eq!(events, vec![InputEvent::Rotate { clockwise: false }]);
    }

    #[test]
    fn test_bounce_without_detent_is_silent() {
        let mut decoder = QuadratureDecoder::new();
        let events = run(&mut decoder, &[(true, false), (true, false), (true, true)]);
        assert!(events.is_empty());
    }
}
