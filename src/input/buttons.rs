//! Person button matrix behind the I/O expander
//!
//! Sixteen buttons sit on two 8-bit ports. On an interrupt the flag registers
//! tell which pin fired; the lowest set bit wins, port A before port B.

use crate::system::events::{publish_input, InputChannel, InputEvent};
use crate::types::{ButtonId, BUTTON_COUNT, BUTTON_DEBOUNCE_MS};
use embassy_time::{Duration, Instant};
use log::{debug, info};

/// Button id from the interrupt flag registers of both ports.
pub fn decode_interrupt_flags(flags_a: u8, flags_b: u8) -> Option<ButtonId> {
    let flags = u16::from(flags_a) | (u16::from(flags_b) << 8);
    if flags == 0 {
        return None;
    }
    Some(flags.trailing_zeros() as ButtonId)
}

/// Per-button debounce: repeats within the window are dropped.
pub struct PersonButtons {
    last_press: [Option<Instant>; BUTTON_COUNT],
    debounce: Duration,
}

impl Default for PersonButtons {
    fn default() -> Self {
        Self::new(Duration::from_millis(BUTTON_DEBOUNCE_MS))
    }
}

impl PersonButtons {
    pub fn new(debounce: Duration) -> Self {
        Self {
            last_press: [None; BUTTON_COUNT],
            debounce,
        }
    }

    /// Resolve an interrupt into a debounced person press.
    pub fn on_interrupt(&mut self, flags_a: u8, flags_b: u8, now: Instant) -> Option<ButtonId> {
        let Some(button_id) = decode_interrupt_flags(flags_a, flags_b) else {
            debug!("Interrupt without a flagged button");
            return None;
        };
        let slot = &mut self.last_press[usize::from(button_id)];
        if let Some(last) = *slot {
            if now.saturating_duration_since(last) < self.debounce {
                debug!("Button {} bounced", button_id);
                return None;
            }
        }
        *slot = Some(now);
        info!("Pressed: {}", button_id);
        Some(button_id)
    }

    /// Like `on_interrupt`, publishing the press on the input channel.
    pub fn dispatch(&mut self, flags_a: u8, flags_b: u8, now: Instant, channel: &InputChannel) {
        if let Some(button_id) = self.on_interrupt(flags_a, flags_b, now) {
            publish_input(channel, InputEvent::PersonPressed(button_id));
        }
    }
}
