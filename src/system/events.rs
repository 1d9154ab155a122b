//! Event hierarchy and the channels that carry it to the supervisory loop

use crate::types::{ButtonId, PourEvent};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use log::warn;

/// Top-level event routed to the page state machine
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SystemEvent {
    Input(InputEvent),
    Scale(PourEvent),
}

/// Discrete user input from the encoder, the red button and the person matrix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Rotate { clockwise: bool },
    Confirm,
    Cancel,
    PersonPressed(ButtonId),
    /// Leave the supervisory loop (signal or console quit).
    Quit,
}

impl InputEvent {
    pub fn name(&self) -> &'static str {
        match self {
            InputEvent::Rotate { .. } => "rotate",
            InputEvent::Confirm => "encoder button",
            InputEvent::Cancel => "red button",
            InputEvent::PersonPressed(_) => "person button",
            InputEvent::Quit => "quit",
        }
    }
}

pub type InputChannel = Channel<CriticalSectionRawMutex, InputEvent, 16>;
pub type PourChannel = Channel<CriticalSectionRawMutex, PourEvent, 8>;

/// Push an input from a driver callback without blocking the callback thread.
pub fn publish_input(channel: &InputChannel, event: InputEvent) -> bool {
    match channel.try_send(event) {
        Ok(()) => true,
        Err(_) => {
            warn!("Input queue full, dropping {:?}", event);
            false
        }
    }
}
