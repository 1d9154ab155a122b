use embassy_time::Instant;
use serde::{Deserialize, Serialize};

/// Index of a person button on the matrix (0-based).
pub type ButtonId = u8;

/// Number of person buttons wired to the I/O expander (two 8-bit ports).
pub const BUTTON_COUNT: usize = 16;

/// Upper bound for the stabilization window; the configured window must fit.
pub const MAX_SETTLE_WINDOW: usize = 16;

/// Longest name that still leaves room for the alphabet cursor on a 16 column row.
pub const NAME_MAX_LEN: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightSample {
    pub weight_g: f32,
    pub taken_at: Instant,
}

impl WeightSample {
    pub fn new(weight_g: f32, taken_at: Instant) -> Self {
        Self { weight_g, taken_at }
    }
}

/// Events inferred from the weight signal of the pot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PourEvent {
    PotRemoved,
    PotReplaced,
    MugPoured { weight_g: f32 },
}

impl PourEvent {
    /// Threshold crossings need the UI to catch up before more samples are classified.
    pub fn needs_ack(&self) -> bool {
        matches!(self, PourEvent::PotRemoved | PourEvent::PotReplaced)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmoothingMethod {
    Median,
    Mean,
}

/// Aggregate consumption over every recorded mug.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub count: u64,
    pub volume_ml: f64,
}

pub const DEFAULT_CHANGE_THRESHOLD_G: f32 = 200.0;
pub const DEFAULT_SETTLE_THRESHOLD_G: f32 = 10.0;
pub const DEFAULT_MIN_MUG_G: f32 = 15.0;
pub const DEFAULT_MAX_MUG_G: f32 = 500.0;
pub const DEFAULT_SETTLE_WINDOW: usize = 3;

pub const DEFAULT_TIMEOUT_MS: u64 = 15_000;
pub const MUG_PAGE_TIMEOUT_MS: u64 = 5_000;
pub const INFO_PAGE_TIMEOUT_MS: u64 = 10_000;
pub const LOOKBEHIND_MS: u64 = 15_000;
pub const BUTTON_DEBOUNCE_MS: u64 = 200;

/// 5x8 bitmap of the "enter" arrow stored in CGRAM slot 0.
pub const ENTER_GLYPH: [u8; 8] = [0x10, 0x10, 0x10, 0x14, 0x12, 0x1F, 0x02, 0x04];
pub const ENTER_GLYPH_SLOT: u8 = 0;
