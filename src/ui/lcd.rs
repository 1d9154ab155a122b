//! LCD front-end: screen drawing plus scroll and blink animations
//!
//! Animations run on a worker thread that owns nothing but a handle to the
//! device. Every drawing call first stops the running animation and joins its
//! worker, so two writers never touch the device at the same time.

use super::display::{CharDisplay, DisplayError};
use crate::system::config::UiConfig;
use crate::types::{ENTER_GLYPH, ENTER_GLYPH_SLOT};
use log::{debug, error, info};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Content of one row.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Empty,
    Static(String),
    /// Scrolled once when longer than the row, written as is otherwise.
    Scroll(String),
}

/// What a page wants on the display.
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    Lines { top: Line, bottom: Line },
    /// Text on the first row with a blinking backlight, until the next draw.
    Blink(String),
}

impl Screen {
    pub fn text(top: impl Into<String>) -> Self {
        Screen::Lines {
            top: Line::Static(top.into()),
            bottom: Line::Empty,
        }
    }

    pub fn two_lines(top: impl Into<String>, bottom: impl Into<String>) -> Self {
        Screen::Lines {
            top: Line::Static(top.into()),
            bottom: Line::Static(bottom.into()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct AnimationTiming {
    pub scroll_interval: Duration,
    pub blink_interval: Duration,
}

impl From<&UiConfig> for AnimationTiming {
    fn from(config: &UiConfig) -> Self {
        Self {
            scroll_interval: Duration::from_millis(config.scroll_interval_ms),
            blink_interval: Duration::from_millis(config.blink_interval_ms),
        }
    }
}

struct Animation {
    stop: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl Animation {
    fn cancel(self) {
        self.stop.store(true, Ordering::Relaxed);
        self.handle.thread().unpark();
        if self.handle.join().is_err() {
            error!("Display animation worker panicked");
        }
    }
}

/// Sleep for `interval` unless stopped first. Returns true when stopped.
fn pause(stop: &AtomicBool, interval: Duration) -> bool {
    let deadline = Instant::now() + interval;
    loop {
        if stop.load(Ordering::Relaxed) {
            return true;
        }
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        thread::park_timeout(deadline - now);
    }
}

fn lock<D: CharDisplay>(device: &Mutex<D>) -> Result<MutexGuard<'_, D>, DisplayError> {
    device
        .lock()
        .map_err(|_| DisplayError::Bus("display lock poisoned".to_string()))
}

pub struct Lcd<D: CharDisplay + 'static> {
    device: Arc<Mutex<D>>,
    animation: Option<Animation>,
    powered: bool,
    width: usize,
    timing: AnimationTiming,
}

impl<D: CharDisplay + 'static> Lcd<D> {
    /// Register the custom glyphs and start with a blank, powered display.
    pub fn new(mut device: D, timing: AnimationTiming) -> Result<Self, DisplayError> {
        device.define_glyph(ENTER_GLYPH_SLOT, &ENTER_GLYPH)?;
        device.clear()?;
        device.power(true)?;
        let width = device.width();
        info!("LCD ready: {}x{}", width, device.rows());
        Ok(Self {
            device: Arc::new(Mutex::new(device)),
            animation: None,
            powered: true,
            width,
            timing,
        })
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn is_animating(&self) -> bool {
        self.animation
            .as_ref()
            .map(|a| !a.handle.is_finished())
            .unwrap_or(false)
    }

    /// Run `f` against the device once any animation is stopped.
    pub fn with_device<R>(&mut self, f: impl FnOnce(&D) -> R) -> Result<R, DisplayError> {
        self.cancel_animation();
        let device = lock(&self.device)?;
        Ok(f(&device))
    }

    pub fn cancel_animation(&mut self) {
        if let Some(animation) = self.animation.take() {
            animation.cancel();
            debug!("Display animation stopped");
        }
    }

    pub fn power(&mut self, on: bool) -> Result<(), DisplayError> {
        self.cancel_animation();
        lock(&self.device)?.power(on)?;
        self.powered = on;
        Ok(())
    }

    pub fn clear(&mut self) -> Result<(), DisplayError> {
        self.cancel_animation();
        lock(&self.device)?.clear()
    }

    pub fn write_at(&mut self, col: usize, row: usize, text: &str) -> Result<(), DisplayError> {
        self.cancel_animation();
        let mut device = lock(&self.device)?;
        device.move_cursor(col, row)?;
        device.write(text)
    }

    pub fn draw(&mut self, screen: &Screen) -> Result<(), DisplayError> {
        self.clear()?;
        match screen {
            Screen::Lines { top, bottom } => {
                let mut scrolling = None;
                for (row, line) in [(0, top), (1, bottom)] {
                    match line {
                        Line::Empty => {}
                        Line::Static(text) => self.write_at(0, row, text)?,
                        Line::Scroll(text) if text.chars().count() <= self.width => {
                            self.write_at(0, row, text)?
                        }
                        Line::Scroll(text) => scrolling = Some((row, text.clone())),
                    }
                }
                if let Some((row, text)) = scrolling {
                    self.scroll(&text, row)?;
                }
                Ok(())
            }
            Screen::Blink(text) => self.blink(text, None),
        }
    }

    /// Scroll `text` once across `row`, then leave its head in place.
    pub fn scroll(&mut self, text: &str, row: usize) -> Result<(), DisplayError> {
        self.cancel_animation();
        let chars: Vec<char> = text.chars().collect();
        let width = self.width;
        let head: String = chars.iter().take(width).collect();
        self.write_at(0, row, &head)?;
        if chars.len() <= width {
            return Ok(());
        }

        let interval = self.timing.scroll_interval;
        self.spawn("lcd-scroll", move |device, stop| {
            for start in 1..=chars.len() - width {
                if pause(stop, interval) {
                    return Ok(());
                }
                let frame: String = chars[start..start + width].iter().collect();
                let mut device = lock(device)?;
                device.move_cursor(0, row)?;
                device.write(&frame)?;
            }
            if pause(stop, interval) {
                return Ok(());
            }
            let mut device = lock(device)?;
            device.move_cursor(0, row)?;
            device.write(&head)
        })
    }

    /// Show `text` on the first row and toggle the backlight `count` times,
    /// or until cancelled when `count` is `None`. The backlight ends on.
    pub fn blink(&mut self, text: &str, count: Option<usize>) -> Result<(), DisplayError> {
        self.cancel_animation();
        self.write_at(0, 0, text)?;

        let interval = self.timing.blink_interval;
        self.spawn("lcd-blink", move |device, stop| {
            let mut toggles = 0usize;
            let mut lit = true;
            while count.map_or(true, |n| toggles < n) {
                if pause(stop, interval) {
                    break;
                }
                lit = !lit;
                lock(device)?.backlight(lit)?;
                toggles += 1;
            }
            lock(device)?.backlight(true)
        })
    }

    fn spawn<F>(&mut self, name: &str, work: F) -> Result<(), DisplayError>
    where
        F: FnOnce(&Mutex<D>, &AtomicBool) -> Result<(), DisplayError> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let device = self.device.clone();
        let worker_stop = stop.clone();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if let Err(e) = work(&device, &worker_stop) {
                    error!("Display animation failed: {}", e);
                }
            })
            .map_err(|e| DisplayError::Bus(format!("failed to start animation: {}", e)))?;
        self.animation = Some(Animation { stop, handle });
        Ok(())
    }
}

impl<D: CharDisplay + 'static> Drop for Lcd<D> {
    fn drop(&mut self) {
        self.cancel_animation();
    }
}
