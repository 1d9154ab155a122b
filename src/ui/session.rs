//! Application session: the active page and everything around a transition
//!
//! Every inbound event goes through `dispatch`, which runs the
//! page handler, swaps in the returned page, powers the display on, redraws
//! and refreshes the activity timestamp. Handler failures leave the page in
//! place and show a transient "Erreur" instead.

use super::display::{CharDisplay, DisplayError};
use super::lcd::{Lcd, Screen};
use super::page::{Message, Page, PageContext, Transition};
use crate::storage::Store;
use crate::system::clock::Clock;
use crate::system::config::UiConfig;
use crate::system::events::{InputEvent, SystemEvent};
use crate::system::host::SystemControl;
use crate::types::{ButtonId, PourEvent};
use chrono::Local;
use embassy_time::{Duration, Instant};
use log::{debug, error, info};
use std::collections::HashMap;
use std::sync::Arc;

struct Overlay {
    message: Message,
    until: Instant,
}

pub struct AppSession<D: CharDisplay + 'static> {
    page: Page,
    lcd: Lcd<D>,
    store: Arc<dyn Store>,
    system: Arc<dyn SystemControl>,
    clock: Arc<dyn Clock>,
    config: UiConfig,
    last_interaction: Instant,
    overlay: Option<Overlay>,
    presses: HashMap<ButtonId, Instant>,
    shutdown_request: Option<bool>,
}

impl<D: CharDisplay + 'static> AppSession<D> {
    pub fn new(
        lcd: Lcd<D>,
        store: Arc<dyn Store>,
        system: Arc<dyn SystemControl>,
        clock: Arc<dyn Clock>,
        config: UiConfig,
    ) -> Self {
        let last_interaction = clock.now();
        Self {
            page: Page::Home,
            lcd,
            store,
            system,
            clock,
            config,
            last_interaction,
            overlay: None,
            presses: HashMap::new(),
            shutdown_request: None,
        }
    }

    /// Show the Home page on a powered display.
    pub fn start(&mut self) -> Result<(), DisplayError> {
        info!("Session started on {}", self.page.name());
        let now = self.clock.now();
        self.apply_transition(now)
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    pub fn is_display_on(&self) -> bool {
        self.lcd.is_powered()
    }

    pub fn has_overlay(&self) -> bool {
        self.overlay.is_some()
    }

    pub fn last_interaction(&self) -> Instant {
        self.last_interaction
    }

    /// Inspect the display device, stopping any running animation first.
    pub fn with_display<R>(&mut self, f: impl FnOnce(&D) -> R) -> Result<R, DisplayError> {
        self.lcd.with_device(f)
    }

    pub fn handle_event(&mut self, event: SystemEvent) -> Result<(), DisplayError> {
        match event {
            SystemEvent::Input(input) => self.handle_input(input),
            SystemEvent::Scale(pour) => self.handle_pour(pour),
        }
    }

    pub fn handle_input(&mut self, event: InputEvent) -> Result<(), DisplayError> {
        match event {
            InputEvent::Rotate { clockwise } => self.rotate(clockwise),
            InputEvent::Confirm => self.confirm(),
            InputEvent::Cancel => self.cancel(),
            InputEvent::PersonPressed(button_id) => self.person_pressed(button_id),
            InputEvent::Quit => Ok(()),
        }
    }

    pub fn handle_pour(&mut self, event: PourEvent) -> Result<(), DisplayError> {
        match event {
            PourEvent::PotRemoved => self.pot_removed(),
            PourEvent::PotReplaced => {
                debug!("Pot replaced - Page {}", self.page.name());
                Ok(())
            }
            PourEvent::MugPoured { weight_g } => self.mug_served(weight_g),
        }
    }

    pub fn rotate(&mut self, clockwise: bool) -> Result<(), DisplayError> {
        info!("Encoder - Clockwise {} - Page {}", clockwise, self.page.name());
        self.dispatch(|page, ctx| page.rotate(clockwise, ctx))
    }

    pub fn confirm(&mut self) -> Result<(), DisplayError> {
        info!("Encoder button - Page {}", self.page.name());
        self.dispatch(|page, ctx| page.confirm(ctx))
    }

    pub fn cancel(&mut self) -> Result<(), DisplayError> {
        info!("Red button - Page {}", self.page.name());
        self.dispatch(|page, ctx| page.cancel(ctx))
    }

    pub fn person_pressed(&mut self, button_id: ButtonId) -> Result<(), DisplayError> {
        info!("Person button - ID {} - Page {}", button_id, self.page.name());
        // Presses on an open mug attribute that mug directly
        if !self.page.is_weighed_attribution() {
            self.presses.insert(button_id, self.clock.now());
        }
        self.dispatch(|page, ctx| page.person_pressed(button_id, ctx))
    }

    pub fn mug_served(&mut self, weight_g: f32) -> Result<(), DisplayError> {
        info!("New mug - {:.1} g", weight_g);
        let recent = self.take_recent_presses();
        self.dispatch(|page, ctx| page.mug_served(weight_g, &recent, ctx))
    }

    pub fn pot_removed(&mut self) -> Result<(), DisplayError> {
        info!("Pot removed - Page {}", self.page.name());
        self.dispatch(|page, ctx| page.pot_removed(ctx))
    }

    /// Fall back to Home once the active page has been idle for its timeout.
    pub fn check_timeout(&mut self) -> Result<(), DisplayError> {
        let now = self.clock.now();
        let timeout = self.page.timeout(&self.config);
        if now.saturating_duration_since(self.last_interaction) < timeout {
            return Ok(());
        }

        if self.page.is_home() {
            if self.lcd.is_powered() {
                info!("Idle on Home, display off");
                self.lcd.power(false)?;
            }
            return Ok(());
        }

        info!("Timeout on {}", self.page.name());
        let mut ctx = PageContext::new(
            self.store.as_ref(),
            self.system.as_ref(),
            &self.config,
            Local::now(),
        );
        let outcome = self.page.on_timeout(&mut ctx);
        // Nobody is watching: confirmations of an automatic commit are dropped
        drop(ctx);

        match outcome {
            Ok(()) => {
                info!("{} -> {}", self.page.name(), Page::Home.name());
                self.overlay = None;
                self.page = Page::Home;
                self.lcd.power(false)?;
                self.draw()
            }
            Err(e) => {
                error!("Timeout of {} failed: {:#}", self.page.name(), e);
                self.show_error(now);
                self.apply_transition(now)
            }
        }
    }

    /// Remove an expired transient message and redraw the page under it.
    pub fn tick(&mut self) -> Result<(), DisplayError> {
        let now = self.clock.now();
        let expired = self
            .overlay
            .as_ref()
            .map(|overlay| now >= overlay.until)
            .unwrap_or(false);
        if expired {
            self.overlay = None;
            self.draw()?;
        }
        Ok(())
    }

    /// Restart flag of a shutdown requested by the Shutdown page, once.
    pub fn take_shutdown_request(&mut self) -> Option<bool> {
        self.shutdown_request.take()
    }

    /// Halt or reboot the host. The display goes dark first on a halt.
    pub fn execute_shutdown(&mut self, restart: bool) -> anyhow::Result<()> {
        if !restart {
            self.lcd.power(false)?;
        }
        self.system.shutdown(restart)
    }

    /// Stop animations and power the display down.
    pub fn close(&mut self) -> Result<(), DisplayError> {
        info!("Session closing");
        self.lcd.clear()?;
        self.lcd.power(false)
    }

    fn take_recent_presses(&mut self) -> Vec<ButtonId> {
        let now = self.clock.now();
        let Some(window) = self.config.lookbehind() else {
            self.presses.clear();
            return Vec::new();
        };
        let mut recent: Vec<(Instant, ButtonId)> = self
            .presses
            .drain()
            .filter(|(_, at)| now.saturating_duration_since(*at) < window)
            .map(|(button_id, at)| (at, button_id))
            .collect();
        recent.sort();
        recent.into_iter().map(|(_, button_id)| button_id).collect()
    }

    fn dispatch<F>(&mut self, handler: F) -> Result<(), DisplayError>
    where
        F: FnOnce(&mut Page, &mut PageContext) -> anyhow::Result<Transition>,
    {
        let now = self.clock.now();
        let mut ctx = PageContext::new(
            self.store.as_ref(),
            self.system.as_ref(),
            &self.config,
            Local::now(),
        );
        let outcome = handler(&mut self.page, &mut ctx).and_then(|transition| match transition {
            Transition::Stay => Ok(None),
            Transition::To(mut next) => {
                next.enter(&mut ctx)?;
                Ok(Some(next))
            }
        });
        let message = ctx.take_message();
        let shutdown = ctx.take_shutdown();
        drop(ctx);

        match outcome {
            Ok(next) => {
                if let Some(next) = next {
                    info!("{} -> {}", self.page.name(), next.name());
                    self.page = next;
                }
                if shutdown.is_some() {
                    self.shutdown_request = shutdown;
                }
                self.overlay = message.map(|message| Overlay {
                    until: now + message.duration,
                    message,
                });
            }
            Err(e) => {
                error!("{} handler failed: {:#}", self.page.name(), e);
                self.show_error(now);
            }
        }
        self.apply_transition(now)
    }

    fn show_error(&mut self, now: Instant) {
        self.overlay = Some(Overlay {
            message: Message {
                top: "Erreur".to_string(),
                bottom: None,
                duration: Duration::from_millis(self.config.message_ms),
            },
            until: now + Duration::from_millis(self.config.message_ms),
        });
    }

    fn apply_transition(&mut self, now: Instant) -> Result<(), DisplayError> {
        self.lcd.power(true)?;
        self.draw()?;
        self.last_interaction = now;
        Ok(())
    }

    fn draw(&mut self) -> Result<(), DisplayError> {
        let screen = match &self.overlay {
            Some(overlay) => overlay.message.screen(),
            None => self.page.screen(self.store.as_ref()).unwrap_or_else(|e| {
                error!("Cannot render {}: {:#}", self.page.name(), e);
                Screen::text("Erreur")
            }),
        };
        self.lcd.draw(&screen)
    }
}
