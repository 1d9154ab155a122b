use crate::{
    scale::{Acknowledger, ScalePipeline, ScaleReadings, WeightSource},
    system::{
        config::UiConfig,
        events::{InputChannel, InputEvent, PourChannel},
    },
    types::PourEvent,
    ui::{AppSession, CharDisplay, DisplayError},
};
use anyhow::{Context, Result};
use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Timer};
use log::{debug, error, info, warn};
use std::sync::Arc;

/// Consecutive display failures tolerated before the loop gives up.
const MAX_DISPLAY_FAILURES: u32 = 3;

pub struct CoffeeController<D: CharDisplay + 'static> {
    session: AppSession<D>,
    pipeline: ScalePipeline,
    acknowledger: Acknowledger,

    input_channel: Arc<InputChannel>,
    pour_channel: Arc<PourChannel>,

    poll_interval: Duration,
    shutdown_delay: Duration,
    display_failures: u32,
}

impl<D: CharDisplay + 'static> CoffeeController<D> {
    pub fn new(
        session: AppSession<D>,
        pipeline: ScalePipeline,
        input_channel: Arc<InputChannel>,
        pour_channel: Arc<PourChannel>,
        config: &UiConfig,
    ) -> Self {
        let acknowledger = pipeline.acknowledger();
        Self {
            session,
            pipeline,
            acknowledger,
            input_channel,
            pour_channel,
            poll_interval: config.poll_interval(),
            shutdown_delay: Duration::from_millis(config.confirm_message_ms),
            display_failures: 0,
        }
    }

    /// Show the Home page and start sampling the scale.
    pub fn start<S: WeightSource + 'static>(&mut self, source: S) -> Result<()> {
        info!("Starting coffee controller");
        self.session.start().context("failed to draw the first page")?;
        self.pipeline.start(source)?;
        Ok(())
    }

    pub fn session(&self) -> &AppSession<D> {
        &self.session
    }

    pub fn readings(&self) -> ScaleReadings {
        self.pipeline.latest_readings()
    }

    /// Serve events until a quit request or an executed shutdown.
    pub async fn run(&mut self) -> Result<()> {
        self.main_control_loop().await
    }

    /// Stop sampling and darken the display.
    pub fn stop(&mut self) {
        self.pipeline.stop();
        if let Err(e) = self.session.close() {
            warn!("Display did not power off cleanly: {}", e);
        }
        info!("Coffee controller stopped");
    }

    async fn main_control_loop(&mut self) -> Result<()> {
        info!("Starting main control loop with Embassy select");

        loop {
            let input_fut = self.input_channel.receive();
            let pour_fut = self.pour_channel.receive();
            let periodic_timer = Timer::after(self.poll_interval);

            let outcome = match select(select(input_fut, pour_fut), periodic_timer).await {
                Either::First(Either::First(InputEvent::Quit)) => {
                    info!("Quit requested");
                    return Ok(());
                }
                Either::First(Either::First(input)) => {
                    debug!("Input: {}", input.name());
                    self.session.handle_input(input)
                }
                Either::First(Either::Second(pour)) => self.handle_pour(pour),
                Either::Second(_) => self.periodic_update(),
            };
            self.check_display(outcome)?;

            if let Some(restart) = self.session.take_shutdown_request() {
                // Leave the farewell text up for a moment
                Timer::after(self.shutdown_delay).await;
                self.pipeline.stop();
                self.session.execute_shutdown(restart)?;
                return Ok(());
            }
        }
    }

    fn handle_pour(&mut self, pour: PourEvent) -> Result<(), DisplayError> {
        let outcome = self.session.handle_pour(pour);
        // The classifier waits for the page switch before reading on
        if pour.needs_ack() {
            self.acknowledger.ack();
        }
        outcome
    }

    fn periodic_update(&mut self) -> Result<(), DisplayError> {
        self.session.tick()?;
        self.session.check_timeout()
    }

    fn check_display(&mut self, outcome: Result<(), DisplayError>) -> Result<()> {
        match outcome {
            Ok(()) => {
                self.display_failures = 0;
                Ok(())
            }
            Err(e) => {
                self.display_failures += 1;
                error!(
                    "Display error ({}/{}): {}",
                    self.display_failures, MAX_DISPLAY_FAILURES, e
                );
                if self.display_failures >= MAX_DISPLAY_FAILURES {
                    return Err(e).context("display keeps failing");
                }
                Ok(())
            }
        }
    }
}
