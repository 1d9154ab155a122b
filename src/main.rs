use anyhow::{Context, Result};
use coffee_rs::controller::CoffeeController;
use coffee_rs::input::{PersonButtons, QuadratureDecoder};
use coffee_rs::scale::{ScalePipeline, SimulatedScale};
use coffee_rs::storage::{SqliteStore, Store};
use coffee_rs::system::{
    publish_input, AppConfig, HostSystem, InputChannel, InputEvent, PourChannel, SimulatedSystem,
    SystemClock, SystemControl,
};
use coffee_rs::ui::{AnimationTiming, AppSession, ConsoleDisplay, Lcd};
use coffee_rs::BUTTON_COUNT;
use embassy_executor::Spawner;
use embassy_time::Instant;
use log::{error, info, warn};
use std::io::BufRead;
use std::sync::Arc;
use std::thread;

// Encoder levels (clk, data) for one detent, ending at rest
const DETENT_CW: [(bool, bool); 4] = [(true, false), (true, true), (false, true), (false, false)];
const DETENT_CCW: [(bool, bool); 4] = [(false, true), (true, true), (true, false), (false, false)];

#[embassy_executor::main]
async fn main(_spawner: Spawner) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    info!("Starting coffee pot tracker");

    let code = match run().await {
        Ok(()) => 0,
        Err(e) => {
            error!("Coffee pot tracker failed: {:#}", e);
            1
        }
    };
    // The executor never returns on its own
    std::process::exit(code);
}

async fn run() -> Result<()> {
    let config_path = AppConfig::resolve_path(std::env::args().nth(1));
    let config = AppConfig::load(&config_path)?;

    let store: Arc<dyn Store> = Arc::new(SqliteStore::open(&config.storage.database_path)?);
    let system: Arc<dyn SystemControl> = if config.system.allow_shutdown {
        Arc::new(HostSystem)
    } else {
        info!("Host commands disabled, shutdown pages are simulated");
        Arc::new(SimulatedSystem::new(config.system.simulated_hostname.clone()))
    };

    let display = ConsoleDisplay::new(config.ui.width, config.ui.rows);
    let lcd = Lcd::new(display, AnimationTiming::from(&config.ui))
        .context("failed to initialize the display")?;
    let session = AppSession::new(lcd, store, system, Arc::new(SystemClock), config.ui.clone());

    let input_channel = Arc::new(InputChannel::new());
    let pour_channel = Arc::new(PourChannel::new());
    let pipeline = ScalePipeline::new(config.scale.clone(), pour_channel.clone());

    let scale = SimulatedScale::new(0.0);
    spawn_console(input_channel.clone(), scale.clone())?;

    let mut controller =
        CoffeeController::new(session, pipeline, input_channel, pour_channel, &config.ui);
    controller.start(scale)?;
    print_help();

    let result = controller.run().await;
    controller.stop();
    result
}

fn spawn_console(inputs: Arc<InputChannel>, scale: SimulatedScale) -> Result<()> {
    thread::Builder::new()
        .name("console".to_string())
        .spawn(move || console_loop(&inputs, &scale))
        .context("failed to spawn console thread")?;
    Ok(())
}

/// Stand-in for the encoder, buttons and load cell: one command per line.
fn console_loop(inputs: &InputChannel, scale: &SimulatedScale) {
    let mut encoder = QuadratureDecoder::new();
    let mut buttons = PersonButtons::default();

    for line in std::io::stdin().lock().lines() {
        let Ok(line) = line else { break };
        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (None, _) => {}
            (Some(turn @ ("+" | "-")), _) => {
                let detent = if turn == "+" { DETENT_CW } else { DETENT_CCW };
                for (clk, data) in detent {
                    if let Some(event) = encoder.update(clk, data) {
                        publish_input(inputs, event);
                    }
                }
            }
            (Some("ok"), _) => {
                publish_input(inputs, InputEvent::Confirm);
            }
            (Some("x"), _) => {
                publish_input(inputs, InputEvent::Cancel);
            }
            (Some("p"), Some(id)) => match id.parse::<u8>() {
                Ok(id) if usize::from(id) < BUTTON_COUNT => {
                    let (flags_a, flags_b) = interrupt_flags(id);
                    buttons.dispatch(flags_a, flags_b, Instant::now(), inputs);
                }
                _ => warn!("No person button {}", id),
            },
            (Some("w"), Some(grams)) => match grams.parse::<f32>() {
                Ok(grams) => scale.set_weight(grams),
                Err(_) => warn!("Not a weight: {}", grams),
            },
            (Some("q"), _) => break,
            _ => print_help(),
        }
    }

    publish_input(inputs, InputEvent::Quit);
}

/// Expander flag registers as they read when `id` alone fired.
fn interrupt_flags(id: u8) -> (u8, u8) {
    if id < 8 {
        (1 << id, 0)
    } else {
        (0, 1 << (id - 8))
    }
}

fn print_help() {
    println!("Commands:");
    println!("  + / -    turn the encoder one detent");
    println!("  ok       press the encoder");
    println!("  x        press the red button");
    println!("  p <id>   press person button 0-15");
    println!("  w <g>    put <g> grams on the scale");
    println!("  q        quit");
}
