//! Binary entry point. Wires the board and the external collaborators to the
//! fixed task set, then runs the executor forever.

use std::sync::Arc;

use embassy_executor::Executor;
use log::{LevelFilter, error, info};
use static_cell::StaticCell;

use analog_alarmclock::hal::sim::SimBoard;
use analog_alarmclock::render::{LogRenderer, Renderer};
use analog_alarmclock::task::buttons::{ButtonSource, button_handler};
use analog_alarmclock::task::buzzer::buzzer_handler;
use analog_alarmclock::task::clock::clock_handler;
use analog_alarmclock::task::display::display_handler;
use analog_alarmclock::task::encoder::encoder_handler;
use analog_alarmclock::task::fade::fade_handler;
use analog_alarmclock::task::indicator::indicator_handler;
use analog_alarmclock::task::orchestrate::orchestrator;
use analog_alarmclock::task::persist::{CONFIG_PATH, ConfigStore, persist_handler};
use analog_alarmclock::task::shutdown::{register_interrupt_flag, signal_watcher};
use analog_alarmclock::task::stepper::stepper_handler;

/// The executor lives for the process lifetime
static EXECUTOR: StaticCell<Executor> = StaticCell::new();

// Entry point
fn main() {
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();
    info!("program start");

    let interrupt = match register_interrupt_flag() {
        Ok(flag) => flag,
        Err(e) => {
            error!("cannot register signal handlers: {e}");
            std::process::exit(1);
        }
    };

    let board = SimBoard::new();
    let store = ConfigStore::new(CONFIG_PATH);
    let renderer: Arc<dyn Renderer> = Arc::new(LogRenderer);

    let executor = EXECUTOR.init(Executor::new());
    executor.run(move |spawner| {
        spawner.spawn(orchestrator()).unwrap();
        spawner.spawn(persist_handler(store)).unwrap();
        spawner.spawn(signal_watcher(interrupt)).unwrap();
        spawner
            .spawn(clock_handler(Box::new(board.arm_switch)))
            .unwrap();
        spawner
            .spawn(button_handler(
                Box::new(board.encoder_button),
                ButtonSource::Encoder,
            ))
            .unwrap();
        spawner
            .spawn(button_handler(
                Box::new(board.snooze_button),
                ButtonSource::Snooze,
            ))
            .unwrap();
        spawner
            .spawn(encoder_handler(
                Box::new(board.encoder_clk),
                Box::new(board.encoder_dt),
            ))
            .unwrap();
        spawner
            .spawn(stepper_handler(Box::new(board.stepper)))
            .unwrap();
        spawner
            .spawn(buzzer_handler(Box::new(board.buzzer)))
            .unwrap();
        spawner.spawn(fade_handler(Box::new(board.dimmer))).unwrap();
        spawner
            .spawn(indicator_handler(
                Box::new(board.indicator),
                Box::new(board.pm_lamp),
            ))
            .unwrap();
        spawner.spawn(display_handler(renderer)).unwrap();
    });
}
