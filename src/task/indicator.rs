//! # Armed indicator task
//! Projects shared state onto the RGB indicator and the PM lamp: a yellow
//! glow scaled by the configured brightness while the alarm is armed, and the
//! PM lamp lit through the afternoon half of the dial. Hardware is only
//! touched when the projection actually changes.

use embassy_time::{Duration, Ticker};
use log::info;

use crate::hal::{OutputPin, RGB8, RgbIndicator};
use crate::state::CLOCK_STATE;
use crate::task::shutdown::shutdown_requested;

/// Refresh interval for the projection
const INDICATOR_POLL: Duration = Duration::from_millis(200);
/// Color shown while armed
const ARMED_COLOR: RGB8 = RGB8 { r: 255, g: 255, b: 0 };
/// Dimmest global brightness the glow is still visible at
const MIN_GLOW: f32 = 0.02;
/// Hand position at which the PM half of the day begins
const PM_BOUNDARY: u16 = 720;

/// One applied projection, kept to skip redundant hardware writes
#[derive(PartialEq, Debug, Clone, Copy)]
struct Projection {
    /// Glow brightness while armed, `None` while off
    glow: Option<f32>,
    /// PM lamp level
    pm: bool,
}

/// Projection the state snapshot calls for
fn project(armed: bool, brightness: u8, hand_position: u16) -> Projection {
    Projection {
        glow: armed.then(|| (f32::from(brightness) / 100.0).max(MIN_GLOW)),
        pm: hand_position >= PM_BOUNDARY,
    }
}

/// This task keeps the indicator light and the PM lamp in step with state.
#[embassy_executor::task]
pub async fn indicator_handler(mut light: Box<dyn RgbIndicator>, mut pm_lamp: Box<dyn OutputPin>) {
    let mut ticker = Ticker::every(INDICATOR_POLL);
    let mut applied: Option<Projection> = None;
    info!("indicator task started");
    loop {
        if shutdown_requested() {
            light.off();
            pm_lamp.set_low();
            info!("indicator: dark on shutdown");
            return;
        }
        let snapshot = CLOCK_STATE
            .lock()
            .await
            .as_ref()
            .map(|config| (config.alarm_armed, config.brightness, config.hand_position));
        if let Some((armed, brightness, hand_position)) = snapshot {
            let next = project(armed, brightness, hand_position);
            if applied != Some(next) {
                match next.glow {
                    Some(glow) => light.set(ARMED_COLOR, glow),
                    None => light.off(),
                }
                if next.pm {
                    pm_lamp.set_high();
                } else {
                    pm_lamp.set_low();
                }
                applied = Some(next);
            }
        }
        ticker.next().await;
    }
}
