//! # Backlight fade task
//! Sole owner of the dial backlight PWM. While the fade flag is raised the
//! duty sweeps a triangle wave between 5% and 100%, signalling that the clock
//! is in calibrate or set-alarm mode; otherwise the task holds the configured
//! steady brightness at a relaxed poll rate, which also picks up encoder
//! brightness changes.

use std::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Timer};
use log::info;

use crate::hal::PwmDimmer;
use crate::state::CLOCK_STATE;
use crate::task::shutdown::shutdown_requested;

/// Lower bound of the sweep, as a fraction of full duty
const FADE_FLOOR: f32 = 0.05;
/// Upper bound of the sweep
const FADE_CEIL: f32 = 1.0;
/// Sweep increment per interval
const FADE_STEP: f32 = 0.04;
/// Interval between sweep increments
const FADE_INTERVAL: Duration = Duration::from_millis(30);
/// Poll interval while not fading
const IDLE_POLL: Duration = Duration::from_millis(100);
/// Sweep level on startup, matching a freshly entered fade
const FADE_START: f32 = 0.1;

/// Raised while a mode wants the backlight pulsing
static FADING: AtomicBool = AtomicBool::new(false);

/// Raise or clear the fade flag
pub fn set_fading(on: bool) {
    FADING.store(on, Ordering::Relaxed);
}

/// Whether the backlight is currently pulsing
pub fn is_fading() -> bool {
    FADING.load(Ordering::Relaxed)
}

/// This task owns the backlight PWM: triangle sweep while fading, the steady
/// configured brightness otherwise.
#[embassy_executor::task]
pub async fn fade_handler(mut dimmer: Box<dyn PwmDimmer>) {
    let mut level = FADE_START;
    let mut rising = true;
    info!("fade task started");
    loop {
        if shutdown_requested() {
            dimmer.release();
            info!("backlight: released on shutdown");
            return;
        }
        if is_fading() {
            dimmer.set_duty_percent(level * 100.0);
            if rising {
                level += FADE_STEP;
                if level >= FADE_CEIL {
                    level = FADE_CEIL;
                    rising = false;
                }
            } else {
                level -= FADE_STEP;
                if level <= FADE_FLOOR {
                    level = FADE_FLOOR;
                    rising = true;
                }
            }
            Timer::after(FADE_INTERVAL).await;
        } else {
            let brightness = CLOCK_STATE
                .lock()
                .await
                .as_ref()
                .map(|config| config.brightness);
            if let Some(brightness) = brightness {
                dimmer.set_duty_percent(f32::from(brightness));
            }
            Timer::after(IDLE_POLL).await;
        }
    }
}
