//! # Buzzer task
//! Beeps while the ringing flag is raised: 200 ms on, 200 ms off. The flag is
//! polled every few milliseconds during the on phase so a beep cuts out the
//! instant the alarm is stopped, not up to a phase later.

use std::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Instant, Timer};
use log::info;

use crate::hal::OutputPin;
use crate::task::shutdown::shutdown_requested;

/// Length of one on or off phase of the beep pattern
const BEEP_PHASE: Duration = Duration::from_millis(200);
/// Flag poll interval inside the on phase
const ABORT_POLL: Duration = Duration::from_millis(5);
/// Poll interval while silent
const IDLE_POLL: Duration = Duration::from_millis(50);

/// Raised while the alarm is ringing
static RINGING: AtomicBool = AtomicBool::new(false);

/// Raise or clear the ringing flag
pub fn set_ringing(on: bool) {
    RINGING.store(on, Ordering::Relaxed);
}

/// Whether the alarm is currently ringing
pub fn is_ringing() -> bool {
    RINGING.load(Ordering::Relaxed)
}

/// This task drives the piezo line from the ringing flag.
#[embassy_executor::task]
pub async fn buzzer_handler(mut piezo: Box<dyn OutputPin>) {
    info!("buzzer task started");
    loop {
        if shutdown_requested() {
            piezo.set_low();
            info!("buzzer: silenced on shutdown");
            return;
        }
        if is_ringing() {
            piezo.set_high();
            let deadline = Instant::now() + BEEP_PHASE;
            while Instant::now() < deadline {
                if !is_ringing() {
                    break;
                }
                Timer::after(ABORT_POLL).await;
            }
            piezo.set_low();
            Timer::after(BEEP_PHASE).await;
        } else {
            piezo.set_low();
            Timer::after(IDLE_POLL).await;
        }
    }
}
