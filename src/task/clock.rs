//! # Scheduler tick task
//! Once per second this task snapshots the wall clock and the physical arm
//! switch and reports them to the orchestrator, which does the hand following
//! and alarm evaluation. Scheduling semantics are minute-resolution; ticking
//! every second just keeps hand movement and ring onset close to the minute
//! boundary.

use chrono::{DateTime, Local, Timelike};
use embassy_time::{Duration, Ticker};
use log::info;

use crate::event::{Event, TickSnapshot, send_event};
use crate::hal::InputPin;

/// Interval between scheduler ticks
const CLOCK_TICK: Duration = Duration::from_secs(1);

/// Minutes since midnight for a local timestamp
#[allow(clippy::cast_possible_truncation)] // hour * 60 + minute is at most 1439
pub fn minutes_of_day(now: &DateTime<Local>) -> u16 {
    (now.hour() * 60 + now.minute()) as u16
}

/// This task snapshots the wall clock and the arm switch once per second.
#[embassy_executor::task]
pub async fn clock_handler(arm_switch: Box<dyn InputPin>) {
    let mut ticker = Ticker::every(CLOCK_TICK);
    info!("clock task started");
    loop {
        let now = Local::now();
        send_event(Event::ClockTick(TickSnapshot {
            now_min: minutes_of_day(&now),
            today: now.date_naive(),
            armed: arm_switch.is_low(),
        }))
        .await;
        ticker.next().await;
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn minutes_of_day_counts_from_midnight() {
        let morning = Local.with_ymd_and_hms(2024, 5, 1, 7, 0, 59).unwrap();
        assert_eq!(minutes_of_day(&morning), 420);
        let midnight = Local.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        assert_eq!(minutes_of_day(&midnight), 0);
        let last = Local.with_ymd_and_hms(2024, 5, 1, 23, 59, 1).unwrap();
        assert_eq!(minutes_of_day(&last), 1439);
    }
}
