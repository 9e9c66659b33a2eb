//! # Rotary encoder task
//! Quadrature decoding for the rotary encoder. The task polls the clock line
//! at a fixed interval; on a falling edge it samples the data line twice with
//! a settle delay and commits a direction only when both samples agree, so an
//! electrically bouncing detent is discarded instead of guessed. Clock-line
//! transitions closer together than the minimum inter-tick gap are ignored
//! outright.

use embassy_time::{Duration, Instant, Ticker, Timer};
use log::{debug, info};

use crate::event::{Event, Rotation, send_event};
use crate::hal::InputPin;

/// Poll interval for the encoder clock line
const ENCODER_POLL: Duration = Duration::from_millis(5);
/// Minimum spacing between clock-line transitions, anything closer is bounce
const MIN_TICK_GAP: Duration = Duration::from_millis(2);
/// Settle delay before the first data-line sample
const SETTLE: Duration = Duration::from_millis(1);
/// Gap between the two confirmation samples
const RESAMPLE: Duration = Duration::from_micros(500);

/// What one clock-line sample amounts to
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Edge {
    /// No transition since the previous sample
    None,
    /// Transition inside the minimum gap, dropped as bounce
    Bounce,
    /// Clean rising edge
    Rising,
    /// Clean falling edge, the decode point
    Falling,
}

/// Tracks clock-line levels and filters bounce between transitions.
pub struct EdgeFilter {
    /// Whether the line read low at the previous sample
    last_low: bool,
    /// Instant of the last clean transition; bounces do not refresh it
    last_transition: Instant,
}

impl EdgeFilter {
    /// New filter primed with the line's current level
    pub const fn new(initial_low: bool, now: Instant) -> Self {
        Self {
            last_low: initial_low,
            last_transition: now,
        }
    }

    /// Feed one poll sample of the clock line
    pub fn sample(&mut self, low: bool, now: Instant) -> Edge {
        if low == self.last_low {
            return Edge::None;
        }
        if now.duration_since(self.last_transition) < MIN_TICK_GAP {
            self.last_low = low;
            return Edge::Bounce;
        }
        self.last_low = low;
        self.last_transition = now;
        if low { Edge::Falling } else { Edge::Rising }
    }
}

/// Direction encoded by the two data-line samples, `None` when they disagree
pub const fn rotation_from_samples(first_high: bool, second_high: bool) -> Option<Rotation> {
    if first_high != second_high {
        return None;
    }
    Some(if first_high {
        Rotation::Clockwise
    } else {
        Rotation::CounterClockwise
    })
}

/// This task decodes the rotary encoder and reports direction ticks.
#[embassy_executor::task]
pub async fn encoder_handler(clk: Box<dyn InputPin>, dt: Box<dyn InputPin>) {
    let mut filter = EdgeFilter::new(clk.is_low(), Instant::now());
    let mut ticker = Ticker::every(ENCODER_POLL);
    info!("encoder task started");
    loop {
        ticker.next().await;
        if filter.sample(clk.is_low(), Instant::now()) != Edge::Falling {
            continue;
        }
        Timer::after(SETTLE).await;
        let first = !dt.is_low();
        Timer::after(RESAMPLE).await;
        let second = !dt.is_low();
        match rotation_from_samples(first, second) {
            Some(rotation) => {
                debug!("encoder tick: {rotation:?}");
                send_event(Event::EncoderTick(rotation)).await;
            }
            None => debug!("encoder tick discarded, samples disagree"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(us: u64) -> Instant {
        Instant::from_micros(us)
    }

    #[test]
    fn agreeing_high_samples_are_clockwise() {
        assert_eq!(
            rotation_from_samples(true, true),
            Some(Rotation::Clockwise)
        );
    }

    #[test]
    fn agreeing_low_samples_are_counter_clockwise() {
        assert_eq!(
            rotation_from_samples(false, false),
            Some(Rotation::CounterClockwise)
        );
    }

    #[test]
    fn disagreeing_samples_are_discarded() {
        assert_eq!(rotation_from_samples(true, false), None);
        assert_eq!(rotation_from_samples(false, true), None);
    }

    #[test]
    fn steady_line_yields_no_edges() {
        let mut filter = EdgeFilter::new(false, at(0));
        for step in 1..10 {
            assert_eq!(filter.sample(false, at(step * 5000)), Edge::None);
        }
    }

    #[test]
    fn clean_transitions_report_their_direction() {
        let mut filter = EdgeFilter::new(false, at(0));
        assert_eq!(filter.sample(true, at(5000)), Edge::Falling);
        assert_eq!(filter.sample(false, at(10_000)), Edge::Rising);
    }

    #[test]
    fn transition_inside_minimum_gap_is_bounce() {
        let mut filter = EdgeFilter::new(false, at(0));
        assert_eq!(filter.sample(true, at(5000)), Edge::Falling);
        assert_eq!(filter.sample(false, at(6000)), Edge::Bounce);
    }

    #[test]
    fn bounce_does_not_refresh_the_gap_window() {
        let mut filter = EdgeFilter::new(false, at(0));
        assert_eq!(filter.sample(true, at(5000)), Edge::Falling);
        // bounce back up at +1 ms, tracked but not anchored
        assert_eq!(filter.sample(false, at(6000)), Edge::Bounce);
        // next fall is measured against the clean edge at 5 ms
        assert_eq!(filter.sample(true, at(7500)), Edge::Falling);
    }
}
