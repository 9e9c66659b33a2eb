//! # Button tasks
//! This module contains the press classification for the push buttons. Each
//! button has its own task polling the line at a fixed interval; a small
//! state machine turns the raw levels into exactly one short or long event
//! per physical press, no matter how long the hold continues.

use embassy_time::{Duration, Instant, Ticker};
use log::info;

use crate::event::{Event, PressKind, send_event};
use crate::hal::InputPin;

/// Poll interval for the button lines
const BUTTON_POLL: Duration = Duration::from_millis(10);
/// Hold duration past which a press classifies as long
const LONG_PRESS: Duration = Duration::from_secs(2);

/// The push buttons of the system
#[derive(Debug, Eq, PartialEq, Clone, Copy)]
pub enum ButtonSource {
    /// Push button built into the rotary encoder
    Encoder,
    /// Standalone snooze button
    Snooze,
}

impl ButtonSource {
    /// Wrap a classified press into this button's event
    const fn event(self, kind: PressKind) -> Event {
        match self {
            Self::Encoder => Event::EncoderButton(kind),
            Self::Snooze => Event::SnoozeButton(kind),
        }
    }
}

/// Classifies raw line levels into short and long presses.
///
/// Per button it tracks the press start and whether the long event already
/// fired. A hold reaching the threshold fires one `Long` and nothing on
/// release; a release before the threshold fires one `Short`. Exactly one
/// event per physical press.
pub struct PressClassifier {
    /// Hold duration past which a press classifies as long
    long_press: Duration,
    /// Instant the current press started, `Some` while held
    pressed_at: Option<Instant>,
    /// Whether the current hold already fired its long event
    long_fired: bool,
}

impl PressClassifier {
    /// New classifier with the given long-press threshold
    pub const fn new(long_press: Duration) -> Self {
        Self {
            long_press,
            pressed_at: None,
            long_fired: false,
        }
    }

    /// Feed one poll sample, returning a classified press when one completes
    pub fn poll(&mut self, pressed: bool, now: Instant) -> Option<PressKind> {
        match (self.pressed_at, pressed) {
            // released -> pressed edge
            (None, true) => {
                self.pressed_at = Some(now);
                self.long_fired = false;
                None
            }
            // still held, fire the long event once past the threshold
            (Some(start), true) => {
                if !self.long_fired && now.duration_since(start) >= self.long_press {
                    self.long_fired = true;
                    return Some(PressKind::Long);
                }
                None
            }
            // pressed -> released edge, a short press unless long already fired
            (Some(_), false) => {
                self.pressed_at = None;
                if self.long_fired {
                    self.long_fired = false;
                    None
                } else {
                    Some(PressKind::Short)
                }
            }
            (None, false) => None,
        }
    }
}

/// This task polls one button line and reports classified presses.
#[embassy_executor::task(pool_size = 2)]
pub async fn button_handler(input: Box<dyn InputPin>, button: ButtonSource) {
    let mut classifier = PressClassifier::new(LONG_PRESS);
    let mut ticker = Ticker::every(BUTTON_POLL);
    info!("{button:?} button task started");
    loop {
        if let Some(kind) = classifier.poll(input.is_low(), Instant::now()) {
            info!("{button:?} button: {kind:?} press");
            send_event(button.event(kind)).await;
        }
        ticker.next().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn classifier() -> PressClassifier {
        PressClassifier::new(LONG_PRESS)
    }

    #[test]
    fn quick_tap_is_one_short_press() {
        let mut c = classifier();
        assert_eq!(c.poll(true, at(0)), None);
        assert_eq!(c.poll(true, at(100)), None);
        assert_eq!(c.poll(false, at(150)), Some(PressKind::Short));
        assert_eq!(c.poll(false, at(160)), None);
    }

    #[test]
    fn hold_fires_long_exactly_once() {
        let mut c = classifier();
        assert_eq!(c.poll(true, at(0)), None);
        assert_eq!(c.poll(true, at(1999)), None);
        assert_eq!(c.poll(true, at(2000)), Some(PressKind::Long));
        // keeps holding: no repeats
        assert_eq!(c.poll(true, at(3000)), None);
        assert_eq!(c.poll(true, at(60_000)), None);
        // and no short on release either
        assert_eq!(c.poll(false, at(61_000)), None);
    }

    #[test]
    fn release_just_before_threshold_is_short() {
        let mut c = classifier();
        assert_eq!(c.poll(true, at(0)), None);
        assert_eq!(c.poll(true, at(1990)), None);
        assert_eq!(c.poll(false, at(1999)), Some(PressKind::Short));
    }

    #[test]
    fn presses_classify_independently() {
        let mut c = classifier();
        c.poll(true, at(0));
        assert_eq!(c.poll(true, at(2500)), Some(PressKind::Long));
        c.poll(false, at(2600));
        // a following tap is short again
        c.poll(true, at(3000));
        assert_eq!(c.poll(false, at(3100)), Some(PressKind::Short));
    }

    #[test]
    fn idle_line_never_emits() {
        let mut c = classifier();
        for ms in (0..1000).step_by(10) {
            assert_eq!(c.poll(false, at(ms)), None);
        }
    }
}
