//! # Display boundary
//! Fire-and-forget requests to the external rendering collaborator. The core
//! never waits on a render or inspects its outcome beyond logging; a slow or
//! broken display must not stall the control loop.

use anyhow::Result;
use log::info;

/// State snapshot handed to the main screen
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct ScreenSnapshot {
    /// Configured alarm minute-of-day
    pub alarm_time: u16,
    /// Whether the alarm is currently armed
    pub alarm_armed: bool,
}

/// The external rendering collaborator.
///
/// Implementations may block for seconds (e-paper refreshes do); calls are
/// made from a throwaway thread so the executor never waits on them.
pub trait Renderer: Send + Sync {
    /// Show the calibration instructions screen
    fn show_calibrate(&self) -> Result<()>;
    /// Show the set-alarm screen with the current hand position
    fn show_set_alarm(&self, hand_position: u16) -> Result<()>;
    /// Redraw the main screen
    fn show_main(&self, snapshot: ScreenSnapshot) -> Result<()>;
}

/// Renderer that only logs, wired in when no panel is attached
pub struct LogRenderer;

impl Renderer for LogRenderer {
    fn show_calibrate(&self) -> Result<()> {
        info!("display: calibration screen");
        Ok(())
    }

    fn show_set_alarm(&self, hand_position: u16) -> Result<()> {
        info!("display: set-alarm screen at {}", minute_text(hand_position));
        Ok(())
    }

    fn show_main(&self, snapshot: ScreenSnapshot) -> Result<()> {
        info!(
            "display: main screen, alarm {} ({})",
            minute_text(snapshot.alarm_time),
            if snapshot.alarm_armed { "armed" } else { "off" },
        );
        Ok(())
    }
}

/// Format a minute-of-day as HH:MM
pub fn minute_text(minute: u16) -> String {
    format!("{:02}:{:02}", minute / 60, minute % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minute_text_is_zero_padded() {
        assert_eq!(minute_text(0), "00:00");
        assert_eq!(minute_text(420), "07:00");
        assert_eq!(minute_text(1439), "23:59");
    }
}
