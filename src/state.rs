//! # State of the system
//! This module describes the persisted state of the clock and the operations
//! that can be performed on it: mode changes, alarm lifecycle transitions and
//! the input-driven adjustments. All mutations happen inside the orchestrator
//! task; everything here is synchronous so it stays easy to test.

use chrono::NaiveDate;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use serde::{Deserialize, Serialize};

use crate::event::Rotation;

/// Minutes in a full day, the modulus for every minute-of-day field
pub const MINUTES_PER_DAY: u16 = 1440;
/// Upper brightness bound in percent
pub const MAX_BRIGHTNESS: u8 = 100;
/// Brightness change per encoder detent in idle mode
pub const BRIGHTNESS_STEP: u8 = 5;
/// Hand movement per encoder detent in calibrate and set-alarm mode
pub const HAND_NUDGE_MINUTES: u16 = 5;
/// Snooze delay applied to a short snooze press while ringing
pub const SNOOZE_MINUTES: u16 = 5;
/// Maximum ring duration before the alarm cancels itself for the day
pub const AUTO_CANCEL_MINUTES: u16 = 10;
/// Factory default alarm time, 07:00
const DEFAULT_ALARM_TIME: u16 = 420;
/// Factory default brightness percent
const DEFAULT_BRIGHTNESS: u8 = 50;

/// Type alias for the shared clock state protected by a mutex.
///
/// The state is wrapped in an `Option` because the persisted record arrives
/// asynchronously at startup; tasks reading before the load completes must
/// handle the `None` case.
type ClockStateType = Mutex<CriticalSectionRawMutex, Option<ClockConfig>>;

/// Global instance of the shared clock state.
///
/// Only the orchestrator task mutates the contents; every other task takes
/// short read-only snapshots.
pub static CLOCK_STATE: ClockStateType = Mutex::new(None);

/// The operation mode of the clock, governing how input events are interpreted
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationMode {
    /// Hands follow wall-clock time, encoder adjusts brightness
    Idle,
    /// Hands are being aligned to 12:00, encoder moves the hands
    Calibrate,
    /// Hands dial in a new alarm time, encoder moves the hands
    SetAlarm,
}

/// The single persisted state record of the clock.
///
/// Serialized as flat JSON; unknown fields are ignored and missing fields
/// fall back to their defaults, so the record survives schema drift the same
/// way it survives a missing file.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Current operation mode, restored across restarts
    pub mode: OperationMode,
    /// Dial backlight brightness in percent, clamped to 0..=100
    pub brightness: u8,
    /// Physical hand position as minutes-of-day, 0..=1439
    pub hand_position: u16,
    /// Minute-of-day at which the alarm rings
    pub alarm_time: u16,
    /// Mirror of the physical arm switch, rewritten every scheduler cycle.
    /// Non-authoritative: scheduling uses the fresh switch reading.
    pub alarm_armed: bool,
    /// True while the alarm is ringing
    pub alarm_active: bool,
    /// Minute-of-day the current ring started, set iff `alarm_active`
    pub alarm_start_min: Option<u16>,
    /// Last minute-of-day a ring started, guards same-minute re-triggers
    pub last_ring_min: Option<u16>,
    /// One-shot future minute at which a snoozed alarm rings again
    pub snooze_until: Option<u16>,
    /// Date on which ringing is suppressed, cleared by the calendar advancing
    pub alarm_disabled_date: Option<NaiveDate>,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            mode: OperationMode::Idle,
            brightness: DEFAULT_BRIGHTNESS,
            hand_position: 0,
            alarm_time: DEFAULT_ALARM_TIME,
            alarm_armed: false,
            alarm_active: false,
            alarm_start_min: None,
            last_ring_min: None,
            snooze_until: None,
            alarm_disabled_date: None,
        }
    }
}

/// State transitions
impl ClockConfig {
    /// Clamp and wrap every field into its documented range.
    ///
    /// Applied after each read from disk so externally tampered values are
    /// normalized rather than trusted verbatim.
    pub fn normalize(&mut self) {
        self.brightness = self.brightness.min(MAX_BRIGHTNESS);
        self.hand_position %= MINUTES_PER_DAY;
        self.alarm_time %= MINUTES_PER_DAY;
        self.alarm_start_min = self.alarm_start_min.map(|m| m % MINUTES_PER_DAY);
        self.last_ring_min = self.last_ring_min.map(|m| m % MINUTES_PER_DAY);
        self.snooze_until = self.snooze_until.map(|m| m % MINUTES_PER_DAY);
        if !self.alarm_active {
            self.alarm_start_min = None;
        }
    }

    /// Whether the alarm must start ringing at this tick.
    ///
    /// True when armed, not already ringing, not disabled for today, not
    /// already triggered this minute, and the minute matches either the alarm
    /// time or a pending snooze window.
    pub fn should_ring(&self, now_min: u16, today: NaiveDate) -> bool {
        if !self.alarm_armed || self.alarm_active {
            return false;
        }
        if self.alarm_disabled_date == Some(today) {
            return false;
        }
        if self.last_ring_min == Some(now_min) {
            return false;
        }
        now_min == self.alarm_time || self.snooze_until == Some(now_min)
    }

    /// Begin ringing: marks the start minute, latches the re-trigger guard
    /// and consumes any pending snooze window.
    pub const fn start_alarm(&mut self, now_min: u16) {
        self.alarm_active = true;
        self.alarm_start_min = Some(now_min);
        self.last_ring_min = Some(now_min);
        self.snooze_until = None;
    }

    /// Stop ringing without giving up on the alarm.
    ///
    /// `last_ring_min` is deliberately retained so the alarm cannot re-trigger
    /// within the same minute; alarm time and day-disable are untouched.
    pub const fn stop_alarm(&mut self) {
        self.alarm_active = false;
        self.alarm_start_min = None;
    }

    /// Stop ringing and suppress any further ring until the date changes.
    pub const fn cancel_alarm_for_day(&mut self, today: NaiveDate) {
        self.alarm_disabled_date = Some(today);
        self.alarm_active = false;
        self.alarm_start_min = None;
        self.snooze_until = None;
    }

    /// Snooze: schedule a one-shot ring five minutes from now, then stop.
    pub const fn snooze(&mut self, now_min: u16) {
        self.snooze_until = Some((now_min + SNOOZE_MINUTES) % MINUTES_PER_DAY);
        self.stop_alarm();
    }

    /// Drop the same-minute re-trigger guard once the minute has advanced.
    ///
    /// Without this a guard latched at the alarm minute would survive to the
    /// next day and silently block that day's ring. Returns true if the
    /// record changed.
    pub const fn expire_ring_guard(&mut self, now_min: u16) -> bool {
        match self.last_ring_min {
            Some(last) if last != now_min => {
                self.last_ring_min = None;
                true
            }
            _ => false,
        }
    }

    /// Whether the current ring has exceeded the auto-cancel bound.
    ///
    /// Elapsed time wraps across midnight so an alarm started at 23:55 still
    /// cancels at 00:05.
    pub fn auto_cancel_due(&self, now_min: u16) -> bool {
        match self.alarm_start_min {
            Some(start) if self.alarm_active => {
                let elapsed = (i32::from(now_min) - i32::from(start))
                    .rem_euclid(i32::from(MINUTES_PER_DAY));
                elapsed >= i32::from(AUTO_CANCEL_MINUTES)
            }
            _ => false,
        }
    }

    /// Adjust brightness one step per encoder detent, clamped to 0..=100.
    pub fn adjust_brightness(&mut self, rotation: Rotation) {
        self.brightness = match rotation {
            Rotation::Clockwise => self
                .brightness
                .saturating_add(BRIGHTNESS_STEP)
                .min(MAX_BRIGHTNESS),
            Rotation::CounterClockwise => self.brightness.saturating_sub(BRIGHTNESS_STEP),
        };
    }

    /// Move the recorded hand position one detent, wrapping at midnight.
    pub fn nudge_hand(&mut self, rotation: Rotation) {
        let delta = match rotation {
            Rotation::Clockwise => i32::from(HAND_NUDGE_MINUTES),
            Rotation::CounterClockwise => -i32::from(HAND_NUDGE_MINUTES),
        };
        self.hand_position = wrap_minute(i32::from(self.hand_position) + delta);
    }
}

/// Wrap a possibly negative minute value into 0..=1439.
#[allow(clippy::cast_possible_truncation)] // rem_euclid(1440) always fits u16
#[allow(clippy::cast_sign_loss)] // rem_euclid result is non-negative
pub fn wrap_minute(raw: i32) -> u16 {
    raw.rem_euclid(i32::from(MINUTES_PER_DAY)) as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn armed_config() -> ClockConfig {
        ClockConfig {
            alarm_armed: true,
            ..ClockConfig::default()
        }
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = ClockConfig::default();
        assert_eq!(cfg.mode, OperationMode::Idle);
        assert_eq!(cfg.brightness, 50);
        assert_eq!(cfg.hand_position, 0);
        assert_eq!(cfg.alarm_time, 420);
        assert!(!cfg.alarm_armed);
        assert!(!cfg.alarm_active);
        assert_eq!(cfg.alarm_start_min, None);
    }

    #[test]
    fn rings_at_alarm_time_when_armed() {
        let cfg = armed_config();
        assert!(cfg.should_ring(420, day()));
        assert!(!cfg.should_ring(421, day()));
    }

    #[test]
    fn never_rings_disarmed_or_already_ringing() {
        let mut cfg = ClockConfig::default();
        assert!(!cfg.should_ring(420, day()));
        cfg.alarm_armed = true;
        cfg.alarm_active = true;
        assert!(!cfg.should_ring(420, day()));
    }

    #[test]
    fn start_alarm_latches_minute_and_consumes_snooze() {
        let mut cfg = armed_config();
        cfg.snooze_until = Some(420);
        cfg.start_alarm(420);
        assert!(cfg.alarm_active);
        assert_eq!(cfg.alarm_start_min, Some(420));
        assert_eq!(cfg.last_ring_min, Some(420));
        assert_eq!(cfg.snooze_until, None);
    }

    #[test]
    fn stop_alarm_keeps_retrigger_guard_and_alarm_time() {
        let mut cfg = armed_config();
        cfg.start_alarm(420);
        cfg.stop_alarm();
        assert!(!cfg.alarm_active);
        assert_eq!(cfg.alarm_start_min, None);
        assert_eq!(cfg.alarm_time, 420);
        assert_eq!(cfg.last_ring_min, Some(420));
        // guard holds for the rest of this minute
        assert!(!cfg.should_ring(420, day()));
    }

    #[test]
    fn snooze_schedules_five_minutes_ahead() {
        let mut cfg = armed_config();
        cfg.start_alarm(420);
        cfg.snooze(421);
        assert_eq!(cfg.snooze_until, Some(426));
        assert!(!cfg.alarm_active);
        // resumes exactly at the snooze minute
        assert!(!cfg.should_ring(425, day()));
        assert!(cfg.should_ring(426, day()));
    }

    #[test]
    fn snooze_wraps_across_midnight() {
        let mut cfg = armed_config();
        cfg.start_alarm(1438);
        cfg.snooze(1438);
        assert_eq!(cfg.snooze_until, Some(3));
    }

    #[test]
    fn day_disable_suppresses_until_date_changes() {
        let mut cfg = armed_config();
        cfg.start_alarm(420);
        cfg.cancel_alarm_for_day(day());
        assert!(!cfg.alarm_active);
        assert_eq!(cfg.snooze_until, None);
        assert!(!cfg.should_ring(420, day()));
        let tomorrow = day().succ_opt().unwrap();
        // the guard expires with the next minute, the next day rings again
        assert!(cfg.expire_ring_guard(421));
        assert!(cfg.should_ring(420, tomorrow));
    }

    #[test]
    fn ring_guard_expires_only_after_the_minute_advances() {
        let mut cfg = armed_config();
        cfg.start_alarm(420);
        cfg.stop_alarm();
        // still inside minute 420, the guard holds
        assert!(!cfg.expire_ring_guard(420));
        assert!(!cfg.should_ring(420, day()));
        // one minute later the guard is consumed
        assert!(cfg.expire_ring_guard(421));
        assert_eq!(cfg.last_ring_min, None);
        // and a later day rings at the alarm minute again
        assert!(cfg.should_ring(420, day().succ_opt().unwrap()));
    }

    #[test]
    fn auto_cancel_after_ten_minutes() {
        let mut cfg = armed_config();
        cfg.alarm_active = true;
        cfg.alarm_start_min = Some(400);
        assert!(!cfg.auto_cancel_due(409));
        assert!(cfg.auto_cancel_due(410));
        assert!(cfg.auto_cancel_due(411));
    }

    #[test]
    fn auto_cancel_elapsed_wraps_midnight() {
        let mut cfg = armed_config();
        cfg.alarm_active = true;
        cfg.alarm_start_min = Some(1435);
        assert!(!cfg.auto_cancel_due(1444 % MINUTES_PER_DAY));
        assert!(cfg.auto_cancel_due(5));
    }

    #[test]
    fn brightness_clamps_at_both_ends() {
        let mut cfg = ClockConfig {
            brightness: 98,
            ..ClockConfig::default()
        };
        cfg.adjust_brightness(Rotation::Clockwise);
        assert_eq!(cfg.brightness, 100);
        cfg.brightness = 3;
        cfg.adjust_brightness(Rotation::CounterClockwise);
        assert_eq!(cfg.brightness, 0);
        cfg.adjust_brightness(Rotation::CounterClockwise);
        assert_eq!(cfg.brightness, 0);
    }

    #[test]
    fn hand_nudges_wrap_at_midnight() {
        let mut cfg = ClockConfig {
            hand_position: 1438,
            ..ClockConfig::default()
        };
        cfg.nudge_hand(Rotation::Clockwise);
        assert_eq!(cfg.hand_position, 3);
        cfg.hand_position = 2;
        cfg.nudge_hand(Rotation::CounterClockwise);
        assert_eq!(cfg.hand_position, 1437);
    }

    #[test]
    fn normalize_repairs_tampered_values() {
        let mut cfg = ClockConfig {
            brightness: 250,
            hand_position: 3000,
            alarm_time: 1500,
            alarm_start_min: Some(77),
            ..ClockConfig::default()
        };
        cfg.normalize();
        assert_eq!(cfg.brightness, 100);
        assert_eq!(cfg.hand_position, 3000 % 1440);
        assert_eq!(cfg.alarm_time, 60);
        // start minute without an active alarm is inconsistent, cleared
        assert_eq!(cfg.alarm_start_min, None);
    }

    #[test]
    fn mode_round_trips_through_json() {
        let cfg = ClockConfig {
            mode: OperationMode::SetAlarm,
            ..ClockConfig::default()
        };
        let text = serde_json::to_string(&cfg).unwrap();
        assert!(text.contains("\"set_alarm\""));
        let back: ClockConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back, cfg);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let back: ClockConfig = serde_json::from_str("{\"brightness\": 70}").unwrap();
        assert_eq!(back.brightness, 70);
        assert_eq!(back.alarm_time, 420);
        assert_eq!(back.mode, OperationMode::Idle);
    }
}
