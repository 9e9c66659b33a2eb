//! # Hand position tracking
//! Converts minute deltas into motor step counts. A fractional accumulator
//! carries sub-step remainders across calls so the hands never drift from
//! rounding, and manual syncs plan the shortest rotation path around the
//! dial.

use crate::hal::StepDirection;
use crate::state::MINUTES_PER_DAY;

/// Motor steps per full revolution of the minute hand
pub const STEPS_PER_REVOLUTION: u32 = 512;
/// Minutes per full revolution of the minute hand
pub const MINUTES_PER_REVOLUTION: u32 = 60;
/// Steps credited per minute of travel
#[allow(clippy::cast_precision_loss)] // both constants are far below 2^52
const STEPS_PER_MINUTE: f64 = STEPS_PER_REVOLUTION as f64 / MINUTES_PER_REVOLUTION as f64;

/// Running remainder for continuous forward travel.
///
/// Held by the orchestrator for the process lifetime; one tracker per motor.
#[derive(Debug, Default)]
pub struct HandTracker {
    /// Fractional steps earned but not yet moved, always in [0, 1)
    accumulator: f64,
}

impl HandTracker {
    /// New tracker with an empty remainder
    pub const fn new() -> Self {
        Self { accumulator: 0.0 }
    }

    /// Credit forward travel and return the whole steps to move now.
    ///
    /// The fractional remainder stays in the tracker, so sixty one-minute
    /// calls move exactly one revolution.
    #[allow(clippy::cast_possible_truncation)] // floor of a small non-negative value
    #[allow(clippy::cast_sign_loss)] // accumulator is never negative
    pub fn advance_minutes(&mut self, minutes: u16) -> u32 {
        self.accumulator += STEPS_PER_MINUTE * f64::from(minutes);
        let whole = self.accumulator.floor();
        self.accumulator -= whole;
        whole as u32
    }
}

/// A planned manual sync movement
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct SyncPlan {
    /// Which way around the dial to travel
    pub direction: StepDirection,
    /// Dial distance covered, in minutes
    pub minutes: u16,
    /// Motor steps to issue
    pub steps: u32,
}

/// Plan the shortest rotation from `current` to `target` minute positions.
///
/// Ties between the two directions resolve forward.
pub fn sync_plan(current: u16, target: u16) -> SyncPlan {
    let forward = forward_distance(current, target);
    let backward = forward_distance(target, current);
    let (direction, minutes) = if backward < forward {
        (StepDirection::Backward, backward)
    } else {
        (StepDirection::Forward, forward)
    };
    SyncPlan {
        direction,
        minutes,
        steps: steps_for_minutes(minutes),
    }
}

/// Forward dial distance from one minute position to another
pub fn forward_distance(from: u16, to: u16) -> u16 {
    (to + MINUTES_PER_DAY - from) % MINUTES_PER_DAY
}

/// Rounded step count for a dial distance in minutes
#[allow(clippy::cast_possible_truncation)] // bounded by 1439 minutes of travel
#[allow(clippy::cast_sign_loss)] // round of a non-negative value
pub fn steps_for_minutes(minutes: u16) -> u32 {
    (STEPS_PER_MINUTE * f64::from(minutes)).round() as u32
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn one_hour_of_single_minutes_is_one_revolution() {
        let mut tracker = HandTracker::new();
        let total: u32 = (0..60).map(|_| tracker.advance_minutes(1)).sum();
        assert_eq!(total, STEPS_PER_REVOLUTION);
    }

    #[test]
    fn remainder_carries_between_calls() {
        let mut tracker = HandTracker::new();
        // 512/60 = 8.533..; the first call moves 8, the remainder tips the
        // third call to 9
        assert_eq!(tracker.advance_minutes(1), 8);
        assert_eq!(tracker.advance_minutes(1), 9);
        assert_eq!(tracker.advance_minutes(1), 8);
    }

    #[test]
    fn zero_minutes_moves_nothing() {
        let mut tracker = HandTracker::new();
        assert_eq!(tracker.advance_minutes(0), 0);
    }

    #[test]
    fn sync_wraps_forward_over_midnight() {
        let plan = sync_plan(1430, 10);
        assert_eq!(plan.direction, StepDirection::Forward);
        assert_eq!(plan.minutes, 20);
        assert_eq!(plan.steps, 171);
    }

    #[test]
    fn sync_goes_backward_when_shorter() {
        let plan = sync_plan(10, 1430);
        assert_eq!(plan.direction, StepDirection::Backward);
        assert_eq!(plan.minutes, 20);
        assert_eq!(plan.steps, 171);
    }

    #[test]
    fn half_dial_tie_resolves_forward() {
        let plan = sync_plan(0, 720);
        assert_eq!(plan.direction, StepDirection::Forward);
        assert_eq!(plan.minutes, 720);
    }

    #[test]
    fn aligned_positions_plan_no_movement() {
        let plan = sync_plan(300, 300);
        assert_eq!(plan.steps, 0);
        assert_eq!(plan.minutes, 0);
    }

    #[test]
    fn five_minute_nudge_is_43_steps() {
        assert_eq!(steps_for_minutes(5), 43);
    }

    proptest! {
        #[test]
        fn sync_always_takes_the_shorter_arc(current in 0u16..1440, target in 0u16..1440) {
            let plan = sync_plan(current, target);
            let forward = forward_distance(current, target);
            let backward = forward_distance(target, current);
            prop_assert_eq!(u32::from(plan.minutes), u32::from(forward.min(backward)));
            match plan.direction {
                StepDirection::Forward => prop_assert!(forward <= backward),
                StepDirection::Backward => prop_assert!(backward < forward),
            }
            let expected = (f64::from(STEPS_PER_REVOLUTION) / f64::from(MINUTES_PER_REVOLUTION)
                * f64::from(plan.minutes))
            .round();
            prop_assert_eq!(f64::from(plan.steps), expected);
        }

        #[test]
        fn accumulator_remainder_stays_sub_step(minutes in proptest::collection::vec(0u16..1440, 1..40)) {
            let mut tracker = HandTracker::new();
            let mut moved: u64 = 0;
            let mut credited: f64 = 0.0;
            for m in minutes {
                moved += u64::from(tracker.advance_minutes(m));
                credited += f64::from(STEPS_PER_REVOLUTION) / f64::from(MINUTES_PER_REVOLUTION)
                    * f64::from(m);
            }
            // moved steps never drift more than one step from the exact credit
            #[allow(clippy::cast_precision_loss)]
            let drift = credited - moved as f64;
            prop_assert!((0.0..1.0).contains(&drift));
        }
    }
}
