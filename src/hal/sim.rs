//! # Simulated board
//! In-memory implementations of the hardware traits. The daemon wires these
//! up by default so it runs on any host; tests use the shared handles to
//! script inputs and observe outputs. A real GPIO backend plugs in behind the
//! same traits without touching the control core.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, Ordering};

use log::debug;

use super::{InputPin, OutputPin, PwmDimmer, RGB8, RgbIndicator, StepDirection, StepperDrive};

/// A scriptable active-low input line
#[derive(Clone, Default)]
pub struct SimInput {
    /// True while the simulated line is pulled low
    low: Arc<AtomicBool>,
}

impl SimInput {
    /// New line, released (pulled high)
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive the simulated line low (pressed) or high (released)
    pub fn set_low(&self, low: bool) {
        self.low.store(low, Ordering::Relaxed);
    }
}

impl InputPin for SimInput {
    fn is_low(&self) -> bool {
        self.low.load(Ordering::Relaxed)
    }
}

/// An observable digital output line
#[derive(Clone, Default)]
pub struct SimOutput {
    /// True while the simulated line is driven high
    high: Arc<AtomicBool>,
}

impl SimOutput {
    /// New line, low
    pub fn new() -> Self {
        Self::default()
    }

    /// Current line level
    pub fn is_high(&self) -> bool {
        self.high.load(Ordering::Relaxed)
    }
}

impl OutputPin for SimOutput {
    fn set_high(&mut self) {
        self.high.store(true, Ordering::Relaxed);
    }

    fn set_low(&mut self) {
        self.high.store(false, Ordering::Relaxed);
    }
}

/// A stepper that records its net position in steps
#[derive(Clone, Default)]
pub struct SimStepper {
    /// Net steps travelled, forward positive
    position: Arc<AtomicI64>,
}

impl SimStepper {
    /// New stepper at position zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Net steps travelled since start, forward positive
    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }
}

impl StepperDrive for SimStepper {
    fn step(&mut self, direction: StepDirection) {
        let delta = match direction {
            StepDirection::Forward => 1,
            StepDirection::Backward => -1,
        };
        self.position.fetch_add(delta, Ordering::Relaxed);
    }

    fn release(&mut self) {
        debug!("sim stepper: coils released");
    }
}

/// A PWM channel that records its duty cycle
#[derive(Clone, Default)]
pub struct SimPwm {
    /// Current duty in percent, stored as f32 bits
    duty_bits: Arc<AtomicU32>,
    /// True after `release`
    released: Arc<AtomicBool>,
}

impl SimPwm {
    /// New channel at zero duty
    pub fn new() -> Self {
        Self::default()
    }

    /// Last duty cycle applied in percent
    pub fn duty_percent(&self) -> f32 {
        f32::from_bits(self.duty_bits.load(Ordering::Relaxed))
    }

    /// Whether the channel was released
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }
}

impl PwmDimmer for SimPwm {
    fn set_duty_percent(&mut self, percent: f32) {
        self.duty_bits
            .store(percent.clamp(0.0, 100.0).to_bits(), Ordering::Relaxed);
        self.released.store(false, Ordering::Relaxed);
    }

    fn release(&mut self) {
        self.duty_bits.store(0f32.to_bits(), Ordering::Relaxed);
        self.released.store(true, Ordering::Relaxed);
        debug!("sim pwm: released");
    }
}

/// An RGB light that records the last color and brightness shown
#[derive(Clone, Default)]
pub struct SimRgb {
    /// Last color as 0x00RRGGBB, only meaningful while `lit`
    color: Arc<AtomicU32>,
    /// Last global brightness in thousandths
    brightness_milli: Arc<AtomicU32>,
    /// True while the light is on
    lit: Arc<AtomicBool>,
}

impl SimRgb {
    /// New light, off
    pub fn new() -> Self {
        Self::default()
    }

    /// Last color and brightness shown, `None` while off
    pub fn shown(&self) -> Option<(RGB8, f32)> {
        if !self.lit.load(Ordering::Relaxed) {
            return None;
        }
        let packed = self.color.load(Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)] // each channel is masked to 8 bits
        let color = RGB8::new(
            ((packed >> 16) & 0xff) as u8,
            ((packed >> 8) & 0xff) as u8,
            (packed & 0xff) as u8,
        );
        #[allow(clippy::cast_precision_loss)] // thousandths of a unit interval
        let brightness = self.brightness_milli.load(Ordering::Relaxed) as f32 / 1000.0;
        Some((color, brightness))
    }
}

impl RgbIndicator for SimRgb {
    fn set(&mut self, color: RGB8, brightness: f32) {
        let packed = (u32::from(color.r) << 16) | (u32::from(color.g) << 8) | u32::from(color.b);
        self.color.store(packed, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation)] // clamped to 0..=1000
        #[allow(clippy::cast_sign_loss)] // clamped to non-negative
        self.brightness_milli.store(
            (brightness.clamp(0.0, 1.0) * 1000.0).round() as u32,
            Ordering::Relaxed,
        );
        self.lit.store(true, Ordering::Relaxed);
    }

    fn off(&mut self) {
        self.lit.store(false, Ordering::Relaxed);
    }
}

/// The full simulated board, one field per wired capability.
///
/// Every part is a cheap clone handle onto shared state, so the board can be
/// split into task arguments while the caller keeps handles for scripting.
#[derive(Clone, Default)]
pub struct SimBoard {
    /// Rotary encoder clock line
    pub encoder_clk: SimInput,
    /// Rotary encoder data line
    pub encoder_dt: SimInput,
    /// Rotary encoder push button
    pub encoder_button: SimInput,
    /// Snooze button
    pub snooze_button: SimInput,
    /// Physical alarm arm switch
    pub arm_switch: SimInput,
    /// Hand drive stepper
    pub stepper: SimStepper,
    /// Dial backlight PWM
    pub dimmer: SimPwm,
    /// Armed-state RGB indicator
    pub indicator: SimRgb,
    /// Piezo buzzer line
    pub buzzer: SimOutput,
    /// PM half-of-day lamp
    pub pm_lamp: SimOutput,
}

impl SimBoard {
    /// New board with all inputs released and all outputs off
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stepper_tracks_net_position() {
        let board = SimBoard::new();
        let mut motor = board.stepper.clone();
        for _ in 0..5 {
            motor.step(StepDirection::Forward);
        }
        motor.step(StepDirection::Backward);
        assert_eq!(board.stepper.position(), 4);
    }

    #[test]
    fn input_handle_scripts_the_line() {
        let board = SimBoard::new();
        assert!(!board.encoder_button.is_low());
        board.encoder_button.set_low(true);
        assert!(board.encoder_button.is_low());
    }

    #[test]
    fn rgb_reports_last_shown_color() {
        let mut light = SimRgb::new();
        assert_eq!(light.shown(), None);
        light.set(RGB8::new(255, 255, 0), 0.5);
        let (color, brightness) = light.shown().unwrap();
        assert_eq!((color.r, color.g, color.b), (255, 255, 0));
        assert!((brightness - 0.5).abs() < 1e-3);
        light.off();
        assert_eq!(light.shown(), None);
    }
}
