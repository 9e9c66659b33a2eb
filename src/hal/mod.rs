//! # Hardware abstraction
//! Small trait seam between the control core and the board wiring. The core
//! consumes capabilities (inputs, a step-wise stepper, a PWM dimmer, an RGB
//! indicator, plain digital outputs) and never touches pin registers itself.
//! A simulated backend lives in [`sim`] so the daemon and the tests run on
//! any host.

pub mod sim;

pub use smart_leds::RGB8;

/// Direction of stepper travel, clockwise when viewed from the dial
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StepDirection {
    /// Hands advance, clockwise
    Forward,
    /// Hands retreat, counter-clockwise
    Backward,
}

/// A pull-up, active-low digital input such as a button or switch
pub trait InputPin {
    /// True while the line is pulled low (pressed / switched on)
    fn is_low(&self) -> bool;
}

/// A plain digital output such as the piezo line or the PM lamp
pub trait OutputPin {
    /// Drive the line high
    fn set_high(&mut self);
    /// Drive the line low
    fn set_low(&mut self);
}

/// The four-coil stepper behind a step-wise interface.
///
/// One `step` advances the hands by 1/512 of a revolution; pacing between
/// steps is the caller's business so coil timing never blocks the executor.
pub trait StepperDrive {
    /// Advance one step in the given direction
    fn step(&mut self, direction: StepDirection);
    /// De-energize all coils
    fn release(&mut self);
}

/// The PWM-dimmable dial backlight
pub trait PwmDimmer {
    /// Set the duty cycle in percent, 0.0..=100.0
    fn set_duty_percent(&mut self, percent: f32);
    /// Stop the PWM output entirely
    fn release(&mut self);
}

/// The addressable RGB indicator light
pub trait RgbIndicator {
    /// Show a color at a global brightness in 0.0..=1.0
    fn set(&mut self, color: RGB8, brightness: f32);
    /// Turn the light off
    fn off(&mut self);
}
