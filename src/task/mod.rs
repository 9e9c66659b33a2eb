//! Tasks that make up the application.
pub mod buttons;
pub mod buzzer;
pub mod clock;
pub mod display;
pub mod encoder;
pub mod fade;
pub mod indicator;
pub mod orchestrate;
pub mod persist;
pub mod shutdown;
pub mod stepper;
