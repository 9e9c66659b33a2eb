//! # Stepper task
//! Owns the hand drive motor. Movement commands arrive on a channel and are
//! executed one paced step at a time, so a multi-second sync never starves
//! the other tasks. Commands run in arrival order; the hand position the
//! orchestrator records therefore matches the physical position once the
//! queue drains.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use log::{debug, info};

use crate::hal::{StepDirection, StepperDrive};
use crate::task::shutdown::shutdown_requested;

/// Pause between individual steps
const STEP_INTERVAL: Duration = Duration::from_millis(3);

/// Capacity of the movement queue; sends back-pressure briefly when full
const STEPPER_CHANNEL_CAPACITY: usize = 8;

/// Channel for movement commands
static STEPPER_CHANNEL: Channel<CriticalSectionRawMutex, StepperCommand, STEPPER_CHANNEL_CAPACITY> =
    Channel::new();

/// Queue a movement command for the stepper task
pub async fn send_stepper_command(command: StepperCommand) {
    STEPPER_CHANNEL.sender().send(command).await;
}

/// Wait for the next movement command
async fn wait_for_stepper_command() -> StepperCommand {
    STEPPER_CHANNEL.receiver().receive().await
}

/// Commands accepted by the stepper task
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum StepperCommand {
    /// Travel a number of steps in a direction
    Move {
        /// Steps to travel
        steps: u32,
        /// Direction of travel
        direction: StepDirection,
    },
    /// De-energize the coils
    Release,
}

/// This task drives the hand stepper, one paced step at a time.
#[embassy_executor::task]
pub async fn stepper_handler(mut motor: Box<dyn StepperDrive>) {
    info!("stepper task started");
    loop {
        match wait_for_stepper_command().await {
            StepperCommand::Move { steps, direction } => {
                if steps == 0 {
                    continue;
                }
                debug!("stepper: {steps} steps {direction:?}");
                for _ in 0..steps {
                    if shutdown_requested() {
                        motor.release();
                        info!("stepper: released on shutdown");
                        return;
                    }
                    motor.step(direction);
                    Timer::after(STEP_INTERVAL).await;
                }
            }
            StepperCommand::Release => motor.release(),
        }
    }
}
