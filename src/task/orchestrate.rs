//! # Orchestrate tasks
//! Task to orchestrate the state transitions of the system. It is the only
//! task that mutates the shared clock state; every change is forwarded to the
//! persistence task as a full snapshot, so lost-update races between loops
//! cannot occur.

use chrono::Local;
use embassy_time::{Duration, Timer};
use log::{debug, info, warn};

use crate::{
    event::{Event, PressKind, Rotation, TickSnapshot, receive_event},
    hal::StepDirection,
    hand::{HandTracker, forward_distance, steps_for_minutes, sync_plan},
    render::minute_text,
    state::{AUTO_CANCEL_MINUTES, CLOCK_STATE, ClockConfig, HAND_NUDGE_MINUTES, OperationMode},
    task::{
        buzzer::set_ringing,
        clock::minutes_of_day,
        display::{DisplayRequest, signal_display_request},
        fade::set_fading,
        persist::send_persist_command,
        shutdown::request_shutdown,
        stepper::{StepperCommand, send_stepper_command},
    },
};

/// Grace period between raising the shutdown flag and exiting, long enough
/// for every output task to run one more poll cycle and park its hardware
const SHUTDOWN_GRACE: Duration = Duration::from_millis(300);

/// This task is responsible for the state transitions of the system. It acts
/// as the main task of the system: it receives events from the other tasks
/// and reacts to them by changing the shared state.
#[embassy_executor::task]
pub async fn orchestrator() {
    info!("orchestrate task started");
    let mut tracker = HandTracker::new();

    loop {
        // receive the events, halting the task until an event is received
        let event = receive_event().await;

        // shutdown is handled without the state lock so blocked readers can
        // still run their final poll cycle
        if matches!(event, Event::Shutdown) {
            shutdown_and_exit().await;
        }

        let mut state_guard = CLOCK_STATE.lock().await;
        match event {
            Event::ConfigLoaded(config) => install_loaded_config(config, &mut state_guard),
            other => {
                let Some(config) = state_guard.as_mut() else {
                    warn!("event {other:?} arrived before the configuration load, dropped");
                    continue;
                };
                handle_event(other, config, &mut tracker).await;
            }
        }
    }
}

/// Installs the record read from disk and re-raises the signals a previous
/// run may have left set, so a restart mid-ring keeps ringing and a restart
/// mid-calibration keeps fading.
fn install_loaded_config(config: ClockConfig, slot: &mut Option<ClockConfig>) {
    info!(
        "configuration loaded: mode {:?}, alarm {} {}",
        config.mode,
        minute_text(config.alarm_time),
        if config.alarm_armed { "armed" } else { "disarmed" },
    );
    if config.alarm_active {
        set_ringing(true);
    }
    if config.mode != OperationMode::Idle {
        set_fading(true);
    }
    match config.mode {
        OperationMode::Calibrate => signal_display_request(DisplayRequest::Calibrate),
        OperationMode::SetAlarm => signal_display_request(DisplayRequest::SetAlarm {
            hand_position: config.hand_position,
        }),
        OperationMode::Idle => {}
    }
    *slot = Some(config);
}

/// Handles a single event by updating the shared state and signaling the
/// appropriate tasks.
async fn handle_event(event: Event, config: &mut ClockConfig, tracker: &mut HandTracker) {
    match event {
        Event::EncoderButton(PressKind::Long) => {
            handle_encoder_long_press(config, tracker).await;
        }
        Event::EncoderButton(PressKind::Short) => {
            handle_encoder_short_press(config).await;
        }
        Event::SnoozeButton(kind) => {
            handle_snooze_button(config, kind).await;
        }
        Event::EncoderTick(rotation) => {
            handle_encoder_tick(config, rotation).await;
        }
        Event::ClockTick(tick) => {
            handle_clock_tick(config, tracker, tick).await;
        }
        // both are consumed by the orchestrator loop before dispatch
        Event::ConfigLoaded(_) | Event::Shutdown => {}
    }
}

/// Handle state changes when the encoder button is long-pressed: the mode
/// cycle between idle and the two hand-moving modes.
async fn handle_encoder_long_press(config: &mut ClockConfig, tracker: &mut HandTracker) {
    match config.mode {
        OperationMode::Idle => {
            config.mode = OperationMode::Calibrate;
            set_fading(true);
            signal_display_request(DisplayRequest::Calibrate);
            info!("calibrate mode, align the hands to 12:00");
        }
        OperationMode::Calibrate => {
            // the hands physically point at 12:00 now, that is the reference
            config.hand_position = 0;
            send_persist_command(config.clone()).await;
            sync_hand_to_now(config, tracker).await;
            leave_to_idle(config);
            info!(
                "calibration done, hands synced to {}",
                minute_text(config.hand_position)
            );
        }
        OperationMode::SetAlarm => {
            config.alarm_time = config.hand_position;
            send_persist_command(config.clone()).await;
            sync_hand_to_now(config, tracker).await;
            leave_to_idle(config);
            info!("alarm time set to {}", minute_text(config.alarm_time));
        }
    }
    send_persist_command(config.clone()).await;
}

/// Handle state changes when the encoder button is short-pressed: stops a
/// ringing alarm, otherwise redraws the main screen in idle mode.
async fn handle_encoder_short_press(config: &mut ClockConfig) {
    if config.alarm_active {
        config.stop_alarm();
        set_ringing(false);
        send_persist_command(config.clone()).await;
        info!("alarm stopped");
    } else if config.mode == OperationMode::Idle {
        signal_display_request(DisplayRequest::Main);
    }
}

/// Handle state changes when the snooze button is pressed. While ringing a
/// short press snoozes and a long press cancels for the day; while quiet a
/// long press in idle mode enters set-alarm mode and a short press is
/// ignored.
async fn handle_snooze_button(config: &mut ClockConfig, kind: PressKind) {
    if config.alarm_active {
        let now = Local::now();
        match kind {
            PressKind::Short => {
                config.snooze(minutes_of_day(&now));
                set_ringing(false);
                if let Some(until) = config.snooze_until {
                    info!("snoozed until {}", minute_text(until));
                }
            }
            PressKind::Long => {
                config.cancel_alarm_for_day(now.date_naive());
                set_ringing(false);
                info!("alarm cancelled for the day");
            }
        }
        send_persist_command(config.clone()).await;
    } else if kind == PressKind::Long && config.mode == OperationMode::Idle {
        config.mode = OperationMode::SetAlarm;
        set_fading(true);
        signal_display_request(DisplayRequest::SetAlarm {
            hand_position: config.hand_position,
        });
        send_persist_command(config.clone()).await;
        info!("set-alarm mode, dial in the new alarm time");
    }
}

/// Handle one encoder detent. In the hand-moving modes it nudges the hands
/// five minutes per detent, in idle mode it adjusts the backlight brightness.
async fn handle_encoder_tick(config: &mut ClockConfig, rotation: Rotation) {
    match config.mode {
        OperationMode::Calibrate | OperationMode::SetAlarm => {
            config.nudge_hand(rotation);
            let direction = match rotation {
                Rotation::Clockwise => StepDirection::Forward,
                Rotation::CounterClockwise => StepDirection::Backward,
            };
            send_stepper_command(StepperCommand::Move {
                steps: steps_for_minutes(HAND_NUDGE_MINUTES),
                direction,
            })
            .await;
            if config.mode == OperationMode::SetAlarm {
                signal_display_request(DisplayRequest::SetAlarm {
                    hand_position: config.hand_position,
                });
            }
        }
        OperationMode::Idle => {
            config.adjust_brightness(rotation);
            debug!("brightness {}", config.brightness);
        }
    }
    send_persist_command(config.clone()).await;
}

/// Handle one scheduler tick: mirror the arm switch, let the hands follow
/// wall-clock time and evaluate the alarm.
async fn handle_clock_tick(
    config: &mut ClockConfig,
    tracker: &mut HandTracker,
    tick: TickSnapshot,
) {
    if config.alarm_armed != tick.armed {
        config.alarm_armed = tick.armed;
        send_persist_command(config.clone()).await;
        info!("alarm {}", if tick.armed { "armed" } else { "disarmed" });
    }

    // while the alarm time is being dialed in, the hands must not move on
    // their own and the scheduler holds off
    if config.mode == OperationMode::SetAlarm {
        return;
    }

    // in calibrate mode the hands are under manual control, skip the follow
    if config.mode == OperationMode::Idle && config.hand_position != tick.now_min {
        let minutes = forward_distance(config.hand_position, tick.now_min);
        let steps = tracker.advance_minutes(minutes);
        if steps > 0 {
            send_stepper_command(StepperCommand::Move {
                steps,
                direction: StepDirection::Forward,
            })
            .await;
        }
        config.hand_position = tick.now_min;
        send_persist_command(config.clone()).await;
    }

    if config.expire_ring_guard(tick.now_min) {
        send_persist_command(config.clone()).await;
    }

    if config.should_ring(tick.now_min, tick.today) {
        config.start_alarm(tick.now_min);
        set_ringing(true);
        send_persist_command(config.clone()).await;
        info!("alarm ringing at {}", minute_text(tick.now_min));
    }

    if config.auto_cancel_due(tick.now_min) {
        config.cancel_alarm_for_day(tick.today);
        set_ringing(false);
        send_persist_command(config.clone()).await;
        warn!("alarm unanswered for {AUTO_CANCEL_MINUTES} minutes, cancelled for the day");
    }
}

/// Move the hands from their recorded position to the current wall-clock
/// minute over the shortest path and make that the new reference.
async fn sync_hand_to_now(config: &mut ClockConfig, tracker: &mut HandTracker) {
    let now_min = minutes_of_day(&Local::now());
    let plan = sync_plan(config.hand_position, now_min);
    if plan.steps > 0 {
        send_stepper_command(StepperCommand::Move {
            steps: plan.steps,
            direction: plan.direction,
        })
        .await;
    }
    config.hand_position = now_min;
    // the rounded sync re-references the hands, any carried remainder is stale
    *tracker = HandTracker::new();
    debug!("hands synced over {} minutes", plan.minutes);
}

/// Return to idle mode, stopping the fade and redrawing the main screen.
fn leave_to_idle(config: &mut ClockConfig) {
    config.mode = OperationMode::Idle;
    set_fading(false);
    signal_display_request(DisplayRequest::Main);
}

/// Park every output and end the process. The signals are lowered and the
/// shutdown flag raised first, then the grace period gives each output task
/// one more poll cycle to drive its hardware to a safe state.
async fn shutdown_and_exit() {
    info!("interrupt received, parking outputs");
    set_ringing(false);
    set_fading(false);
    request_shutdown();
    send_stepper_command(StepperCommand::Release).await;
    Timer::after(SHUTDOWN_GRACE).await;
    info!("outputs parked, exiting");
    std::process::exit(0);
}
