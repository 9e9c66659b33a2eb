//! # Display task
//! Hands screen requests to the external rendering collaborator. Requests are
//! fire-and-forget: each render runs on a throwaway thread so a slow e-paper
//! refresh never blocks the executor, and failures are logged and swallowed.
//! The task also redraws the main screen once per hour-boundary crossing,
//! which covers the startup refresh.

use std::sync::Arc;
use std::thread;

use anyhow::Result;
use chrono::{Local, Timelike};
use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Ticker};
use log::{debug, info, warn};

use crate::render::{Renderer, ScreenSnapshot};
use crate::state::CLOCK_STATE;

/// Interval between hour-boundary checks
const HOUR_CHECK: Duration = Duration::from_secs(60);

/// Signal carrying the latest display request; later requests win
static DISPLAY_SIGNAL: Signal<CriticalSectionRawMutex, DisplayRequest> = Signal::new();

/// Ask the display task for a screen
pub fn signal_display_request(request: DisplayRequest) {
    DISPLAY_SIGNAL.signal(request);
}

/// Wait for the next display request
async fn wait_for_display_request() -> DisplayRequest {
    DISPLAY_SIGNAL.wait().await
}

/// Screens the orchestrator can request
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum DisplayRequest {
    /// Calibration instructions
    Calibrate,
    /// Set-alarm screen with the current hand position
    SetAlarm {
        /// Hand position shown as the prospective alarm time
        hand_position: u16,
    },
    /// Main screen redraw
    Main,
}

/// Route one request to the matching renderer call
fn render(
    renderer: &dyn Renderer,
    request: DisplayRequest,
    snapshot: ScreenSnapshot,
) -> Result<()> {
    match request {
        DisplayRequest::Calibrate => renderer.show_calibrate(),
        DisplayRequest::SetAlarm { hand_position } => renderer.show_set_alarm(hand_position),
        DisplayRequest::Main => renderer.show_main(snapshot),
    }
}

/// Run one request on a throwaway thread, logging failures
fn dispatch(renderer: &Arc<dyn Renderer>, request: DisplayRequest, snapshot: ScreenSnapshot) {
    let renderer = Arc::clone(renderer);
    thread::spawn(move || {
        if let Err(e) = render(renderer.as_ref(), request, snapshot) {
            warn!("display request {request:?} failed: {e:#}");
        }
    });
}

/// Snapshot of the fields the main screen shows, `None` before state load
async fn main_snapshot() -> Option<ScreenSnapshot> {
    CLOCK_STATE.lock().await.as_ref().map(|config| ScreenSnapshot {
        alarm_time: config.alarm_time,
        alarm_armed: config.alarm_armed,
    })
}

/// This task serves display requests and the hourly main-screen redraw.
#[embassy_executor::task]
pub async fn display_handler(renderer: Arc<dyn Renderer>) {
    let mut ticker = Ticker::every(HOUR_CHECK);
    let mut last_hour: Option<u32> = None;
    info!("display task started");
    loop {
        let hour = Local::now().hour();
        if last_hour != Some(hour) {
            // latched only once state is loaded, so the startup redraw is
            // retried until the record arrives
            if let Some(snapshot) = main_snapshot().await {
                last_hour = Some(hour);
                dispatch(&renderer, DisplayRequest::Main, snapshot);
            }
        }
        if let Either::First(request) = select(wait_for_display_request(), ticker.next()).await {
            match main_snapshot().await {
                Some(snapshot) => dispatch(&renderer, request, snapshot),
                None => debug!("display request before state load, dropped"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    /// Renderer that records which screen was asked for
    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<String>>,
    }

    impl Renderer for RecordingRenderer {
        fn show_calibrate(&self) -> Result<()> {
            self.calls.lock().unwrap().push("calibrate".into());
            Ok(())
        }

        fn show_set_alarm(&self, hand_position: u16) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("set_alarm:{hand_position}"));
            Ok(())
        }

        fn show_main(&self, snapshot: ScreenSnapshot) -> Result<()> {
            self.calls
                .lock()
                .unwrap()
                .push(format!("main:{}", snapshot.alarm_time));
            Ok(())
        }
    }

    #[test]
    fn requests_route_to_their_screens() {
        let renderer = RecordingRenderer::default();
        let snapshot = ScreenSnapshot {
            alarm_time: 420,
            alarm_armed: true,
        };
        render(&renderer, DisplayRequest::Calibrate, snapshot).unwrap();
        render(
            &renderer,
            DisplayRequest::SetAlarm { hand_position: 90 },
            snapshot,
        )
        .unwrap();
        render(&renderer, DisplayRequest::Main, snapshot).unwrap();
        assert_eq!(
            *renderer.calls.lock().unwrap(),
            vec!["calibrate", "set_alarm:90", "main:420"]
        );
    }
}
