//! # Process lifecycle
//! SIGINT/SIGTERM handling. A watcher task polls the flag registered with the
//! process signal handlers and reports it as a shutdown event; once the
//! orchestrator has seen that event it raises the crate-wide shutdown flag,
//! which every output task observes to drive its hardware to a safe state
//! before the process exits.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use embassy_time::{Duration, Ticker};
use log::info;

use crate::event::{Event, send_event};

/// Poll interval for the interrupt flag
const SIGNAL_POLL: Duration = Duration::from_millis(200);

/// Raised exactly once by the orchestrator when the process must exit
static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Ask every output task to drive its hardware to a safe state
pub fn request_shutdown() {
    SHUTDOWN.store(true, Ordering::Relaxed);
}

/// Whether shutdown has been requested
pub fn shutdown_requested() -> bool {
    SHUTDOWN.load(Ordering::Relaxed)
}

/// Register an interrupt flag with the process signal handlers
pub fn register_interrupt_flag() -> io::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&flag))?;
    signal_hook::flag::register(signal_hook::consts::SIGTERM, Arc::clone(&flag))?;
    Ok(flag)
}

/// This task watches the interrupt flag and reports it as a shutdown event.
#[embassy_executor::task]
pub async fn signal_watcher(interrupt: Arc<AtomicBool>) {
    let mut ticker = Ticker::every(SIGNAL_POLL);
    info!("signal watcher task started");
    loop {
        if interrupt.load(Ordering::Relaxed) {
            info!("interrupt received, shutting down");
            send_event(Event::Shutdown).await;
            return;
        }
        ticker.next().await;
    }
}
