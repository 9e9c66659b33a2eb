//! # Configuration persistence
//! This module contains the functionality to persist the clock configuration
//! on disk.
//!
//! The configuration lives in a single flat JSON file. Writes go to a
//! temporary file first and are renamed over the target, so a reader can
//! never observe a partially written record. Reads self-heal: a missing,
//! empty or corrupt file is silently replaced with defaults.

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::{Duration, Timer};
use log::{error, info, warn};

use crate::event::{Event, send_event};
use crate::state::ClockConfig;

/// Default location of the persisted record, beside the working directory
pub const CONFIG_PATH: &str = "config.json";

/// Delay before retrying a failed write once
const WRITE_RETRY_DELAY: Duration = Duration::from_millis(250);

/// Channel for configuration write commands
static PERSIST_CHANNEL: Channel<CriticalSectionRawMutex, ClockConfig, 1> = Channel::new();

/// Sends a configuration snapshot to be written to disk
pub async fn send_persist_command(config: ClockConfig) {
    PERSIST_CHANNEL.sender().send(config).await;
}

/// Waits for the next configuration write command
async fn wait_for_persist_command() -> ClockConfig {
    PERSIST_CHANNEL.receiver().receive().await
}

/// The JSON-file-backed configuration store.
pub struct ConfigStore {
    /// Path of the persisted record
    path: PathBuf,
    /// Serializes concurrent writers. Individual writes are atomic; a
    /// read-modify-write sequence around them is not.
    write_lock: Mutex<()>,
}

impl ConfigStore {
    /// New store over the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Read the persisted record. Never fails observably: a missing, empty or
    /// malformed file is rewritten with defaults and those are returned, and
    /// out-of-range values are normalized rather than trusted.
    pub fn read(&self) -> ClockConfig {
        match fs::read_to_string(&self.path) {
            Ok(text) => match serde_json::from_str::<ClockConfig>(&text) {
                Ok(mut config) => {
                    config.normalize();
                    config
                }
                Err(e) => {
                    warn!("config file is corrupt, rewriting defaults: {e}");
                    self.heal()
                }
            },
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no config file yet, writing defaults");
                self.heal()
            }
            Err(e) => {
                warn!("config file is unreadable, rewriting defaults: {e}");
                self.heal()
            }
        }
    }

    /// Rewrite defaults on disk, returning them regardless of write success
    fn heal(&self) -> ClockConfig {
        let defaults = ClockConfig::default();
        if let Err(e) = self.write(&defaults) {
            error!("could not rewrite default config: {e}");
        }
        defaults
    }

    /// Atomically replace the record: serialize to a temporary file in the
    /// same directory, then rename it over the target.
    pub fn write(&self, config: &ClockConfig) -> io::Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let text = serde_json::to_string_pretty(config)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)
    }
}

/// This task reads the configuration from disk once at startup and publishes
/// it on the event channel. After that, it serializes every write command to
/// the file; a failed write is retried once and then dropped, since the
/// in-memory state stays authoritative and the next mutation rewrites the
/// whole record.
#[embassy_executor::task]
pub async fn persist_handler(store: ConfigStore) {
    let config = store.read();
    info!("configuration loaded");
    send_event(Event::ConfigLoaded(config)).await;

    loop {
        let config = wait_for_persist_command().await;
        if let Err(e) = store.write(&config) {
            warn!("config write failed, retrying: {e}");
            Timer::after(WRITE_RETRY_DELAY).await;
            if let Err(e) = store.write(&config) {
                error!("config write failed twice, dropping update: {e}");
            }
        }
    }
}
