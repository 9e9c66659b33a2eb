//! Events and system channel for sending and receiving events

use chrono::NaiveDate;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::state::ClockConfig;

/// System event channel for sending and receiving events
pub static EVENT_CHANNEL: Channel<CriticalSectionRawMutex, Event, EVENT_CHANNEL_CAPACITY> =
    Channel::new();

/// The capacity of the event channel
const EVENT_CHANNEL_CAPACITY: usize = 10;

/// Sends an event to the system channel
pub async fn send_event(event: Event) {
    EVENT_CHANNEL.sender().send(event).await;
}

/// Receives the next event from the system channel
pub async fn receive_event() -> Event {
    EVENT_CHANNEL.receiver().receive().await
}

/// The event type used in the system, representing various system events
#[derive(PartialEq, Debug, Clone)]
pub enum Event {
    /// The persisted configuration was read at startup, the data is the record
    ConfigLoaded(ClockConfig),
    /// The rotary encoder push button was pressed, the data is the press kind
    EncoderButton(PressKind),
    /// The snooze button was pressed, the data is the press kind
    SnoozeButton(PressKind),
    /// The rotary encoder moved one detent, the data is the direction
    EncoderTick(Rotation),
    /// The scheduler has ticked, the data is the wall-clock snapshot
    ClockTick(TickSnapshot),
    /// The process received an interrupt and must shut down
    Shutdown,
}

/// Classified button press
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum PressKind {
    /// Released before the long-press threshold
    Short,
    /// Held past the long-press threshold; fired once per hold
    Long,
}

/// Rotation direction of one encoder detent
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Rotation {
    /// Clockwise, data line high on the falling clock edge
    Clockwise,
    /// Counter-clockwise, data line low on the falling clock edge
    CounterClockwise,
}

/// Wall-clock snapshot taken once per scheduler tick
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct TickSnapshot {
    /// Minutes since midnight, 0..=1439
    pub now_min: u16,
    /// Calendar date of the snapshot
    pub today: NaiveDate,
    /// Level of the physical arm switch at snapshot time
    pub armed: bool,
}
