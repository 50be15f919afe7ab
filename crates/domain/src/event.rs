//! Event — an immutable record of something observed on a device.
//!
//! Events are produced by protocol streamers from inbound frames and fanned
//! out to recipes through the event bus.

use serde::{Deserialize, Serialize};

use crate::command::{Command, CommandKind};
use crate::id::{ButtonId, DeviceId, EventId, ZoneId};
use crate::time::{Timestamp, now};

/// Classification tag of the frame an event was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    ZoneUpdate,
    DeviceButton,
    Unknown,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::ZoneUpdate => "zone_update",
            Self::DeviceButton => "device_button",
            Self::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Something that was observed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    /// Device whose connection produced the frame.
    pub device_id: DeviceId,
    pub kind: EventKind,
    /// Parsed command, when the frame could be classified.
    pub command: Option<Command>,
    /// Original frame text, terminator included.
    pub raw: String,
    pub timestamp: Timestamp,
}

impl Event {
    /// Create a new event stamped with the current time.
    #[must_use]
    pub fn new(
        device_id: DeviceId,
        kind: EventKind,
        command: Option<Command>,
        raw: impl Into<String>,
    ) -> Self {
        Self {
            id: EventId::new(),
            device_id,
            kind,
            command,
            raw: raw.into(),
            timestamp: now(),
        }
    }

    /// Zone id and reported intensity, for zone level updates.
    #[must_use]
    pub fn zone_level(&self) -> Option<(ZoneId, f64)> {
        match self.command.as_ref()?.kind {
            CommandKind::ZoneSetLevel { zone_id, intensity } => Some((zone_id, intensity)),
            _ => None,
        }
    }

    /// Button id, for button presses.
    #[must_use]
    pub fn pressed_button(&self) -> Option<ButtonId> {
        match self.command.as_ref()?.kind {
            CommandKind::ButtonPress { button_id, .. } => Some(button_id),
            _ => None,
        }
    }

    /// Button id, for button releases.
    #[must_use]
    pub fn released_button(&self) -> Option<ButtonId> {
        match self.command.as_ref()?.kind {
            CommandKind::ButtonRelease { button_id, .. } => Some(button_id),
            _ => None,
        }
    }
}
