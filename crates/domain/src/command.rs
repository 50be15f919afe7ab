//! Commands — outbound intents and their rendered wire form.
//!
//! A [`CommandIntent`] names *what* should happen using global ids. A
//! protocol adapter resolves the ids against its device tables and renders
//! the intent into a [`Command`], which carries both a human-readable
//! description and the exact bytes to put on the wire. Parsed inbound frames
//! are represented with the same [`Command`] type.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::{ButtonId, DeviceId, ZoneId};

/// Lowest accepted zone intensity, in percent.
pub const MIN_INTENSITY: f64 = 0.0;
/// Highest accepted zone intensity, in percent.
pub const MAX_INTENSITY: f64 = 100.0;

/// Check that an intensity is a finite percentage.
///
/// # Errors
///
/// Returns [`ValidationError::IntensityOutOfRange`] otherwise.
pub fn validate_intensity(intensity: f64) -> Result<(), ValidationError> {
    if intensity.is_finite() && (MIN_INTENSITY..=MAX_INTENSITY).contains(&intensity) {
        Ok(())
    } else {
        Err(ValidationError::IntensityOutOfRange(intensity))
    }
}

/// Abstract outbound request, independent of any wire protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandIntent {
    SetZoneLevel { zone_id: ZoneId, intensity: f64 },
    PressButton { device_id: DeviceId, button_id: ButtonId },
    ReleaseButton { device_id: DeviceId, button_id: ButtonId },
}

impl fmt::Display for CommandIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SetZoneLevel { zone_id, intensity } => {
                write!(f, "set_zone_level({zone_id}, {intensity:.2})")
            }
            Self::PressButton { button_id, .. } => write!(f, "press_button({button_id})"),
            Self::ReleaseButton { button_id, .. } => write!(f, "release_button({button_id})"),
        }
    }
}

impl CommandIntent {
    /// The command kind this intent renders to.
    #[must_use]
    pub fn to_kind(&self) -> CommandKind {
        match *self {
            Self::SetZoneLevel { zone_id, intensity } => {
                CommandKind::ZoneSetLevel { zone_id, intensity }
            }
            Self::PressButton {
                device_id,
                button_id,
            } => CommandKind::ButtonPress {
                device_id,
                button_id,
            },
            Self::ReleaseButton {
                device_id,
                button_id,
            } => CommandKind::ButtonRelease {
                device_id,
                button_id,
            },
        }
    }
}

/// What a [`Command`] does, with every reference resolved to a global id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CommandKind {
    ZoneSetLevel {
        zone_id: ZoneId,
        intensity: f64,
    },
    ButtonPress {
        device_id: DeviceId,
        button_id: ButtonId,
    },
    ButtonRelease {
        device_id: DeviceId,
        button_id: ButtonId,
    },
}

impl CommandKind {
    /// The intent that would reproduce this command.
    #[must_use]
    pub fn to_intent(&self) -> CommandIntent {
        match *self {
            Self::ZoneSetLevel { zone_id, intensity } => {
                CommandIntent::SetZoneLevel { zone_id, intensity }
            }
            Self::ButtonPress {
                device_id,
                button_id,
            } => CommandIntent::PressButton {
                device_id,
                button_id,
            },
            Self::ButtonRelease {
                device_id,
                button_id,
            } => CommandIntent::ReleaseButton {
                device_id,
                button_id,
            },
        }
    }
}

/// A fully rendered command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub kind: CommandKind,
    /// Human-readable description for logs and UIs.
    pub description: String,
    /// Exact wire encoding, terminator included.
    pub wire: String,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.description)
    }
}
