//! Action configuration — what a recipe does when it fires.

use serde::{Deserialize, Serialize};

use crate::command::validate_intensity;
use crate::error::HubError;
use crate::id::{ButtonId, DeviceId, ZoneId};

/// Declarative description of a recipe action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionConfig {
    /// Drive a zone to an intensity (0–100).
    SetZoneLevel { zone_id: ZoneId, intensity: f64 },
    /// Press then release a button, e.g. a hub's scene button.
    PressButton {
        device_id: DeviceId,
        button_id: ButtonId,
    },
    /// Release a button without pressing it first.
    ReleaseButton {
        device_id: DeviceId,
        button_id: ButtonId,
    },
}

impl ActionConfig {
    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when a zone intensity is out of range.
    pub fn validate(&self) -> Result<(), HubError> {
        if let Self::SetZoneLevel { intensity, .. } = self {
            validate_intensity(*intensity)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for ActionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SetZoneLevel { zone_id, intensity } => {
                write!(f, "set_zone_level({zone_id}, {intensity:.2})")
            }
            Self::PressButton { button_id, .. } => write!(f, "press_button({button_id})"),
            Self::ReleaseButton { button_id, .. } => write!(f, "release_button({button_id})"),
        }
    }
}
