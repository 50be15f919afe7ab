//! Trigger configuration — what makes a recipe fire.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

use crate::command::validate_intensity;
use crate::error::{HubError, ValidationError};
use crate::id::{ButtonId, ZoneId};

/// Declarative description of a trigger. The application layer turns it
/// into a stateful trigger when the recipe is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerConfig {
    /// Fires after `press_count` presses of a button, all within `window_ms`.
    ButtonPress {
        button_id: ButtonId,
        #[serde(default = "default_press_count")]
        press_count: u32,
        /// Zero means presses never expire.
        #[serde(default)]
        window_ms: u64,
    },
    /// Fires when a zone reports a level inside `min..=max`, having been
    /// outside it before.
    ZoneLevel { zone_id: ZoneId, min: f64, max: f64 },
    /// Fires every `seconds`.
    Interval { seconds: u64 },
    /// Fires once a day at `at` (`"HH:MM"`, UTC).
    TimeOfDay { at: String },
}

fn default_press_count() -> u32 {
    1
}

impl TriggerConfig {
    /// Check invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] on a zero count or interval, an empty
    /// or out-of-range level window, or an unparsable time of day.
    pub fn validate(&self) -> Result<(), HubError> {
        match self {
            Self::ButtonPress { press_count, .. } => {
                if *press_count == 0 {
                    return Err(ValidationError::Zero("press_count").into());
                }
            }
            Self::ZoneLevel { min, max, .. } => {
                validate_intensity(*min)?;
                validate_intensity(*max)?;
                if min > max {
                    return Err(ValidationError::EmptyRange {
                        min: *min,
                        max: *max,
                    }
                    .into());
                }
            }
            Self::Interval { seconds } => {
                if *seconds == 0 {
                    return Err(ValidationError::Zero("seconds").into());
                }
            }
            Self::TimeOfDay { at } => {
                parse_time_of_day(at)?;
            }
        }
        Ok(())
    }
}

/// Parse an `"HH:MM"` time of day.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidTimeOfDay`] when the text is malformed.
pub fn parse_time_of_day(at: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(at, "%H:%M")
        .map_err(|_| ValidationError::InvalidTimeOfDay(at.to_string()))
}

impl std::fmt::Display for TriggerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ButtonPress {
                button_id,
                press_count,
                ..
            } => write!(f, "button_press({button_id}, x{press_count})"),
            Self::ZoneLevel { zone_id, min, max } => {
                write!(f, "zone_level({zone_id}, {min:.2}..={max:.2})")
            }
            Self::Interval { seconds } => write!(f, "interval({seconds}s)"),
            Self::TimeOfDay { at } => write!(f, "time_of_day({at})"),
        }
    }
}
