//! Button — a physical or virtual control point on a device.

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::{ButtonId, DeviceId};

/// A control point such as a keypad button or a hub's phantom scene button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub id: ButtonId,
    /// Button number on the owning device (e.g. `"3"`).
    pub local_id: String,
    pub name: String,
    /// Owning device. Set by [`Device::add_button`](crate::device::Device::add_button).
    pub device_id: DeviceId,
}

impl Button {
    /// Create a button with a fresh global id.
    ///
    /// Unnamed buttons are called `"Button <local_id>"`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `local_id` is empty.
    pub fn new(local_id: impl Into<String>, name: Option<String>) -> Result<Self, HubError> {
        let local_id = local_id.into();
        if local_id.is_empty() {
            return Err(ValidationError::EmptyLocalId.into());
        }
        Ok(Self {
            id: ButtonId::new(),
            name: name.unwrap_or_else(|| format!("Button {local_id}")),
            local_id,
            device_id: DeviceId::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_name_button_after_number_when_unnamed() {
        let button = Button::new("3", None).unwrap();
        assert_eq!(button.name, "Button 3");
    }

    #[test]
    fn should_keep_given_name() {
        let button = Button::new("1", Some("Evening".to_string())).unwrap();
        assert_eq!(button.name, "Evening");
    }

    #[test]
    fn should_reject_empty_local_id() {
        assert!(Button::new("", None).is_err());
    }
}
