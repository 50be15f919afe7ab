//! Zone — a controllable output channel on a device (a light level, a shade).

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::{DeviceId, ZoneId};

/// What the zone physically drives.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneType {
    #[default]
    Light,
    Shade,
    Unknown,
}

/// Whether the output can only be switched or can be dimmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputKind {
    Binary,
    #[default]
    Continuous,
}

/// A controllable output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    /// Address of the zone on its hub's wire protocol (e.g. `"12"`).
    pub local_id: String,
    pub name: String,
    pub zone_type: ZoneType,
    pub output: OutputKind,
    /// Owning device. Set by [`Device::add_zone`](crate::device::Device::add_zone).
    pub device_id: DeviceId,
}

impl Zone {
    /// Create a builder for constructing a [`Zone`].
    #[must_use]
    pub fn builder() -> ZoneBuilder {
        ZoneBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `local_id` or `name` is empty.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.local_id.is_empty() {
            return Err(ValidationError::EmptyLocalId.into());
        }
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        Ok(())
    }
}

/// Step-by-step builder for [`Zone`].
#[derive(Debug, Default)]
pub struct ZoneBuilder {
    id: Option<ZoneId>,
    local_id: Option<String>,
    name: Option<String>,
    zone_type: ZoneType,
    output: OutputKind,
    device_id: Option<DeviceId>,
}

impl ZoneBuilder {
    #[must_use]
    pub fn id(mut self, id: ZoneId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn local_id(mut self, local_id: impl Into<String>) -> Self {
        self.local_id = Some(local_id.into());
        self
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn zone_type(mut self, zone_type: ZoneType) -> Self {
        self.zone_type = zone_type;
        self
    }

    #[must_use]
    pub fn output(mut self, output: OutputKind) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn device_id(mut self, device_id: DeviceId) -> Self {
        self.device_id = Some(device_id);
        self
    }

    /// Consume the builder, validate, and return a [`Zone`].
    ///
    /// When no name is given the zone is named after its local id.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if `local_id` is missing or empty.
    pub fn build(self) -> Result<Zone, HubError> {
        let local_id = self.local_id.unwrap_or_default();
        let zone = Zone {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_else(|| format!("Zone {local_id}")),
            local_id,
            zone_type: self.zone_type,
            output: self.output,
            device_id: self.device_id.unwrap_or_default(),
        };
        zone.validate()?;
        Ok(zone)
    }
}
