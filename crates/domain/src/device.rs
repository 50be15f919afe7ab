//! Device — a network-addressable controller (a lighting hub) or a
//! peripheral reachable through one (a keypad, a dimmer).
//!
//! A device owns its buttons, zones and child devices, each keyed by local
//! id. The link to a controlling hub is an id ([`Device::hub_id`]), never an
//! embedded reference, so lookups always go through a registry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::button::Button;
use crate::error::{HubError, ValidationError};
use crate::id::{ButtonId, DeviceId, ZoneId};
use crate::zone::Zone;

/// Login/password pair sent during the telnet handshake.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// Present when the device is directly addressable and owns a connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSettings {
    /// Number of pooled connections.
    pub pool_size: usize,
    /// Whether to keep a connection open streaming unsolicited notifications.
    pub stream: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            pool_size: 2,
            stream: true,
        }
    }
}

/// A controller or peripheral.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    pub id: DeviceId,
    /// Id scoped to the controlling hub (e.g. the integration id `"9"`).
    pub local_id: String,
    pub name: String,
    pub description: String,
    /// Network address (`host:port`) for hubs, or the hub-side address for peripherals.
    pub address: String,
    pub credentials: Option<Credentials>,
    pub hub_id: Option<DeviceId>,
    pub connection: Option<ConnectionSettings>,
    pub buttons: BTreeMap<String, Button>,
    pub devices: BTreeMap<String, Device>,
    pub zones: BTreeMap<String, Zone>,
}

impl Device {
    /// Create a builder for constructing a [`Device`].
    #[must_use]
    pub fn builder() -> DeviceBuilder {
        DeviceBuilder::default()
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when:
    /// - `name` is empty ([`ValidationError::EmptyName`])
    /// - the device owns a pool but has no address ([`ValidationError::EmptyAddress`])
    /// - the pool size is zero ([`ValidationError::EmptyPool`])
    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        if let Some(settings) = self.connection {
            if self.address.is_empty() {
                return Err(ValidationError::EmptyAddress.into());
            }
            if settings.pool_size == 0 {
                return Err(ValidationError::EmptyPool.into());
            }
        }
        Ok(())
    }

    /// Whether this device owns its own connection pool.
    #[must_use]
    pub fn is_addressable(&self) -> bool {
        self.connection.is_some()
    }

    /// Attach a zone, taking ownership of it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateLocalId`] if a zone with the same
    /// local id is already attached.
    pub fn add_zone(&mut self, mut zone: Zone) -> Result<(), HubError> {
        if self.zones.contains_key(&zone.local_id) {
            return Err(duplicate("zone", zone.local_id));
        }
        zone.device_id = self.id;
        self.zones.insert(zone.local_id.clone(), zone);
        Ok(())
    }

    /// Attach a button, taking ownership of it.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateLocalId`] on a local id collision.
    pub fn add_button(&mut self, mut button: Button) -> Result<(), HubError> {
        if self.buttons.contains_key(&button.local_id) {
            return Err(duplicate("button", button.local_id));
        }
        button.device_id = self.id;
        self.buttons.insert(button.local_id.clone(), button);
        Ok(())
    }

    /// Attach a child device controlled through this one.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::DuplicateLocalId`] on a local id collision.
    pub fn add_device(&mut self, mut child: Device) -> Result<(), HubError> {
        if self.devices.contains_key(&child.local_id) {
            return Err(duplicate("device", child.local_id));
        }
        child.hub_id = Some(self.id);
        self.devices.insert(child.local_id.clone(), child);
        Ok(())
    }

    /// Find this device or one of its descendants by global id.
    #[must_use]
    pub fn find_device(&self, id: DeviceId) -> Option<&Device> {
        if self.id == id {
            return Some(self);
        }
        self.devices.values().find_map(|child| child.find_device(id))
    }

    /// Find a zone by global id anywhere in this device tree.
    #[must_use]
    pub fn find_zone(&self, id: ZoneId) -> Option<&Zone> {
        self.zones
            .values()
            .find(|zone| zone.id == id)
            .or_else(|| self.devices.values().find_map(|child| child.find_zone(id)))
    }

    /// Find a button by global id anywhere in this device tree.
    #[must_use]
    pub fn find_button(&self, id: ButtonId) -> Option<&Button> {
        self.buttons
            .values()
            .find(|button| button.id == id)
            .or_else(|| {
                self.devices
                    .values()
                    .find_map(|child| child.find_button(id))
            })
    }

    /// Iterate over this device and all of its descendants, depth first.
    pub fn walk(&self) -> Box<dyn Iterator<Item = &Device> + '_> {
        Box::new(std::iter::once(self).chain(self.devices.values().flat_map(Device::walk)))
    }

    /// Whether `other` describes the same physical device as `self`.
    ///
    /// Ids are not compared: two scans of the same hardware yield different
    /// global ids. Devices match on address, and then only if both are
    /// hub-less or both sit under the same hub id. How a hub id that changes
    /// between rescans should be treated is unresolved; such devices are
    /// reported as distinct.
    #[must_use]
    pub fn is_duplicate_of(&self, other: &Device) -> bool {
        if self.address != other.address {
            return false;
        }
        match (self.hub_id, other.hub_id) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Device[{}]", self.name)
    }
}

fn duplicate(kind: &'static str, local_id: String) -> HubError {
    ValidationError::DuplicateLocalId { kind, local_id }.into()
}

/// Step-by-step builder for [`Device`].
#[derive(Debug, Default)]
pub struct DeviceBuilder {
    id: Option<DeviceId>,
    local_id: Option<String>,
    name: Option<String>,
    description: Option<String>,
    address: Option<String>,
    credentials: Option<Credentials>,
    hub_id: Option<DeviceId>,
    connection: Option<ConnectionSettings>,
}

impl DeviceBuilder {
    #[must_use]
    pub fn id(mut self, id: DeviceId) -> Self {
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
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn credentials(mut self, login: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some(Credentials {
            login: login.into(),
            password: password.into(),
        });
        self
    }

    #[must_use]
    pub fn hub_id(mut self, hub_id: DeviceId) -> Self {
        self.hub_id = Some(hub_id);
        self
    }

    #[must_use]
    pub fn connection(mut self, settings: ConnectionSettings) -> Self {
        self.connection = Some(settings);
        self
    }

    /// Consume the builder, validate, and return a [`Device`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if invariants fail (see [`Device::validate`]).
    pub fn build(self) -> Result<Device, HubError> {
        let address = self.address.unwrap_or_default();
        let device = Device {
            id: self.id.unwrap_or_default(),
            local_id: self.local_id.unwrap_or_else(|| address.clone()),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            address,
            credentials: self.credentials,
            hub_id: self.hub_id,
            connection: self.connection,
            buttons: BTreeMap::new(),
            devices: BTreeMap::new(),
            zones: BTreeMap::new(),
        };
        device.validate()?;
        Ok(device)
    }
}
