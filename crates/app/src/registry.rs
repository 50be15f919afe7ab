//! In-memory device registry.
//!
//! Top-level devices are registered as whole trees; every device in a tree
//! is indexed by global id so lookups never walk the hierarchy.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use homelink_domain::button::Button;
use homelink_domain::device::Device;
use homelink_domain::error::{ConflictError, HubError, NotFoundError};
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::zone::Zone;

use crate::ports::Registry;

#[derive(Default)]
struct Tables {
    roots: Vec<DeviceId>,
    index: HashMap<DeviceId, Arc<Device>>,
}

/// Thread-safe registry of every known device, zone and button.
#[derive(Default)]
pub struct InMemoryRegistry {
    tables: RwLock<Tables>,
}

impl InMemoryRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a top-level device together with its children.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for an invalid device and
    /// [`HubError::Conflict`] when it duplicates an already registered device
    /// or reuses a registered id.
    pub fn add_device(&self, device: Device) -> Result<Arc<Device>, HubError> {
        device.validate()?;
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = find_duplicate(&tables, &device) {
            return Err(ConflictError::DuplicateDevice(existing.name.clone()).into());
        }
        if let Some(taken) = device.walk().find(|d| tables.index.contains_key(&d.id)) {
            return Err(ConflictError::DuplicateDevice(taken.id.to_string()).into());
        }

        for child in device.walk().skip(1) {
            tables.index.insert(child.id, Arc::new(child.clone()));
        }
        let root = Arc::new(device);
        tables.roots.push(root.id);
        tables.index.insert(root.id, Arc::clone(&root));
        Ok(root)
    }

    /// Remove a top-level device and everything below it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when `id` is not a registered top-level device.
    pub fn remove_device(&self, id: DeviceId) -> Result<Arc<Device>, HubError> {
        let mut tables = self.tables.write().unwrap_or_else(PoisonError::into_inner);
        let Some(position) = tables.roots.iter().position(|root| *root == id) else {
            return Err(NotFoundError {
                entity: "Device",
                id: id.to_string(),
            }
            .into());
        };
        tables.roots.remove(position);
        let root = tables.index.remove(&id).ok_or_else(|| NotFoundError {
            entity: "Device",
            id: id.to_string(),
        })?;
        for child in root.walk().skip(1) {
            tables.index.remove(&child.id);
        }
        Ok(root)
    }

    /// An already registered device describing the same hardware as `device`.
    #[must_use]
    pub fn find_duplicate(&self, device: &Device) -> Option<Arc<Device>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        find_duplicate(&tables, device)
    }

    /// Top-level devices in registration order.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<Device>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .roots
            .iter()
            .filter_map(|id| tables.index.get(id).cloned())
            .collect()
    }
}

fn find_duplicate(tables: &Tables, device: &Device) -> Option<Arc<Device>> {
    tables
        .index
        .values()
        .find(|existing| existing.is_duplicate_of(device))
        .cloned()
}

impl Registry for InMemoryRegistry {
    fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.index.get(&id).cloned()
    }

    fn zone(&self, id: ZoneId) -> Option<Zone> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .index
            .values()
            .find_map(|device| device.zones.values().find(|zone| zone.id == id))
            .cloned()
    }

    fn button(&self, id: ButtonId) -> Option<Button> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables
            .index
            .values()
            .find_map(|device| device.buttons.values().find(|button| button.id == id))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use homelink_domain::device::ConnectionSettings;

    fn hub(address: &str) -> Device {
        let mut hub = Device::builder()
            .local_id("1")
            .name("Smart Bridge")
            .address(address)
            .credentials("lutron", "integration")
            .connection(ConnectionSettings::default())
            .build()
            .unwrap();
        let mut keypad = Device::builder()
            .local_id("2")
            .name("Hallway keypad")
            .address("2")
            .build()
            .unwrap();
        keypad
            .add_button(Button::new("1", Some("Bright".to_string())).unwrap())
            .unwrap();
        hub.add_device(keypad).unwrap();
        hub.add_zone(
            Zone::builder()
                .local_id("12")
                .name("Kitchen")
                .build()
                .unwrap(),
        )
        .unwrap();
        hub
    }

    #[test]
    fn should_index_every_device_in_the_tree() {
        let registry = InMemoryRegistry::new();
        let root = registry.add_device(hub("10.0.0.2:23")).unwrap();

        let keypad = root.devices.get("2").unwrap();
        let found = registry.device(keypad.id).unwrap();
        assert_eq!(found.hub_id, Some(root.id));
        assert_eq!(registry.devices().len(), 1);
    }

    #[test]
    fn should_find_zone_and_button_by_global_id() {
        let registry = InMemoryRegistry::new();
        let root = registry.add_device(hub("10.0.0.2:23")).unwrap();

        let zone = root.zones.get("12").unwrap();
        assert_eq!(registry.zone(zone.id).unwrap().name, "Kitchen");

        let button = root.devices.get("2").unwrap().buttons.get("1").unwrap();
        assert_eq!(registry.button(button.id).unwrap().name, "Bright");
        assert!(registry.zone(ZoneId::new()).is_none());
    }

    #[test]
    fn should_reject_duplicate_device() {
        let registry = InMemoryRegistry::new();
        registry.add_device(hub("10.0.0.2:23")).unwrap();

        let result = registry.add_device(hub("10.0.0.2:23"));
        assert!(matches!(
            result,
            Err(HubError::Conflict(ConflictError::DuplicateDevice(_)))
        ));
        assert!(registry.add_device(hub("10.0.0.3:23")).is_ok());
    }

    #[test]
    fn should_resolve_controller_through_hub_chain() {
        let registry = InMemoryRegistry::new();
        let root = registry.add_device(hub("10.0.0.2:23")).unwrap();
        let keypad = root.devices.get("2").unwrap();

        let controller = registry.controller_of(keypad.id).unwrap();
        assert_eq!(controller.id, root.id);
        assert_eq!(registry.controller_of(root.id).unwrap().id, root.id);
    }

    #[test]
    fn should_remove_whole_tree() {
        let registry = InMemoryRegistry::new();
        let root = registry.add_device(hub("10.0.0.2:23")).unwrap();
        let keypad_id = root.devices.get("2").unwrap().id;

        registry.remove_device(root.id).unwrap();

        assert!(registry.device(root.id).is_none());
        assert!(registry.device(keypad_id).is_none());
        assert!(matches!(
            registry.remove_device(root.id),
            Err(HubError::NotFound(_))
        ));
    }
}
