//! Registry port — resolve devices, zones and buttons by global id.
//!
//! Entities never hold references to one another; anything that needs a
//! related entity looks it up here at the moment it needs it.

use std::sync::Arc;

use homelink_domain::button::Button;
use homelink_domain::device::Device;
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::zone::Zone;

/// Deepest hub chain followed by [`Registry::controller_of`].
const MAX_HUB_DEPTH: usize = 8;

/// Read access to the system-wide device tables.
pub trait Registry: Send + Sync {
    /// Look up any device (hub or peripheral) by global id.
    fn device(&self, id: DeviceId) -> Option<Arc<Device>>;

    /// Look up a zone by global id.
    fn zone(&self, id: ZoneId) -> Option<Zone>;

    /// Look up a button by global id.
    fn button(&self, id: ButtonId) -> Option<Button>;

    /// The addressable device whose connection pool serves `id`: the device
    /// itself when it owns a pool, otherwise the nearest hub above it.
    fn controller_of(&self, id: DeviceId) -> Option<Arc<Device>> {
        let mut current = self.device(id)?;
        for _ in 0..MAX_HUB_DEPTH {
            if current.is_addressable() {
                return Some(current);
            }
            current = self.device(current.hub_id?)?;
        }
        None
    }
}

impl<T: Registry> Registry for Arc<T> {
    fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        (**self).device(id)
    }

    fn zone(&self, id: ZoneId) -> Option<Zone> {
        (**self).zone(id)
    }

    fn button(&self, id: ButtonId) -> Option<Button> {
        (**self).button(id)
    }
}
