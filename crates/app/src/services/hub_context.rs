//! Concrete [`AutomationContext`] backed by the registry and an integration.

use std::sync::Arc;

use homelink_domain::button::Button;
use homelink_domain::command::CommandIntent;
use homelink_domain::device::Device;
use homelink_domain::error::HubError;
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::zone::Zone;

use crate::ports::{AutomationContext, DeviceIntegration, Registry};
use crate::registry::InMemoryRegistry;

/// What recipes see of the hub: lookups plus command dispatch.
///
/// Holds no reference back to the [`System`](super::system::System) that
/// owns the recipes.
pub struct HubContext<I> {
    registry: Arc<InMemoryRegistry>,
    integration: I,
}

impl<I> HubContext<I> {
    pub fn new(registry: Arc<InMemoryRegistry>, integration: I) -> Self {
        Self {
            registry,
            integration,
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn integration(&self) -> &I {
        &self.integration
    }
}

impl<I: Send + Sync> Registry for HubContext<I> {
    fn device(&self, id: DeviceId) -> Option<Arc<Device>> {
        self.registry.device(id)
    }

    fn zone(&self, id: ZoneId) -> Option<Zone> {
        self.registry.zone(id)
    }

    fn button(&self, id: ButtonId) -> Option<Button> {
        self.registry.button(id)
    }
}

impl<I: DeviceIntegration + 'static> AutomationContext for HubContext<I> {
    async fn dispatch(&self, intent: CommandIntent) -> Result<(), HubError> {
        let command = self.integration.send_command(intent).await?;
        tracing::debug!(%command, "command dispatched");
        Ok(())
    }
}
