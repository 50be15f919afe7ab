//! Integration port — connection lifecycle and command delivery for a
//! family of devices speaking one wire protocol.
//!
//! The composition root calls the lifecycle methods in order:
//!
//! 1. [`init_device`](DeviceIntegration::init_device) — open the device's
//!    connection pool and, if it streams, start producing events
//! 2. (the hub runs, sending commands via [`send_command`](DeviceIntegration::send_command))
//! 3. [`stop_device`](DeviceIntegration::stop_device) — on device removal
//! 4. [`teardown`](DeviceIntegration::teardown) — on shutdown

use std::future::Future;
use std::sync::Arc;

use homelink_domain::command::{Command, CommandIntent};
use homelink_domain::device::Device;
use homelink_domain::error::HubError;
use homelink_domain::id::DeviceId;

use super::event_bus::ProducedEvents;

/// A pluggable protocol integration (implemented in adapter crates).
pub trait DeviceIntegration: Send + Sync {
    /// Unique name identifying this integration (e.g. `"telnet"`).
    fn name(&self) -> &'static str;

    /// Initialise connections for an addressable device.
    ///
    /// Returns the device's event stream when it is configured to stream.
    /// Only setup-time problems (bad pool configuration, device already
    /// streaming) are errors; an unreachable device is retried in the
    /// background.
    fn init_device(
        &self,
        device: Arc<Device>,
    ) -> impl Future<Output = Result<Option<ProducedEvents>, HubError>> + Send;

    /// Stop streaming and close the device's pool.
    fn stop_device(&self, id: DeviceId) -> impl Future<Output = Result<(), HubError>> + Send;

    /// Render an intent to wire form and write it to the owning hub.
    ///
    /// Returns the command that was sent.
    fn send_command(
        &self,
        intent: CommandIntent,
    ) -> impl Future<Output = Result<Command, HubError>> + Send;

    /// Called on graceful shutdown. Stop every device.
    fn teardown(&self) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: DeviceIntegration> DeviceIntegration for Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn init_device(
        &self,
        device: Arc<Device>,
    ) -> impl Future<Output = Result<Option<ProducedEvents>, HubError>> + Send {
        (**self).init_device(device)
    }

    fn stop_device(&self, id: DeviceId) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).stop_device(id)
    }

    fn send_command(
        &self,
        intent: CommandIntent,
    ) -> impl Future<Output = Result<Command, HubError>> + Send {
        (**self).send_command(intent)
    }

    fn teardown(&self) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).teardown()
    }
}
