//! Port definitions — traits that adapters and the composition root implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the engine and the adapter
//! layer can depend on them without creating circular dependencies.

pub mod automation;
pub mod event_bus;
pub mod integration;
pub mod registry;

pub use automation::{Action, AutomationContext, FireSignal, Trigger, TriggerInit};
pub use event_bus::{EventDistributor, EventPublisher, EventSink, EventStream, ProducedEvents};
pub use integration::DeviceIntegration;
pub use registry::Registry;
