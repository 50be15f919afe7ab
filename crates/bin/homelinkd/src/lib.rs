//! # homelinkd — homelink daemon
//!
//! Composition root that wires the telnet adapter, the registry, the event
//! bus and the recipes together.
//!
//! ## Responsibilities
//! - Parse configuration (env vars, config file)
//! - Construct the registry, event bus and telnet integration
//! - Register the configured devices and start the configured recipes
//! - Open hub connections and start streaming
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no domain logic belongs here.

pub mod config;

use std::sync::Arc;

use homelink_adapter_telnet::TelnetIntegration;
use homelink_app::event_bus::InProcessEventBus;
use homelink_app::registry::InMemoryRegistry;
use homelink_app::services::system::System;

use crate::config::Config;

/// The fully wired hub.
pub type Hub = System<TelnetIntegration<Arc<InMemoryRegistry>>, Arc<InProcessEventBus>>;

/// Build the hub from `config`, start its recipes and connect its devices.
///
/// Unreachable hubs do not fail startup; their streams retry in the
/// background.
///
/// # Errors
///
/// Returns an error when a configured device or recipe is rejected.
pub async fn start(config: &Config) -> Result<Hub, Box<dyn std::error::Error>> {
    let registry = Arc::new(InMemoryRegistry::new());
    let bus = Arc::new(InProcessEventBus::new(config.bus.capacity));
    let telnet = TelnetIntegration::new(config.telnet.clone(), Arc::clone(&registry));
    let hub = System::new(registry, telnet, bus);

    for device in config.build_devices()? {
        hub.add_device(device)?;
    }
    for recipe in &config.recipes {
        hub.add_recipe(recipe)?;
    }
    let initialised = hub.init_devices().await;

    tracing::info!(
        devices = hub.registry().devices().len(),
        initialised,
        recipes = config.recipes.len(),
        "homelinkd started"
    );
    Ok(hub)
}
