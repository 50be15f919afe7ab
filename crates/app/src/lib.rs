//! # homelink-app
//!
//! Application layer — use-cases, the automation engine and **port
//! definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Registry` — resolve devices, zones and buttons by id
//!   - `DeviceIntegration` — connection lifecycle and command delivery
//!   - `EventPublisher` / `EventDistributor` — event fan-out
//!   - `Trigger`, `Action`, `AutomationContext` — recipe building blocks
//! - Provide **in-process infrastructure** that doesn't need IO: the event
//!   bus and the in-memory registry
//! - Run **recipes**: built-in triggers and actions, the recipe factory and
//!   the per-recipe listening tasks
//! - Expose the `System` service used by the composition root
//!
//! ## Dependency rule
//! Depends on `homelink-domain` only (plus `tokio` for tasks and channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod actions;
pub mod event_bus;
pub mod ports;
pub mod recipe;
pub mod recipe_factory;
pub mod registry;
pub mod services;
pub mod triggers;

#[cfg(test)]
pub(crate) mod testing;
