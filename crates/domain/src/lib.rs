//! # homelink-domain
//!
//! Pure domain model for the homelink hub.
//!
//! ## Responsibilities
//! - Foundational types: typed global identifiers, error conventions, timestamps
//! - Define **Devices** (hubs and the peripherals behind them) with their
//!   **Zones** (controllable outputs) and **Buttons** (control points)
//! - Define **Commands** (outbound intents and their rendered wire form)
//! - Define **Events** (classified observations from a device stream)
//! - Define **Recipes** (declarative trigger → action automations)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It never imports anything from `app`, adapters, or IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod button;
pub mod command;
pub mod device;
pub mod event;
pub mod recipe;
pub mod zone;
