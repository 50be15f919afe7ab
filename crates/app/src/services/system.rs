//! System service — the hub's use-cases for devices, recipes and commands.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use homelink_domain::command::{Command, CommandIntent};
use homelink_domain::device::Device;
use homelink_domain::error::{ConflictError, HubError, NotFoundError};
use homelink_domain::id::{DeviceId, RecipeId};
use homelink_domain::recipe::RecipeDefinition;

use crate::ports::{DeviceIntegration, EventDistributor, Registry};
use crate::recipe::{Recipe, RecipeStats};
use crate::recipe_factory::{HubRecipe, build_recipe};
use crate::registry::InMemoryRegistry;
use crate::services::hub_context::HubContext;

type Recipes<I> = HashMap<RecipeId, HubRecipe<HubContext<I>>>;

/// Application service wiring the registry, one integration and the event bus.
pub struct System<I, B> {
    ctx: Arc<HubContext<I>>,
    bus: B,
    recipes: Mutex<Recipes<I>>,
}

fn recipe_not_found(id: RecipeId) -> HubError {
    NotFoundError {
        entity: "Recipe",
        id: id.to_string(),
    }
    .into()
}

fn device_not_found(id: DeviceId) -> HubError {
    NotFoundError {
        entity: "Device",
        id: id.to_string(),
    }
    .into()
}

impl<I, B> System<I, B>
where
    I: DeviceIntegration + 'static,
    B: EventDistributor,
{
    /// Create a new service.
    pub fn new(registry: Arc<InMemoryRegistry>, integration: I, bus: B) -> Self {
        Self {
            ctx: Arc::new(HubContext::new(registry, integration)),
            bus,
            recipes: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<InMemoryRegistry> {
        self.ctx.registry()
    }

    #[must_use]
    pub fn integration(&self) -> &I {
        self.ctx.integration()
    }

    #[must_use]
    pub fn bus(&self) -> &B {
        &self.bus
    }

    fn recipes(&self) -> MutexGuard<'_, Recipes<I>> {
        self.recipes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a device tree built by an importer.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Conflict`] when the device duplicates one already
    /// registered, or [`HubError::Validation`] when it is invalid.
    #[tracing::instrument(skip(self, device), fields(device = %device.name))]
    pub fn add_device(&self, device: Device) -> Result<Arc<Device>, HubError> {
        let device = self.registry().add_device(device)?;
        tracing::info!(id = %device.id, "device registered");
        Ok(device)
    }

    /// Open the device's connections and, if it streams, register its events
    /// with the bus. Devices without their own pool are served by their hub
    /// and need no initialisation.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown device, or the setup error
    /// reported by the integration.
    #[tracing::instrument(skip(self))]
    pub async fn init_device(&self, id: DeviceId) -> Result<(), HubError> {
        let device = self.registry().device(id).ok_or_else(|| device_not_found(id))?;
        if !device.is_addressable() {
            tracing::debug!(device = %device.name, "device has no pool, nothing to initialise");
            return Ok(());
        }
        if let Some(produced) = self.integration().init_device(device).await? {
            self.bus.add_producer(&id.to_string(), produced);
        }
        Ok(())
    }

    /// Initialise every registered top-level device, logging failures.
    ///
    /// Returns how many devices were initialised.
    pub async fn init_devices(&self) -> usize {
        let mut initialised = 0;
        for device in self.registry().devices() {
            match self.init_device(device.id).await {
                Ok(()) => initialised += 1,
                Err(err) => {
                    tracing::error!(device = %device.name, error = %err, "device initialisation failed");
                }
            }
        }
        initialised
    }

    /// Stop the device's stream, close its pool and unregister its events.
    ///
    /// # Errors
    ///
    /// Returns the error reported by the integration.
    #[tracing::instrument(skip(self))]
    pub async fn stop_device(&self, id: DeviceId) -> Result<(), HubError> {
        self.integration().stop_device(id).await?;
        self.bus.remove_producer(&id.to_string());
        Ok(())
    }

    /// Stop a top-level device and remove it, with its children, from the registry.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when `id` is not a registered top-level device.
    #[tracing::instrument(skip(self))]
    pub async fn delete_device(&self, id: DeviceId) -> Result<(), HubError> {
        if self.registry().device(id).is_none() {
            return Err(device_not_found(id));
        }
        self.stop_device(id).await?;
        let removed = self.registry().remove_device(id)?;
        tracing::info!(device = %removed.name, "device removed");
        Ok(())
    }

    /// Build, start and subscribe a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] for an invalid definition and
    /// [`HubError::Conflict`] when a recipe with the same id is running.
    #[tracing::instrument(skip(self, definition), fields(recipe = %definition.name))]
    pub fn add_recipe(&self, definition: &RecipeDefinition) -> Result<RecipeId, HubError> {
        let mut recipes = self.recipes();
        if recipes.contains_key(&definition.id) {
            return Err(ConflictError::AlreadyStarted(definition.consumer_id()).into());
        }
        let mut recipe = build_recipe(definition, Arc::clone(&self.ctx))?;
        let sink = recipe.start_consuming_events()?;
        self.bus.add_consumer(recipe.consumer_id(), sink);
        recipes.insert(definition.id, recipe);
        tracing::info!(id = %definition.id, "recipe started");
        Ok(definition.id)
    }

    /// Unsubscribe a recipe and wait for its tasks to finish.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown recipe.
    #[tracing::instrument(skip(self))]
    pub async fn remove_recipe(&self, id: RecipeId) -> Result<(), HubError> {
        let mut recipe = self.recipes().remove(&id).ok_or_else(|| recipe_not_found(id))?;
        self.bus.remove_consumer(recipe.consumer_id());
        recipe.stopped().await;
        tracing::info!(recipe = %recipe.name(), "recipe removed");
        Ok(())
    }

    /// Enable or disable a running recipe without restarting it.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown recipe.
    #[tracing::instrument(skip(self))]
    pub fn set_recipe_enabled(&self, id: RecipeId, enabled: bool) -> Result<(), HubError> {
        let recipes = self.recipes();
        let recipe = recipes.get(&id).ok_or_else(|| recipe_not_found(id))?;
        recipe.set_enabled(enabled);
        Ok(())
    }

    /// Counters and state of a recipe.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] for an unknown recipe.
    pub fn recipe_stats(&self, id: RecipeId) -> Result<RecipeStats, HubError> {
        self.recipes()
            .get(&id)
            .map(Recipe::stats)
            .ok_or_else(|| recipe_not_found(id))
    }

    /// Ids of every running recipe.
    #[must_use]
    pub fn recipe_ids(&self) -> Vec<RecipeId> {
        self.recipes().keys().copied().collect()
    }

    /// Render and send a command, returning what went on the wire.
    ///
    /// # Errors
    ///
    /// Returns the integration's error when the target cannot be resolved or
    /// the hub cannot be reached.
    #[tracing::instrument(skip(self, intent), fields(intent = %intent))]
    pub async fn send_command(&self, intent: CommandIntent) -> Result<Command, HubError> {
        self.integration().send_command(intent).await
    }

    /// Stop every recipe and device.
    pub async fn shutdown(&self) {
        let recipes: Vec<_> = self.recipes().drain().map(|(_, recipe)| recipe).collect();
        for mut recipe in recipes {
            self.bus.remove_consumer(recipe.consumer_id());
            recipe.stopped().await;
        }
        for device in self.registry().devices() {
            self.bus.remove_producer(&device.id.to_string());
        }
        if let Err(err) = self.integration().teardown().await {
            tracing::error!(integration = self.integration().name(), error = %err, "teardown failed");
        }
        tracing::info!("system stopped");
    }
}
