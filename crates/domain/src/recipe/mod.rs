//! Recipe — a named trigger → action automation.
//!
//! A [`RecipeDefinition`] is the declarative, serialisable half of a recipe.
//! The application layer builds a running recipe from it: a stateful
//! trigger, an executable action and the tasks that connect them to the
//! event stream.

mod action;
mod trigger;

pub use action::ActionConfig;
pub use trigger::{TriggerConfig, parse_time_of_day};

use serde::{Deserialize, Serialize};

use crate::error::{HubError, ValidationError};
use crate::id::RecipeId;

/// Format version written into new definitions.
pub const RECIPE_VERSION: &str = "1";

/// Declarative recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeDefinition {
    #[serde(default)]
    pub id: RecipeId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    pub trigger: TriggerConfig,
    pub action: ActionConfig,
}

fn default_version() -> String {
    RECIPE_VERSION.to_string()
}

fn default_enabled() -> bool {
    true
}

impl RecipeDefinition {
    /// Create a builder for constructing a [`RecipeDefinition`].
    #[must_use]
    pub fn builder() -> RecipeDefinitionBuilder {
        RecipeDefinitionBuilder::default()
    }

    /// Check domain invariants, including those of the trigger and action.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] when `name` is empty or the trigger or
    /// action is invalid.
    pub fn validate(&self) -> Result<(), HubError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName.into());
        }
        self.trigger.validate()?;
        self.action.validate()
    }

    /// Identity used when registering the recipe as an event consumer.
    #[must_use]
    pub fn consumer_id(&self) -> String {
        format!("{} - {}", self.name, self.id)
    }
}

impl std::fmt::Display for RecipeDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Recipe[{}]", self.name)
    }
}

/// Step-by-step builder for [`RecipeDefinition`].
#[derive(Debug, Default)]
pub struct RecipeDefinitionBuilder {
    id: Option<RecipeId>,
    name: Option<String>,
    description: Option<String>,
    enabled: Option<bool>,
    trigger: Option<TriggerConfig>,
    action: Option<ActionConfig>,
}

impl RecipeDefinitionBuilder {
    #[must_use]
    pub fn id(mut self, id: RecipeId) -> Self {
        self.id = Some(id);
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
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    #[must_use]
    pub fn trigger(mut self, trigger: TriggerConfig) -> Self {
        self.trigger = Some(trigger);
        self
    }

    #[must_use]
    pub fn action(mut self, action: ActionConfig) -> Self {
        self.action = Some(action);
        self
    }

    /// Consume the builder, validate, and return a [`RecipeDefinition`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Validation`] if the trigger or action is missing,
    /// or if [`RecipeDefinition::validate`] fails.
    pub fn build(self) -> Result<RecipeDefinition, HubError> {
        let recipe = RecipeDefinition {
            id: self.id.unwrap_or_default(),
            name: self.name.unwrap_or_default(),
            description: self.description.unwrap_or_default(),
            version: default_version(),
            enabled: self.enabled.unwrap_or(true),
            trigger: self.trigger.ok_or(ValidationError::Missing("trigger"))?,
            action: self.action.ok_or(ValidationError::Missing("action"))?,
        };
        recipe.validate()?;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{ButtonId, ZoneId};

    fn set_level() -> ActionConfig {
        ActionConfig::SetZoneLevel {
            zone_id: ZoneId::new(),
            intensity: 50.0,
        }
    }

    fn valid_recipe() -> RecipeDefinition {
        RecipeDefinition::builder()
            .name("Evening lights")
            .trigger(TriggerConfig::ButtonPress {
                button_id: ButtonId::new(),
                press_count: 2,
                window_ms: 1_000,
            })
            .action(set_level())
            .build()
            .unwrap()
    }

    #[test]
    fn should_build_enabled_recipe_by_default() {
        let recipe = valid_recipe();
        assert!(recipe.enabled);
        assert_eq!(recipe.version, "1");
        assert_eq!(recipe.to_string(), "Recipe[Evening lights]");
    }

    #[test]
    fn should_return_validation_error_when_trigger_missing() {
        let result = RecipeDefinition::builder()
            .name("No trigger")
            .action(set_level())
            .build();
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::Missing("trigger")))
        ));
    }

    #[test]
    fn should_return_validation_error_when_name_is_empty() {
        let result = RecipeDefinition::builder()
            .trigger(TriggerConfig::Interval { seconds: 60 })
            .action(set_level())
            .build();
        assert!(matches!(
            result,
            Err(HubError::Validation(ValidationError::EmptyName))
        ));
    }

    #[test]
    fn should_build_consumer_id_from_name_and_id() {
        let recipe = valid_recipe();
        assert_eq!(
            recipe.consumer_id(),
            format!("Evening lights - {}", recipe.id)
        );
    }

    #[test]
    fn should_deserialize_with_defaults() {
        let zone_id = ZoneId::new();
        let json = serde_json::json!({
            "name": "Hourly",
            "trigger": {"type": "interval", "seconds": 3600},
            "action": {"type": "set_zone_level", "zone_id": zone_id, "intensity": 10.0}
        });
        let recipe: RecipeDefinition = serde_json::from_value(json).unwrap();
        assert!(recipe.enabled);
        assert_eq!(recipe.version, RECIPE_VERSION);
        assert!(recipe.description.is_empty());
    }
}
