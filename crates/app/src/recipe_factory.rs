//! Build running recipes from their declarative definitions.

use std::sync::Arc;

use homelink_domain::error::HubError;
use homelink_domain::recipe::RecipeDefinition;

use crate::actions::AnyAction;
use crate::ports::AutomationContext;
use crate::recipe::Recipe;
use crate::triggers::AnyTrigger;

/// A recipe made of built-in parts.
pub type HubRecipe<C> = Recipe<AnyTrigger, AnyAction, C>;

/// Validate `definition` and assemble a recipe bound to `ctx`.
///
/// # Errors
///
/// Returns [`HubError::Validation`] when the definition is invalid.
pub fn build_recipe<C: AutomationContext>(
    definition: &RecipeDefinition,
    ctx: Arc<C>,
) -> Result<HubRecipe<C>, HubError> {
    definition.validate()?;
    let trigger = AnyTrigger::try_from(&definition.trigger)?;
    let action = AnyAction::from(&definition.action);
    Ok(Recipe::new(definition, trigger, action, ctx))
}
