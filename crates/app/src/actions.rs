//! Built-in actions.

use homelink_domain::command::CommandIntent;
use homelink_domain::error::{HubError, NotFoundError};
use homelink_domain::id::{ButtonId, DeviceId, ZoneId};
use homelink_domain::recipe::ActionConfig;

use crate::ports::{Action, AutomationContext};

/// Drive a zone to an intensity.
#[derive(Debug, Clone)]
pub struct SetZoneLevelAction {
    pub zone_id: ZoneId,
    pub intensity: f64,
}

impl Action for SetZoneLevelAction {
    async fn execute<C: AutomationContext>(&self, ctx: &C) -> Result<(), HubError> {
        let zone = ctx.zone(self.zone_id).ok_or_else(|| NotFoundError {
            entity: "Zone",
            id: self.zone_id.to_string(),
        })?;
        tracing::debug!(zone = %zone.name, intensity = self.intensity, "setting zone level");
        ctx.dispatch(CommandIntent::SetZoneLevel {
            zone_id: zone.id,
            intensity: self.intensity,
        })
        .await
    }
}

/// Press a button and release it again.
#[derive(Debug, Clone)]
pub struct PressButtonAction {
    pub device_id: DeviceId,
    pub button_id: ButtonId,
}

impl Action for PressButtonAction {
    async fn execute<C: AutomationContext>(&self, ctx: &C) -> Result<(), HubError> {
        ensure_button(ctx, self.button_id)?;
        ctx.dispatch(CommandIntent::PressButton {
            device_id: self.device_id,
            button_id: self.button_id,
        })
        .await?;
        ctx.dispatch(CommandIntent::ReleaseButton {
            device_id: self.device_id,
            button_id: self.button_id,
        })
        .await
    }
}

/// Release a button.
#[derive(Debug, Clone)]
pub struct ReleaseButtonAction {
    pub device_id: DeviceId,
    pub button_id: ButtonId,
}

impl Action for ReleaseButtonAction {
    async fn execute<C: AutomationContext>(&self, ctx: &C) -> Result<(), HubError> {
        ensure_button(ctx, self.button_id)?;
        ctx.dispatch(CommandIntent::ReleaseButton {
            device_id: self.device_id,
            button_id: self.button_id,
        })
        .await
    }
}

fn ensure_button<C: AutomationContext>(ctx: &C, button_id: ButtonId) -> Result<(), HubError> {
    if ctx.button(button_id).is_none() {
        return Err(NotFoundError {
            entity: "Button",
            id: button_id.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Any built-in action.
#[derive(Debug, Clone)]
pub enum AnyAction {
    SetZoneLevel(SetZoneLevelAction),
    PressButton(PressButtonAction),
    ReleaseButton(ReleaseButtonAction),
}

impl From<&ActionConfig> for AnyAction {
    fn from(config: &ActionConfig) -> Self {
        match *config {
            ActionConfig::SetZoneLevel { zone_id, intensity } => {
                Self::SetZoneLevel(SetZoneLevelAction { zone_id, intensity })
            }
            ActionConfig::PressButton {
                device_id,
                button_id,
            } => Self::PressButton(PressButtonAction {
                device_id,
                button_id,
            }),
            ActionConfig::ReleaseButton {
                device_id,
                button_id,
            } => Self::ReleaseButton(ReleaseButtonAction {
                device_id,
                button_id,
            }),
        }
    }
}

impl Action for AnyAction {
    async fn execute<C: AutomationContext>(&self, ctx: &C) -> Result<(), HubError> {
        match self {
            Self::SetZoneLevel(inner) => inner.execute(ctx).await,
            Self::PressButton(inner) => inner.execute(ctx).await,
            Self::ReleaseButton(inner) => inner.execute(ctx).await,
        }
    }
}
