//! Automation ports — the trigger/action contracts a recipe is built from.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use homelink_domain::command::CommandIntent;
use homelink_domain::error::HubError;
use homelink_domain::event::Event;

use super::registry::Registry;

/// Asynchronous fire signal emitted by time-based triggers.
pub type FireSignal = mpsc::Receiver<bool>;

/// What a trigger reports when it is initialised.
#[derive(Debug, Default)]
pub struct TriggerInit {
    /// Present when the trigger fires on its own (timers).
    pub fire: Option<FireSignal>,
    /// Whether the trigger wants to see the live event stream.
    pub processes_events: bool,
}

/// Stateful predicate deciding when a recipe fires.
pub trait Trigger: Send + 'static {
    /// Prepare the trigger. Background work started here must stop once
    /// `done` is cancelled.
    fn init(&mut self, done: CancellationToken) -> TriggerInit;

    /// Evaluate one event. Returning `true` fires the recipe.
    fn process_event(&mut self, event: &Event) -> bool;
}

/// Everything an action may touch: registry lookups and command dispatch.
pub trait AutomationContext: Registry + 'static {
    /// Send a command intent to whichever hub controls its target.
    fn dispatch(&self, intent: CommandIntent) -> impl Future<Output = Result<(), HubError>> + Send;
}

/// Unit of work executed when a trigger fires.
pub trait Action: Send + Sync + 'static {
    fn execute<C: AutomationContext>(
        &self,
        ctx: &C,
    ) -> impl Future<Output = Result<(), HubError>> + Send;
}
