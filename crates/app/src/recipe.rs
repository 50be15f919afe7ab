//! Running recipe — a trigger wired to an action through the event stream.
//!
//! A recipe owns up to two tasks once started:
//!
//! - the **event listener**, fed through the sink returned by
//!   [`Recipe::start_consuming_events`]; it evaluates the trigger against
//!   every event and stops when the sink's sending side is dropped
//! - the **fire listener**, present only for triggers that fire on their own
//!
//! When the event listener stops it cancels the recipe's *done* signal,
//! which ends the fire listener and any background work of the trigger.
//! Action executions never overlap within one recipe.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use homelink_domain::error::{ConflictError, HubError};
use homelink_domain::id::RecipeId;
use homelink_domain::recipe::RecipeDefinition;

use crate::ports::{Action, AutomationContext, EventSink, FireSignal, Trigger, TriggerInit};

/// Capacity of the queue between the event bus and a recipe.
pub const EVENT_BUFFER: usize = 64;

/// Lifecycle of a [`Recipe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipeState {
    /// Built, not yet consuming.
    Created,
    Consuming,
    Stopped,
}

/// Point-in-time counters for a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecipeStats {
    pub enabled: bool,
    pub state: RecipeState,
    /// Completed action runs, failed ones included.
    pub executions: u64,
    pub failures: u64,
}

struct Shared<A, C> {
    name: String,
    action: A,
    ctx: Arc<C>,
    enabled: AtomicBool,
    gate: Mutex<()>,
    executions: AtomicU64,
    failures: AtomicU64,
}

impl<A: Action, C: AutomationContext> Shared<A, C> {
    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    async fn run(self: &Arc<Self>, cause: &'static str) {
        if !self.is_enabled() {
            tracing::debug!(recipe = %self.name, cause, "recipe disabled, not executing");
            return;
        }
        let _guard = self.gate.lock().await;
        if !self.is_enabled() {
            tracing::debug!(recipe = %self.name, cause, "recipe disabled while waiting, not executing");
            return;
        }
        let shared = Arc::clone(self);
        let outcome =
            tokio::spawn(async move { shared.action.execute(shared.ctx.as_ref()).await }).await;
        self.executions.fetch_add(1, Ordering::Relaxed);
        match outcome {
            Ok(Ok(())) => tracing::info!(recipe = %self.name, cause, "recipe executed"),
            Ok(Err(err)) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(recipe = %self.name, cause, error = %err, "recipe action failed");
            }
            Err(err) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                tracing::error!(recipe = %self.name, cause, error = %err, "recipe action panicked");
            }
        }
    }
}

/// A started or startable recipe.
pub struct Recipe<T, A, C> {
    id: RecipeId,
    consumer_id: String,
    trigger: Option<T>,
    shared: Arc<Shared<A, C>>,
    tasks: Vec<JoinHandle<()>>,
}

impl<T, A, C> Recipe<T, A, C>
where
    T: Trigger,
    A: Action,
    C: AutomationContext,
{
    /// Assemble a recipe from its definition and already-built parts.
    pub fn new(definition: &RecipeDefinition, trigger: T, action: A, ctx: Arc<C>) -> Self {
        Self {
            id: definition.id,
            consumer_id: definition.consumer_id(),
            trigger: Some(trigger),
            shared: Arc::new(Shared {
                name: definition.name.clone(),
                action,
                ctx,
                enabled: AtomicBool::new(definition.enabled),
                gate: Mutex::new(()),
                executions: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
            tasks: Vec::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> RecipeId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.shared.name
    }

    /// Identity under which the recipe subscribes to the event bus.
    #[must_use]
    pub fn consumer_id(&self) -> &str {
        &self.consumer_id
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.shared.is_enabled()
    }

    /// Enable or disable execution. Takes effect for the next firing.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::Release);
    }

    #[must_use]
    pub fn state(&self) -> RecipeState {
        if self.trigger.is_some() {
            RecipeState::Created
        } else if self.tasks.iter().all(JoinHandle::is_finished) {
            RecipeState::Stopped
        } else {
            RecipeState::Consuming
        }
    }

    #[must_use]
    pub fn stats(&self) -> RecipeStats {
        RecipeStats {
            enabled: self.is_enabled(),
            state: self.state(),
            executions: self.shared.executions.load(Ordering::Relaxed),
            failures: self.shared.failures.load(Ordering::Relaxed),
        }
    }

    /// Initialise the trigger and start listening.
    ///
    /// Returns the sink events must be sent to. Dropping every clone of it
    /// stops the recipe.
    ///
    /// # Errors
    ///
    /// Returns [`ConflictError::AlreadyStarted`] when called a second time.
    pub fn start_consuming_events(&mut self) -> Result<EventSink, HubError> {
        let Some(mut trigger) = self.trigger.take() else {
            return Err(ConflictError::AlreadyStarted(self.consumer_id.clone()).into());
        };
        let done = CancellationToken::new();
        let TriggerInit {
            fire,
            processes_events,
        } = trigger.init(done.clone());

        if let Some(fire) = fire {
            self.tasks.push(tokio::spawn(listen_for_fire(
                Arc::clone(&self.shared),
                fire,
                done.clone(),
            )));
        }

        let (sink, mut events) = mpsc::channel(EVENT_BUFFER);
        let shared = Arc::clone(&self.shared);
        self.tasks.push(tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if !processes_events || !shared.is_enabled() {
                    continue;
                }
                if trigger.process_event(&event) {
                    shared.run("event").await;
                }
            }
            done.cancel();
            tracing::debug!(recipe = %shared.name, "event stream closed, recipe stopped");
        }));

        tracing::debug!(recipe = %self.shared.name, processes_events, "recipe consuming events");
        Ok(sink)
    }

    /// Wait until every task of the recipe has finished.
    pub async fn stopped(&mut self) {
        for task in self.tasks.drain(..) {
            if let Err(err) = task.await {
                tracing::warn!(recipe = %self.shared.name, error = %err, "recipe task aborted");
            }
        }
    }
}

async fn listen_for_fire<A: Action, C: AutomationContext>(
    shared: Arc<Shared<A, C>>,
    mut fire: FireSignal,
    done: CancellationToken,
) {
    loop {
        tokio::select! {
            () = done.cancelled() => break,
            signal = fire.recv() => match signal {
                Some(true) => shared.run("timer").await,
                Some(false) => {}
                None => break,
            },
        }
    }
}
