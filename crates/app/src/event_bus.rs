//! In-process event bus backed by a tokio broadcast channel.
//!
//! Each registered producer gets a forwarding task that drains its stream
//! onto the broadcast channel; each registered consumer gets a task that
//! copies the broadcast into the consumer's sink.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use homelink_domain::error::HubError;
use homelink_domain::event::Event;

use crate::ports::{EventDistributor, EventPublisher, EventSink, ProducedEvents};

struct Registration {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl Registration {
    fn stop(self) {
        self.cancel.cancel();
        // Detached; the task exits once it sees the token.
        drop(self.task);
    }
}

/// In-process event bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the event is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Event>,
    producers: Mutex<HashMap<String, Registration>>,
    consumers: Mutex<HashMap<String, Registration>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InProcessEventBus {
    /// Create a new event bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            producers: Mutex::new(HashMap::new()),
            consumers: Mutex::new(HashMap::new()),
        }
    }

    /// Subscribe to events on this bus.
    ///
    /// Returns a receiver that will get all events published *after*
    /// the subscription is created.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Names of the producers currently forwarding onto the bus.
    #[must_use]
    pub fn producer_names(&self) -> Vec<String> {
        lock(&self.producers).keys().cloned().collect()
    }

    /// Ids of the consumers currently receiving from the bus.
    #[must_use]
    pub fn consumer_ids(&self) -> Vec<String> {
        lock(&self.consumers).keys().cloned().collect()
    }
}

impl EventPublisher for InProcessEventBus {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        let _ = self.sender.send(event);
        async { Ok(()) }
    }
}

impl EventDistributor for InProcessEventBus {
    fn add_producer(&self, name: &str, produced: ProducedEvents) {
        let ProducedEvents { mut events, cancel } = produced;
        let sender = self.sender.clone();
        let token = cancel.clone();
        let producer = name.to_string();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    received = events.recv() => match received {
                        Some(event) => {
                            let _ = sender.send(event);
                        }
                        None => break,
                    },
                }
            }
            tracing::debug!(%producer, "producer detached from event bus");
        });
        let previous = lock(&self.producers).insert(name.to_string(), Registration { cancel, task });
        if let Some(previous) = previous {
            tracing::warn!(producer = %name, "replacing existing producer");
            previous.stop();
        }
    }

    fn remove_producer(&self, name: &str) -> bool {
        let removed = lock(&self.producers).remove(name);
        removed.map(Registration::stop).is_some()
    }

    fn add_consumer(&self, id: &str, sink: EventSink) {
        let mut receiver = self.sender.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let consumer = id.to_string();
        let task = tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    () = token.cancelled() => break,
                    received = receiver.recv() => match received {
                        Ok(event) => event,
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!(%consumer, skipped, "consumer lagged, events dropped");
                            continue;
                        }
                        Err(RecvError::Closed) => break,
                    },
                };
                tokio::select! {
                    () = token.cancelled() => break,
                    sent = sink.send(event) => if sent.is_err() {
                        break;
                    },
                }
            }
            tracing::debug!(%consumer, "consumer detached from event bus");
        });
        let previous = lock(&self.consumers).insert(id.to_string(), Registration { cancel, task });
        if let Some(previous) = previous {
            tracing::warn!(consumer = %id, "replacing existing consumer");
            previous.stop();
        }
    }

    fn remove_consumer(&self, id: &str) -> bool {
        let removed = lock(&self.consumers).remove(id);
        removed.map(Registration::stop).is_some()
    }
}
