//! Event bus port — publish/subscribe for device events.
//!
//! Producers hand the bus an [`EventStream`] plus a cancellation token;
//! consumers hand it an [`EventSink`]. Unregistering a producer cancels its
//! token, unregistering a consumer drops its sink.

use std::future::Future;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use homelink_domain::error::HubError;
use homelink_domain::event::Event;

/// Receiving half of a producer's per-device delivery queue.
pub type EventStream = mpsc::Receiver<Event>;

/// Sending half handed out by a consumer (a recipe).
pub type EventSink = mpsc::Sender<Event>;

/// What a device returns when it starts producing events.
#[derive(Debug)]
pub struct ProducedEvents {
    pub events: EventStream,
    /// Cancelling this stops the producer (e.g. on device removal).
    pub cancel: CancellationToken,
}

/// Publishes events to all current subscribers.
pub trait EventPublisher {
    /// Publish an event to all current subscribers.
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send;
}

impl<T: EventPublisher + Send + Sync> EventPublisher for std::sync::Arc<T> {
    fn publish(&self, event: Event) -> impl Future<Output = Result<(), HubError>> + Send {
        (**self).publish(event)
    }
}

/// Registration of producers and consumers, safe to call concurrently.
pub trait EventDistributor: EventPublisher + Send + Sync {
    /// Start forwarding `produced` onto the bus under `name`, replacing any
    /// producer already registered under that name.
    fn add_producer(&self, name: &str, produced: ProducedEvents);

    /// Stop forwarding and cancel the producer. Returns `false` if unknown.
    fn remove_producer(&self, name: &str) -> bool;

    /// Start delivering every published event to `sink`.
    fn add_consumer(&self, id: &str, sink: EventSink);

    /// Stop delivering to the consumer and drop its sink. Returns `false` if unknown.
    fn remove_consumer(&self, id: &str) -> bool;
}

impl<T: EventDistributor> EventDistributor for std::sync::Arc<T> {
    fn add_producer(&self, name: &str, produced: ProducedEvents) {
        (**self).add_producer(name, produced);
    }

    fn remove_producer(&self, name: &str) -> bool {
        (**self).remove_producer(name)
    }

    fn add_consumer(&self, id: &str, sink: EventSink) {
        (**self).add_consumer(id, sink);
    }

    fn remove_consumer(&self, id: &str) -> bool {
        (**self).remove_consumer(id)
    }
}
