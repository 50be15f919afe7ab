//! Per-device streaming loop.
//!
//! ```text
//! Disconnected ─▶ Connecting ─▶ Streaming ─┐
//!      ▲                                    │ read/connect failure
//!      └──────────── retry delay ◀──────────┘
//! ```
//!
//! The loop runs until its cancellation token fires or the receiver of its
//! events goes away, then settles in [`StreamState::Stopped`].

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::SendTimeoutError;
use tokio::sync::{mpsc, watch};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;

use homelink_domain::device::Device;
use homelink_domain::event::Event;

use crate::connection::Connector;
use crate::error::TelnetError;
use crate::frame::FrameDecoder;
use crate::pool::ConnectionPool;
use crate::translator::CommandTranslator;

/// Observable state of a [`ProtocolStreamer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Disconnected,
    Connecting,
    Streaming,
    Stopped,
}

/// Timing of the streaming loop.
#[derive(Debug, Clone, Copy)]
pub struct StreamSettings {
    pub retry_delay: Duration,
    /// How long a full delivery queue may block the loop before the event is dropped.
    pub delivery_timeout: Duration,
}

enum Exit {
    Cancelled,
    ReceiverGone,
}

/// Reads one hub's connection and emits its events in arrival order.
pub struct ProtocolStreamer<C: Connector> {
    hub: Arc<Device>,
    pool: ConnectionPool<C>,
    events: mpsc::Sender<Event>,
    state: watch::Sender<StreamState>,
    settings: StreamSettings,
}

impl<C: Connector> ProtocolStreamer<C> {
    pub fn new(
        hub: Arc<Device>,
        pool: ConnectionPool<C>,
        events: mpsc::Sender<Event>,
        settings: StreamSettings,
    ) -> Self {
        let (state, _) = watch::channel(StreamState::Disconnected);
        Self {
            hub,
            pool,
            events,
            state,
            settings,
        }
    }

    /// Watch the loop's state.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: StreamState) {
        self.state.send_replace(state);
    }

    /// Connect, stream and retry until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        while !cancel.is_cancelled() {
            self.set_state(StreamState::Connecting);
            match self.stream_once(&cancel).await {
                Ok(Exit::Cancelled) => break,
                Ok(Exit::ReceiverGone) => {
                    tracing::debug!(hub = %self.hub.name, "event receiver gone, stopping stream");
                    break;
                }
                Err(err) => tracing::warn!(
                    hub = %self.hub.name,
                    error = %err,
                    retry_in = ?self.settings.retry_delay,
                    "stream failed"
                ),
            }
            self.set_state(StreamState::Disconnected);
            tokio::select! {
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(self.settings.retry_delay) => {}
            }
        }
        self.set_state(StreamState::Stopped);
        tracing::info!(hub = %self.hub.name, "stream stopped");
    }

    async fn stream_once(&self, cancel: &CancellationToken) -> Result<Exit, TelnetError> {
        let mut conn = tokio::select! {
            () = cancel.cancelled() => return Ok(Exit::Cancelled),
            conn = self.pool.acquire() => conn?,
        };
        self.set_state(StreamState::Streaming);
        tracing::info!(hub = %self.hub.name, "streaming");

        let mut frames = FramedRead::new(&mut conn, FrameDecoder::new());
        let outcome = loop {
            let next = tokio::select! {
                () = cancel.cancelled() => break Ok(Exit::Cancelled),
                next = frames.next() => next,
            };
            match next {
                None => break Err(TelnetError::StreamClosed),
                Some(Err(err)) => break Err(err.into()),
                Some(Ok(frame)) => {
                    if let Err(exit) = self.handle_frame(&frame).await {
                        break Ok(exit);
                    }
                }
            }
        };
        drop(frames);
        if outcome.is_err() {
            conn.invalidate();
        }
        outcome
    }

    async fn handle_frame(&self, frame: &str) -> Result<(), Exit> {
        let event = match CommandTranslator.translate(&self.hub, frame) {
            Ok(Some(event)) => event,
            Ok(None) => {
                tracing::debug!(hub = %self.hub.name, frame, "frame ignored");
                return Ok(());
            }
            Err(err) => {
                tracing::debug!(hub = %self.hub.name, frame, error = %err, "frame dropped");
                return Ok(());
            }
        };
        match self
            .events
            .send_timeout(event, self.settings.delivery_timeout)
            .await
        {
            Ok(()) => Ok(()),
            Err(SendTimeoutError::Timeout(event)) => {
                tracing::warn!(hub = %self.hub.name, raw = %event.raw.trim_end(), "delivery queue full, event dropped");
                Ok(())
            }
            Err(SendTimeoutError::Closed(_)) => Err(Exit::ReceiverGone),
        }
    }
}
