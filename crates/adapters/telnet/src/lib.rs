//! # homelink-adapter-telnet
//!
//! Telnet adapter — keeps authenticated connections to line-oriented
//! lighting hubs, turns their notification stream into events and sends
//! commands back.
//!
//! ## How it works
//!
//! Each addressable hub gets a [`ConnectionPool`] of authenticated TCP
//! connections. When the hub streams, one pooled connection is held by a
//! [`ProtocolStreamer`] that tokenizes the byte stream into frames
//! ([`FrameDecoder`]) and translates them into events
//! ([`CommandTranslator`]). Commands borrow another connection from the
//! same pool. Idle connections are probed periodically.
//!
//! ## Dependency rule
//!
//! Same as other adapters: depends on `homelink-app` and `homelink-domain`.

mod config;
mod connection;
mod error;
pub mod frame;
mod pool;
mod streamer;
pub mod translator;

#[cfg(test)]
pub(crate) mod testing;

pub use config::TelnetConfig;
pub use connection::{Connector, TcpConnector, authenticate};
pub use error::{AuthError, TelnetError, TranslateError};
pub use frame::FrameDecoder;
pub use pool::{ConnectionPool, PooledConnection};
pub use streamer::{ProtocolStreamer, StreamSettings, StreamState};
pub use translator::CommandTranslator;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::io::AsyncWriteExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use homelink_app::ports::{DeviceIntegration, ProducedEvents, Registry};
use homelink_domain::command::{Command, CommandIntent};
use homelink_domain::device::Device;
use homelink_domain::error::{ConflictError, HubError};
use homelink_domain::id::DeviceId;

struct HubLink {
    pool: ConnectionPool<TcpConnector>,
    cancel: CancellationToken,
    probe: JoinHandle<()>,
    stream: Option<(JoinHandle<()>, watch::Receiver<StreamState>)>,
}

/// Telnet integration serving every hub registered in `R`.
pub struct TelnetIntegration<R> {
    config: TelnetConfig,
    registry: R,
    hubs: Mutex<HashMap<DeviceId, HubLink>>,
}

impl<R: Registry> TelnetIntegration<R> {
    /// Create a new telnet integration with the given configuration.
    pub fn new(config: TelnetConfig, registry: R) -> Self {
        Self {
            config,
            registry,
            hubs: Mutex::new(HashMap::new()),
        }
    }

    fn hubs(&self) -> MutexGuard<'_, HashMap<DeviceId, HubLink>> {
        self.hubs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn pool_of(&self, hub_id: DeviceId) -> Result<ConnectionPool<TcpConnector>, TelnetError> {
        self.hubs()
            .get(&hub_id)
            .map(|link| link.pool.clone())
            .ok_or_else(|| TelnetError::UnknownDevice(hub_id.to_string()))
    }

    /// Streaming state of a hub, if it streams.
    #[must_use]
    pub fn stream_state(&self, hub_id: DeviceId) -> Option<watch::Receiver<StreamState>> {
        self.hubs()
            .get(&hub_id)
            .and_then(|link| link.stream.as_ref().map(|(_, state)| state.clone()))
    }

    /// Borrow a connection to the hub controlling `device_id`.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::NotFound`] when the device or its hub is unknown,
    /// or a transport error when no connection can be obtained.
    pub async fn connect(
        &self,
        device_id: DeviceId,
    ) -> Result<PooledConnection<TcpConnector>, HubError> {
        let hub = self
            .registry
            .controller_of(device_id)
            .ok_or_else(|| TelnetError::UnknownDevice(device_id.to_string()))?;
        let pool = self.pool_of(hub.id)?;
        Ok(pool.acquire().await?)
    }

    /// Give a borrowed connection back.
    pub fn release_connection(&self, conn: PooledConnection<TcpConnector>) {
        conn.release();
    }

    /// Build the pool, fill it, then start the streamer on a warm pool.
    async fn start_hub(
        &self,
        hub: Arc<Device>,
        pool_size: usize,
        stream: bool,
    ) -> Result<(HubLink, Option<ProducedEvents>, usize), TelnetError> {
        let pool = ConnectionPool::new(
            TcpConnector::new(&hub, &self.config),
            pool_size,
            self.config.acquire_timeout(),
        )?;
        let cancel = CancellationToken::new();
        let probe = pool.start_probing(
            self.config.probe_interval(),
            self.config.probe_command.clone(),
            cancel.child_token(),
        );
        let opened = pool.init().await;
        let mut link = HubLink {
            pool: pool.clone(),
            cancel: cancel.clone(),
            probe,
            stream: None,
        };
        if !stream {
            return Ok((link, None, opened));
        }
        let (tx, events) = mpsc::channel(self.config.delivery_capacity.max(1));
        let streamer = ProtocolStreamer::new(
            hub,
            pool,
            tx,
            StreamSettings {
                retry_delay: self.config.retry_delay(),
                delivery_timeout: self.config.delivery_timeout(),
            },
        );
        let state = streamer.subscribe_state();
        let task = tokio::spawn(streamer.run(cancel.clone()));
        link.stream = Some((task, state));
        Ok((link, Some(ProducedEvents { events, cancel }), opened))
    }

    async fn stop_hub(link: HubLink) {
        link.cancel.cancel();
        link.pool.close();
        if let Some((task, _)) = link.stream {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "stream task ended abnormally");
            }
        }
        if let Err(err) = link.probe.await {
            tracing::warn!(error = %err, "probe task ended abnormally");
        }
    }
}

impl<R: Registry + 'static> DeviceIntegration for TelnetIntegration<R> {
    fn name(&self) -> &'static str {
        "telnet"
    }

    #[tracing::instrument(skip(self, device), fields(hub = %device.name))]
    async fn init_device(&self, device: Arc<Device>) -> Result<Option<ProducedEvents>, HubError> {
        let Some(settings) = device.connection else {
            return Ok(None);
        };
        if self.hubs().contains_key(&device.id) {
            return Err(ConflictError::AlreadyStreaming(device.name.clone()).into());
        }

        let hub_id = device.id;
        let (link, produced, opened) = self
            .start_hub(Arc::clone(&device), settings.pool_size, settings.stream)
            .await?;
        if opened == 0 {
            tracing::warn!(address = %device.address, "hub unreachable, retrying in background");
        }

        let rejected = {
            let mut hubs = self.hubs();
            if hubs.contains_key(&hub_id) {
                Some(link)
            } else {
                hubs.insert(hub_id, link);
                None
            }
        };
        if let Some(link) = rejected {
            Self::stop_hub(link).await;
            return Err(ConflictError::AlreadyStreaming(device.name.clone()).into());
        }
        tracing::info!(connections = opened, streaming = settings.stream, "hub initialised");
        Ok(produced)
    }

    #[tracing::instrument(skip(self))]
    async fn stop_device(&self, id: DeviceId) -> Result<(), HubError> {
        let link = self.hubs().remove(&id);
        if let Some(link) = link {
            Self::stop_hub(link).await;
            tracing::info!("hub stopped");
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, intent), fields(intent = %intent))]
    async fn send_command(&self, intent: CommandIntent) -> Result<Command, HubError> {
        let target = match &intent {
            CommandIntent::SetZoneLevel { zone_id, .. } => {
                let zone = self.registry.zone(*zone_id).ok_or_else(|| {
                    TelnetError::from(TranslateError::Unresolved {
                        kind: "zone",
                        id: zone_id.to_string(),
                    })
                })?;
                zone.device_id
            }
            CommandIntent::PressButton { device_id, .. }
            | CommandIntent::ReleaseButton { device_id, .. } => *device_id,
        };
        let hub = self
            .registry
            .controller_of(target)
            .ok_or_else(|| TelnetError::UnknownDevice(target.to_string()))?;
        let command = CommandTranslator
            .render(&hub, &intent)
            .map_err(TelnetError::from)?;

        let mut conn = self.pool_of(hub.id)?.acquire().await?;
        let written = async {
            conn.write_all(command.wire.as_bytes()).await?;
            conn.flush().await
        }
        .await;
        if let Err(err) = written {
            conn.invalidate();
            return Err(TelnetError::Io(err).into());
        }
        tracing::info!(%command, "command sent");
        Ok(command)
    }

    async fn teardown(&self) -> Result<(), HubError> {
        let links: Vec<_> = self.hubs().drain().map(|(_, link)| link).collect();
        for link in links {
            Self::stop_hub(link).await;
        }
        tracing::debug!("telnet integration torn down");
        Ok(())
    }
}
