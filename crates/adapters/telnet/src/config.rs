//! Telnet integration configuration.

use std::time::Duration;

use serde::Deserialize;

/// Configuration shared by every telnet-attached hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelnetConfig {
    /// Connections per hub when the device does not say otherwise.
    pub pool_size: usize,
    /// TCP connect timeout, in seconds.
    pub connect_timeout_secs: u64,
    /// How long to wait for a free pooled connection, in milliseconds.
    pub acquire_timeout_ms: u64,
    /// How long to wait for each login prompt, in seconds.
    pub auth_timeout_secs: u64,
    /// Interval between liveness probes on idle connections, in seconds.
    pub probe_interval_secs: u64,
    /// Wire text written as a liveness probe.
    pub probe_command: String,
    /// Delay before reconnecting a failed stream, in seconds.
    pub retry_delay_secs: u64,
    /// Events buffered between a hub stream and the event bus.
    pub delivery_capacity: usize,
    /// How long a full delivery queue may hold up the stream, in milliseconds.
    pub delivery_timeout_ms: u64,
}

impl Default for TelnetConfig {
    fn default() -> Self {
        Self {
            pool_size: 2,
            connect_timeout_secs: 5,
            acquire_timeout_ms: 2_000,
            auth_timeout_secs: 5,
            probe_interval_secs: 30,
            probe_command: "#PING\r\n".to_string(),
            retry_delay_secs: 10,
            delivery_capacity: 64,
            delivery_timeout_ms: 1_000,
        }
    }
}

impl TelnetConfig {
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    #[must_use]
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    #[must_use]
    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_secs)
    }

    #[must_use]
    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    #[must_use]
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}
