//! Telnet adapter error types.

use std::time::Duration;

use homelink_domain::error::{HubError, NotFoundError, ValidationError};

/// Failures of the login/password handshake on a fresh connection.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("timed out waiting for the {0} prompt")]
    Timeout(&'static str),

    #[error("connection closed before the {0} prompt")]
    Closed(&'static str),

    #[error("handshake i/o failed")]
    Io(#[from] std::io::Error),
}

/// Why a frame or an intent could not be translated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    /// The frame is not well formed (a dropped frame, never fatal).
    #[error("malformed frame {0:?}")]
    Parse(String),

    /// The frame or intent names an entity this hub does not know.
    #[error("unknown {kind} {id}")]
    Unresolved { kind: &'static str, id: String },

    #[error("intensity {0} is outside 0..=100")]
    IntensityOutOfRange(f64),

    /// The target exists but cannot carry out the request.
    #[error("unsupported target: {0}")]
    UnsupportedTarget(String),
}

/// Errors specific to the telnet adapter.
#[derive(Debug, thiserror::Error)]
pub enum TelnetError {
    #[error("failed to connect to {address}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out connecting to {0}")]
    ConnectTimeout(String),

    #[error("authentication failed")]
    Auth(#[from] AuthError),

    #[error("no pooled connection became available within {0:?}")]
    PoolExhausted(Duration),

    #[error("connection pool is closed")]
    PoolClosed,

    #[error("connection i/o failed")]
    Io(#[from] std::io::Error),

    #[error("remote end closed the stream")]
    StreamClosed,

    #[error("translation failed")]
    Translate(#[from] TranslateError),

    /// The device is unknown to the registry or has no live pool.
    #[error("device {0} is not connected")]
    UnknownDevice(String),

    /// A domain-level error (validation, conflict, etc.).
    #[error("domain error")]
    Domain(#[source] HubError),
}

impl TelnetError {
    /// Convert into a [`HubError`] for propagation across port boundaries.
    pub fn into_domain(self) -> HubError {
        match self {
            Self::Domain(err) => err,
            Self::UnknownDevice(id) => NotFoundError {
                entity: "Device",
                id,
            }
            .into(),
            Self::Translate(TranslateError::Unresolved { kind, id }) => NotFoundError {
                entity: kind,
                id,
            }
            .into(),
            Self::Translate(TranslateError::IntensityOutOfRange(intensity)) => {
                ValidationError::IntensityOutOfRange(intensity).into()
            }
            other => HubError::Transport(Box::new(other)),
        }
    }
}

impl From<TelnetError> for HubError {
    fn from(err: TelnetError) -> Self {
        err.into_domain()
    }
}

impl From<HubError> for TelnetError {
    fn from(err: HubError) -> Self {
        Self::Domain(err)
    }
}
