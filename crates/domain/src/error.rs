//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`HubError`]
//! via `#[from]` (or an explicit `into_domain`) at port boundaries.

/// Base error returned across port boundaries.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("conflict")]
    Conflict(#[from] ConflictError),

    /// Connect, authentication, pool or stream failure inside an adapter.
    #[error("transport error")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A recipe action could not complete.
    #[error("action execution failed: {0}")]
    Action(String),
}

/// A domain invariant was violated.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("local id must not be empty")]
    EmptyLocalId,

    #[error("address must not be empty")]
    EmptyAddress,

    #[error("pool size must be at least 1")]
    EmptyPool,

    #[error("intensity {0} is outside 0..=100")]
    IntensityOutOfRange(f64),

    #[error("{kind} with local id {local_id:?} already exists")]
    DuplicateLocalId {
        kind: &'static str,
        local_id: String,
    },

    #[error("invalid time of day {0:?}, expected HH:MM")]
    InvalidTimeOfDay(String),

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{0} is required")]
    Missing(&'static str),

    #[error("range {min}..={max} is empty")]
    EmptyRange { min: f64, max: f64 },
}

/// A referenced entity does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// An operation collides with existing state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConflictError {
    #[error("device {0} is already registered")]
    DuplicateDevice(String),

    #[error("device {0} is already streaming")]
    AlreadyStreaming(String),

    #[error("recipe {0} has already been started")]
    AlreadyStarted(String),
}
