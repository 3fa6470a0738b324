//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`CatpointError`] via `From`.

use std::error::Error;

/// Boxed error coming from an adapter (storage backend, classifier, bus).
pub type BoxedError = Box<dyn Error + Send + Sync>;

/// Top-level error returned by services and ports.
#[derive(Debug, thiserror::Error)]
pub enum CatpointError {
    /// A domain invariant was violated.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The repository failed to read or write.
    #[error("storage error")]
    Storage(#[source] BoxedError),

    /// The image classifier could not be invoked.
    #[error("image classifier error")]
    Classifier(#[source] BoxedError),

    /// An event could not be handed to the event bus.
    #[error("event bus error")]
    EventBus(#[source] BoxedError),
}

/// Violations of domain invariants.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("sensor name must not be empty")]
    EmptySensorName,

    #[error("confidence threshold {0} is outside 0..=100")]
    InvalidConfidenceThreshold(f32),

    #[error("unknown sensor type `{0}`")]
    UnknownSensorType(String),

    #[error("unknown alarm status `{0}`")]
    UnknownAlarmStatus(String),

    #[error("unknown arming status `{0}`")]
    UnknownArmingStatus(String),
}
