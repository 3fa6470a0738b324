//! Security events — immutable records of status and sensor changes.
//!
//! The security service publishes one event per observable change so that
//! presentation layers can refresh without polling the repository.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::status::{AlarmStatus, ArmingStatus};

/// UTC timestamp attached to every event.
pub type Timestamp = DateTime<Utc>;

/// Unique identifier for a [`SecurityEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(uuid::Uuid);

impl Default for EventId {
    fn default() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl EventId {
    /// Generate a new random identifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_uuid(self) -> uuid::Uuid {
        self.0
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for EventId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        uuid::Uuid::parse_str(s).map(Self)
    }
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecurityEventKind {
    /// The alarm status was written.
    AlarmStatusChanged { status: AlarmStatus },
    /// The arming status was written.
    ArmingStatusChanged { status: ArmingStatus },
    /// A camera image was classified.
    CatDetected { detected: bool },
    /// A sensor was added, removed, or had its activation flag changed.
    SensorsChanged,
}

/// An event published by the security service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: EventId,
    #[serde(flatten)]
    pub kind: SecurityEventKind,
    pub timestamp: Timestamp,
}

impl SecurityEvent {
    /// Stamp `kind` with a fresh id and the current time.
    #[must_use]
    pub fn new(kind: SecurityEventKind) -> Self {
        Self {
            id: EventId::new(),
            kind,
            timestamp: Utc::now(),
        }
    }

    #[must_use]
    pub fn alarm_status_changed(status: AlarmStatus) -> Self {
        Self::new(SecurityEventKind::AlarmStatusChanged { status })
    }

    #[must_use]
    pub fn arming_status_changed(status: ArmingStatus) -> Self {
        Self::new(SecurityEventKind::ArmingStatusChanged { status })
    }

    #[must_use]
    pub fn cat_detected(detected: bool) -> Self {
        Self::new(SecurityEventKind::CatDetected { detected })
    }

    #[must_use]
    pub fn sensors_changed() -> Self {
        Self::new(SecurityEventKind::SensorsChanged)
    }
}

impl fmt::Display for SecurityEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SecurityEventKind::AlarmStatusChanged { status } => {
                write!(f, "alarm status: {}", status.description())
            }
            SecurityEventKind::ArmingStatusChanged { status } => {
                write!(f, "arming status: {}", status.description())
            }
            SecurityEventKind::CatDetected { detected: true } => {
                f.write_str("DANGER - CAT DETECTED")
            }
            SecurityEventKind::CatDetected { detected: false } => f.write_str("no cat detected"),
            SecurityEventKind::SensorsChanged => f.write_str("sensors changed"),
        }
    }
}
