//! Arming and alarm statuses.
//!
//! The two statuses are stored independently; only the security service
//! links them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// The alarm escalation ladder.
///
/// Variants are declared in order of severity, so the derived [`Ord`]
/// gives `NoAlarm < PendingAlarm < Alarm`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlarmStatus {
    #[default]
    NoAlarm,
    PendingAlarm,
    Alarm,
}

impl AlarmStatus {
    /// Human readable description shown to the occupant.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::NoAlarm => "Cool and Good",
            Self::PendingAlarm => "I'm in Danger...",
            Self::Alarm => "Awooga!",
        }
    }

    /// The next rung of the ladder. [`Alarm`](Self::Alarm) is terminal.
    #[must_use]
    pub fn escalated(self) -> Self {
        match self {
            Self::NoAlarm => Self::PendingAlarm,
            Self::PendingAlarm | Self::Alarm => Self::Alarm,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::NoAlarm => "no_alarm",
            Self::PendingAlarm => "pending_alarm",
            Self::Alarm => "alarm",
        }
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlarmStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no_alarm" => Ok(Self::NoAlarm),
            "pending_alarm" => Ok(Self::PendingAlarm),
            "alarm" => Ok(Self::Alarm),
            other => Err(ValidationError::UnknownAlarmStatus(other.to_string())),
        }
    }
}

/// Whether the system is disarmed or armed, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmingStatus {
    #[default]
    Disarmed,
    ArmedHome,
    ArmedAway,
}

impl ArmingStatus {
    /// Human readable description shown to the occupant.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Disarmed => "Disarmed",
            Self::ArmedHome => "Armed - At Home",
            Self::ArmedAway => "Armed - Away",
        }
    }

    /// Both armed variants.
    #[must_use]
    pub fn is_armed(self) -> bool {
        !matches!(self, Self::Disarmed)
    }

    fn as_str(self) -> &'static str {
        match self {
            Self::Disarmed => "disarmed",
            Self::ArmedHome => "armed_home",
            Self::ArmedAway => "armed_away",
        }
    }
}

impl fmt::Display for ArmingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArmingStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disarmed" => Ok(Self::Disarmed),
            "armed_home" => Ok(Self::ArmedHome),
            "armed_away" => Ok(Self::ArmedAway),
            other => Err(ValidationError::UnknownArmingStatus(other.to_string())),
        }
    }
}
