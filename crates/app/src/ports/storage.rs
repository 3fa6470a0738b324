//! Storage port — the security repository.
//!
//! The repository is the single owner of the sensor set and of both
//! statuses; the application layer keeps no private copy of either.

use std::collections::BTreeSet;
use std::future::Future;

use catpoint_domain::error::CatpointError;
use catpoint_domain::sensor::Sensor;
use catpoint_domain::status::{AlarmStatus, ArmingStatus};

/// Durable store of sensors and the current arming/alarm status.
///
/// Sensors are unique by identity (`name` + `sensor_type`).
pub trait SecurityRepository {
    /// Current alarm status. A fresh store reports [`AlarmStatus::NoAlarm`].
    fn alarm_status(&self) -> impl Future<Output = Result<AlarmStatus, CatpointError>> + Send;

    /// Persist a new alarm status.
    fn set_alarm_status(
        &self,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send;

    /// Current arming status. A fresh store reports [`ArmingStatus::Disarmed`].
    fn arming_status(&self) -> impl Future<Output = Result<ArmingStatus, CatpointError>> + Send;

    /// Persist a new arming status.
    fn set_arming_status(
        &self,
        status: ArmingStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send;

    /// Every tracked sensor with its stored activation flag.
    fn sensors(&self) -> impl Future<Output = Result<BTreeSet<Sensor>, CatpointError>> + Send;

    /// Start tracking a sensor. Adding a sensor that is already tracked
    /// leaves the stored one untouched.
    fn add_sensor(&self, sensor: Sensor) -> impl Future<Output = Result<(), CatpointError>> + Send;

    /// Stop tracking a sensor. Unknown sensors are ignored.
    fn remove_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send;

    /// Persist the activation flag of a sensor, replacing the stored record.
    fn update_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send;
}

impl<T: SecurityRepository + Send + Sync> SecurityRepository for std::sync::Arc<T> {
    fn alarm_status(&self) -> impl Future<Output = Result<AlarmStatus, CatpointError>> + Send {
        (**self).alarm_status()
    }

    fn set_alarm_status(
        &self,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        (**self).set_alarm_status(status)
    }

    fn arming_status(&self) -> impl Future<Output = Result<ArmingStatus, CatpointError>> + Send {
        (**self).arming_status()
    }

    fn set_arming_status(
        &self,
        status: ArmingStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        (**self).set_arming_status(status)
    }

    fn sensors(&self) -> impl Future<Output = Result<BTreeSet<Sensor>, CatpointError>> + Send {
        (**self).sensors()
    }

    fn add_sensor(&self, sensor: Sensor) -> impl Future<Output = Result<(), CatpointError>> + Send {
        (**self).add_sensor(sensor)
    }

    fn remove_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        (**self).remove_sensor(sensor)
    }

    fn update_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        (**self).update_sensor(sensor)
    }
}
