//! `SQLite` implementation of [`SecurityRepository`].
//!
//! Sensors live in their own table keyed by `(name, sensor_type)`. The two
//! statuses are stored as rows of a small key/value `preferences` table.

use std::collections::BTreeSet;
use std::future::Future;
use std::str::FromStr;

use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row, SqlitePool};

use catpoint_app::ports::SecurityRepository;
use catpoint_domain::error::CatpointError;
use catpoint_domain::sensor::{Sensor, SensorType};
use catpoint_domain::status::{AlarmStatus, ArmingStatus};

use crate::error::StorageError;

/// Wrapper for converting database rows into domain [`Sensor`].
struct Wrapper(Sensor);

impl<'r> FromRow<'r, SqliteRow> for Wrapper {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let name: String = row.try_get("name")?;
        let sensor_type: String = row.try_get("sensor_type")?;
        let active: bool = row.try_get("active")?;

        let sensor_type =
            SensorType::from_str(&sensor_type).map_err(|err| sqlx::Error::Decode(Box::new(err)))?;

        Ok(Self(Sensor::new(name, sensor_type).with_active(active)))
    }
}

const ALARM_STATUS_KEY: &str = "alarm_status";
const ARMING_STATUS_KEY: &str = "arming_status";

const SELECT_SENSORS: &str = "SELECT name, sensor_type, active FROM sensors";
const INSERT_SENSOR: &str = "INSERT INTO sensors (name, sensor_type, active) VALUES (?, ?, ?) \
     ON CONFLICT (name, sensor_type) DO NOTHING";
const UPSERT_SENSOR: &str = "INSERT INTO sensors (name, sensor_type, active) VALUES (?, ?, ?) \
     ON CONFLICT (name, sensor_type) DO UPDATE SET active = excluded.active";
const DELETE_SENSOR: &str = "DELETE FROM sensors WHERE name = ? AND sensor_type = ?";
const SELECT_PREFERENCE: &str = "SELECT value FROM preferences WHERE key = ?";
const UPSERT_PREFERENCE: &str = "INSERT INTO preferences (key, value) VALUES (?, ?) \
     ON CONFLICT (key) DO UPDATE SET value = excluded.value";

/// `SQLite`-backed security repository.
pub struct SqliteSecurityRepository {
    pool: SqlitePool,
}

impl SqliteSecurityRepository {
    /// Create a new repository using the given connection pool.
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

async fn read_preference(pool: &SqlitePool, key: &str) -> Result<Option<String>, StorageError> {
    let row: Option<(String,)> = sqlx::query_as(SELECT_PREFERENCE)
        .bind(key)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(|(value,)| value))
}

async fn write_preference(pool: &SqlitePool, key: &str, value: String) -> Result<(), StorageError> {
    sqlx::query(UPSERT_PREFERENCE)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

async fn write_sensor(pool: &SqlitePool, query: &str, sensor: &Sensor) -> Result<(), StorageError> {
    sqlx::query(query)
        .bind(&sensor.name)
        .bind(sensor.sensor_type.to_string())
        .bind(sensor.active)
        .execute(pool)
        .await?;
    Ok(())
}

impl SecurityRepository for SqliteSecurityRepository {
    fn alarm_status(&self) -> impl Future<Output = Result<AlarmStatus, CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            let stored = read_preference(&pool, ALARM_STATUS_KEY).await?;
            let status = stored
                .map(|value| AlarmStatus::from_str(&value))
                .transpose()
                .map_err(StorageError::from)?;
            Ok(status.unwrap_or_default())
        }
    }

    fn set_alarm_status(
        &self,
        status: AlarmStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            write_preference(&pool, ALARM_STATUS_KEY, status.to_string()).await?;
            Ok(())
        }
    }

    fn arming_status(&self) -> impl Future<Output = Result<ArmingStatus, CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            let stored = read_preference(&pool, ARMING_STATUS_KEY).await?;
            let status = stored
                .map(|value| ArmingStatus::from_str(&value))
                .transpose()
                .map_err(StorageError::from)?;
            Ok(status.unwrap_or_default())
        }
    }

    fn set_arming_status(
        &self,
        status: ArmingStatus,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            write_preference(&pool, ARMING_STATUS_KEY, status.to_string()).await?;
            Ok(())
        }
    }

    fn sensors(&self) -> impl Future<Output = Result<BTreeSet<Sensor>, CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            let rows: Vec<Wrapper> = sqlx::query_as(SELECT_SENSORS)
                .fetch_all(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(rows.into_iter().map(|w| w.0).collect())
        }
    }

    fn add_sensor(&self, sensor: Sensor) -> impl Future<Output = Result<(), CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            write_sensor(&pool, INSERT_SENSOR, &sensor).await?;
            Ok(())
        }
    }

    fn remove_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            sqlx::query(DELETE_SENSOR)
                .bind(&sensor.name)
                .bind(sensor.sensor_type.to_string())
                .execute(&pool)
                .await
                .map_err(StorageError::from)?;

            Ok(())
        }
    }

    fn update_sensor(
        &self,
        sensor: Sensor,
    ) -> impl Future<Output = Result<(), CatpointError>> + Send {
        let pool = self.pool.clone();
        async move {
            write_sensor(&pool, UPSERT_SENSOR, &sensor).await?;
            Ok(())
        }
    }
}
