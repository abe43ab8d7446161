use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;

use super::{queries, DbPool};
use crate::error::StoreError;
use crate::models::{FlightCode, FlightKey, ProgressFlag, TrackedFlight};

/// Keyed table of tracked flights. Every mutation addresses a single row by
/// its primary key so the command front end and the poller never need a
/// read-modify-write cycle.
#[async_trait]
pub trait FlightStore: Send + Sync {
    async fn list_all(&self) -> Result<Vec<TrackedFlight>, StoreError>;

    /// Rows whose landing was recorded but which were never removed.
    async fn list_landed(&self) -> Result<Vec<TrackedFlight>, StoreError>;

    /// Idempotent insert. Returns false when the key already existed.
    async fn upsert(
        &self,
        flight_id: &FlightCode,
        departure_date: DateTime<Utc>,
        channel_id: &str,
    ) -> Result<bool, StoreError>;

    /// Removes the row with the most recent departure date for this code.
    async fn delete_latest(&self, flight_id: &FlightCode) -> Result<bool, StoreError>;

    async fn delete(&self, key: &FlightKey) -> Result<bool, StoreError>;

    /// Removes every row departing before `cutoff`, returning their keys.
    async fn delete_departed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FlightKey>, StoreError>;

    /// Fails with [`StoreError::Missing`] if the row is gone.
    async fn set_flag(
        &self,
        key: &FlightKey,
        flag: ProgressFlag,
        value: bool,
    ) -> Result<(), StoreError>;

    /// Moves `last_cruise_notif` forward to `ts`; never backwards.
    async fn set_cruise_timestamp(
        &self,
        key: &FlightKey,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, FromRow)]
struct TrackedFlightRow {
    flight_id: String,
    date_departure: DateTime<Utc>,
    channel_id: String,
    notified_pre_departure: bool,
    notified_takeoff: bool,
    last_cruise_notif: Option<DateTime<Utc>>,
    notified_landing: bool,
}

impl From<TrackedFlightRow> for TrackedFlight {
    fn from(row: TrackedFlightRow) -> Self {
        TrackedFlight {
            flight_id: FlightCode::from_stored(row.flight_id),
            departure_date: row.date_departure,
            channel_id: row.channel_id,
            notified_pre_departure: row.notified_pre_departure,
            notified_takeoff: row.notified_takeoff,
            last_cruise_notif: row.last_cruise_notif,
            notified_landing: row.notified_landing,
        }
    }
}

#[derive(Clone)]
pub struct PgFlightStore {
    pool: DbPool,
}

impl PgFlightStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<TrackedFlight>, StoreError> {
        let rows: Vec<TrackedFlightRow> = sqlx::query_as(sql).fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(TrackedFlight::from).collect())
    }
}

#[async_trait]
impl FlightStore for PgFlightStore {
    async fn list_all(&self) -> Result<Vec<TrackedFlight>, StoreError> {
        self.fetch_rows(queries::SELECT_ALL_FLIGHTS).await
    }

    async fn list_landed(&self) -> Result<Vec<TrackedFlight>, StoreError> {
        self.fetch_rows(queries::SELECT_LANDED_FLIGHTS).await
    }

    async fn upsert(
        &self,
        flight_id: &FlightCode,
        departure_date: DateTime<Utc>,
        channel_id: &str,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::INSERT_FLIGHT)
            .bind(flight_id.as_str())
            .bind(departure_date)
            .bind(channel_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_latest(&self, flight_id: &FlightCode) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::DELETE_LATEST_FLIGHT)
            .bind(flight_id.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, key: &FlightKey) -> Result<bool, StoreError> {
        let result = sqlx::query(queries::DELETE_FLIGHT)
            .bind(key.flight_id.as_str())
            .bind(key.departure_date)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_departed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FlightKey>, StoreError> {
        let rows: Vec<(String, DateTime<Utc>)> = sqlx::query_as(queries::DELETE_EXPIRED_FLIGHTS)
            .bind(cutoff)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(flight_id, departure_date)| FlightKey {
                flight_id: FlightCode::from_stored(flight_id),
                departure_date,
            })
            .collect())
    }

    async fn set_flag(
        &self,
        key: &FlightKey,
        flag: ProgressFlag,
        value: bool,
    ) -> Result<(), StoreError> {
        let sql = match flag {
            ProgressFlag::PreDeparture => queries::SET_NOTIFIED_PRE_DEPARTURE,
            ProgressFlag::Takeoff => queries::SET_NOTIFIED_TAKEOFF,
            ProgressFlag::Landing => queries::SET_NOTIFIED_LANDING,
        };
        let result = sqlx::query(sql)
            .bind(key.flight_id.as_str())
            .bind(key.departure_date)
            .bind(value)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(key.to_string()));
        }
        Ok(())
    }

    async fn set_cruise_timestamp(
        &self,
        key: &FlightKey,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(queries::SET_LAST_CRUISE_NOTIF)
            .bind(key.flight_id.as_str())
            .bind(key.departure_date)
            .bind(ts)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(key.to_string()));
        }
        Ok(())
    }
}
