//! In-memory stand-ins for the store, fetcher, sink and map publisher.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;
use tokio::sync::mpsc;

use crate::commands::{CommandReplier, CommandResponse};
use crate::context::AppContext;
use crate::db::FlightStore;
use crate::delivery::{DeliverySink, MapRenderer, MapUploader, SlackMessage};
use crate::error::{DeliveryError, FetchError, MapError, StoreError};
use crate::fetcher::SnapshotFetcher;
use crate::models::snapshot::{Airport, Schedule};
use crate::models::{
    FlightCode, FlightKey, FlightSnapshot, FlightStatus, ProgressFlag, TrackPoint, TrackedFlight,
};

/// 2025-03-01 12:00 UTC
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
}

pub fn flight(code: &str) -> TrackedFlight {
    TrackedFlight::new(
        FlightCode::parse(code).unwrap(),
        Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap(),
        "C123",
    )
}

/// A resolved snapshot whose scheduled departure is an hour before [`t0`].
pub fn snapshot(status: FlightStatus) -> FlightSnapshot {
    FlightSnapshot {
        airline: "American Airlines".to_string(),
        status,
        schedule: Schedule {
            departure_scheduled: Some(t0() - chrono::Duration::hours(1)),
            arrival_scheduled: Some(t0() + chrono::Duration::hours(5)),
            ..Schedule::default()
        },
        origin: Airport {
            iata: "JFK".to_string(),
            terminal: Some("8".to_string()),
            gate: Some("B2".to_string()),
        },
        destination: Airport {
            iata: "LAX".to_string(),
            terminal: Some("4".to_string()),
            gate: Some("44".to_string()),
        },
        aircraft_type: "B738".to_string(),
        aircraft_name: "Boeing 737-800".to_string(),
        track: Vec::new(),
        heading: Some(270.0),
        groundspeed: Some(450),
        altitude: Some(35000),
        distance_remaining: Some(1200),
    }
}

pub fn track_point(timestamp: DateTime<Utc>, lat: f64, lon: f64) -> TrackPoint {
    TrackPoint {
        timestamp,
        lat,
        lon,
    }
}

pub fn context(
    store: Arc<dyn FlightStore>,
    fetcher: Arc<dyn SnapshotFetcher>,
    sink: Arc<dyn DeliverySink>,
) -> AppContext {
    AppContext {
        store,
        fetcher,
        sink,
        maps: None,
        replier: Arc::new(RecordingReplier::default()),
    }
}

#[derive(Default)]
pub struct MemoryStore {
    rows: Mutex<BTreeMap<FlightKey, TrackedFlight>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn with(flights: Vec<TrackedFlight>) -> Self {
        let store = Self::default();
        {
            let mut rows = store.rows.lock().unwrap();
            for f in flights {
                rows.insert(f.key(), f);
            }
        }
        store
    }

    pub fn get(&self, key: &FlightKey) -> Option<TrackedFlight> {
        self.rows.lock().unwrap().get(key).cloned()
    }

    pub fn all(&self) -> Vec<TrackedFlight> {
        self.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StoreError::Injected)
        } else {
            Ok(())
        }
    }

    fn update(
        &self,
        key: &FlightKey,
        f: impl FnOnce(&mut TrackedFlight),
    ) -> Result<(), StoreError> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let row = rows
            .get_mut(key)
            .ok_or_else(|| StoreError::Missing(key.to_string()))?;
        f(row);
        Ok(())
    }
}

#[async_trait]
impl FlightStore for MemoryStore {
    async fn list_all(&self) -> Result<Vec<TrackedFlight>, StoreError> {
        Ok(self.all())
    }

    async fn list_landed(&self) -> Result<Vec<TrackedFlight>, StoreError> {
        Ok(self.all().into_iter().filter(|f| f.notified_landing).collect())
    }

    async fn upsert(
        &self,
        flight_id: &FlightCode,
        departure_date: DateTime<Utc>,
        channel_id: &str,
    ) -> Result<bool, StoreError> {
        self.check_writable()?;
        let flight = TrackedFlight::new(flight_id.clone(), departure_date, channel_id);
        let mut rows = self.rows.lock().unwrap();
        if rows.contains_key(&flight.key()) {
            return Ok(false);
        }
        rows.insert(flight.key(), flight);
        Ok(true)
    }

    async fn delete_latest(&self, flight_id: &FlightCode) -> Result<bool, StoreError> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let latest = rows
            .keys()
            .filter(|k| &k.flight_id == flight_id)
            .max_by_key(|k| k.departure_date)
            .cloned();
        Ok(latest.and_then(|k| rows.remove(&k)).is_some())
    }

    async fn delete(&self, key: &FlightKey) -> Result<bool, StoreError> {
        self.check_writable()?;
        Ok(self.rows.lock().unwrap().remove(key).is_some())
    }

    async fn delete_departed_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<FlightKey>, StoreError> {
        self.check_writable()?;
        let mut rows = self.rows.lock().unwrap();
        let expired: Vec<FlightKey> = rows
            .keys()
            .filter(|k| k.departure_date < cutoff)
            .cloned()
            .collect();
        for key in &expired {
            rows.remove(key);
        }
        Ok(expired)
    }

    async fn set_flag(
        &self,
        key: &FlightKey,
        flag: ProgressFlag,
        value: bool,
    ) -> Result<(), StoreError> {
        self.update(key, |row| match flag {
            ProgressFlag::PreDeparture => row.notified_pre_departure |= value,
            ProgressFlag::Takeoff => row.notified_takeoff |= value,
            ProgressFlag::Landing => row.notified_landing |= value,
        })
    }

    async fn set_cruise_timestamp(
        &self,
        key: &FlightKey,
        ts: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.update(key, |row| {
            row.last_cruise_notif = Some(row.last_cruise_notif.map_or(ts, |t| t.max(ts)))
        })
    }
}

#[derive(Default)]
pub struct StubFetcher {
    snapshots: Mutex<HashMap<String, Option<FlightSnapshot>>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<FlightCode>>,
}

impl StubFetcher {
    pub fn set(&self, code: &str, snapshot: Option<FlightSnapshot>) {
        self.failing.lock().unwrap().remove(code);
        self.snapshots
            .lock()
            .unwrap()
            .insert(code.to_string(), snapshot);
    }

    pub fn fail(&self, code: &str) {
        self.failing.lock().unwrap().insert(code.to_string());
    }

    pub fn calls(&self) -> Vec<FlightCode> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SnapshotFetcher for StubFetcher {
    async fn fetch(&self, flight_id: &FlightCode) -> Result<Option<FlightSnapshot>, FetchError> {
        self.calls.lock().unwrap().push(flight_id.clone());
        if self.failing.lock().unwrap().contains(flight_id.as_str()) {
            return Err(FetchError::Timeout);
        }
        Ok(self
            .snapshots
            .lock()
            .unwrap()
            .get(flight_id.as_str())
            .cloned()
            .flatten())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    sent: Mutex<Vec<SlackMessage>>,
    fail: bool,
}

impl RecordingSink {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<SlackMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send(&self, message: &SlackMessage) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Injected);
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub struct FailingRenderer;

impl MapRenderer for FailingRenderer {
    fn render(
        &self,
        _position: &TrackPoint,
        _track: &[TrackPoint],
        _heading: Option<f64>,
    ) -> Result<NamedTempFile, MapError> {
        Err(MapError::Injected)
    }
}

#[derive(Default)]
pub struct StubUploader;

#[async_trait]
impl MapUploader for StubUploader {
    async fn upload(&self, path: &Path) -> Result<String, MapError> {
        assert!(path.exists(), "map must still exist while uploading");
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(format!("https://cdn.test/{}", name))
    }
}

/// Rejects every upload, remembering which file it was handed.
#[derive(Default)]
pub struct FailingUploader {
    seen: Mutex<Vec<PathBuf>>,
}

impl FailingUploader {
    pub fn seen(&self) -> Vec<PathBuf> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl MapUploader for FailingUploader {
    async fn upload(&self, path: &Path) -> Result<String, MapError> {
        self.seen.lock().unwrap().push(path.to_path_buf());
        Err(MapError::UploadStatus(503))
    }
}

/// Captures late slash-command answers; [`RecordingReplier::next`] waits for
/// the next one.
pub struct RecordingReplier {
    tx: mpsc::UnboundedSender<(String, CommandResponse)>,
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<(String, CommandResponse)>>,
}

impl Default for RecordingReplier {
    fn default() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
        }
    }
}

impl RecordingReplier {
    pub async fn next(&self) -> (String, CommandResponse) {
        let mut rx = self.rx.lock().await;
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("no reply within 5s")
            .expect("replier channel closed")
    }
}

#[async_trait]
impl CommandReplier for RecordingReplier {
    async fn reply(
        &self,
        response_url: &str,
        response: &CommandResponse,
    ) -> Result<(), DeliveryError> {
        let _ = self.tx.send((response_url.to_string(), response.clone()));
        Ok(())
    }
}
