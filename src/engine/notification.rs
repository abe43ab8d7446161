use chrono::{DateTime, Duration, Utc};

use crate::models::{FlightCode, FlightKey, ProgressFlag, TrackPoint, TrackedFlight};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Milestone {
    PreDeparture,
    Takeoff,
    Landing,
    Cruise,
}

impl Milestone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Milestone::PreDeparture => "pre_departure",
            Milestone::Takeoff => "takeoff",
            Milestone::Landing => "landing",
            Milestone::Cruise => "cruise",
        }
    }
}

/// Content of a notification, free of any chat formatting.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    PreDeparture {
        departure: Option<DateTime<Utc>>,
        /// The announcement window the departure fell into.
        within: Duration,
        origin: String,
        destination: String,
        terminal: Option<String>,
        gate: Option<String>,
    },
    Takeoff {
        scheduled_arrival: Option<DateTime<Utc>>,
        delay: Option<Duration>,
        aircraft_name: String,
        aircraft_type: String,
    },
    Landing {
        flight_time: Option<Duration>,
        delay: Option<Duration>,
        terminal: Option<String>,
        gate: Option<String>,
    },
    Cruise {
        altitude: Option<i64>,
        groundspeed: Option<i64>,
        estimated_arrival: Option<DateTime<Utc>>,
        distance_remaining: Option<i64>,
        position: TrackPoint,
        heading: Option<f64>,
        track: Vec<TrackPoint>,
    },
}

impl Notification {
    pub fn milestone(&self) -> Milestone {
        match self {
            Notification::PreDeparture { .. } => Milestone::PreDeparture,
            Notification::Takeoff { .. } => Milestone::Takeoff,
            Notification::Landing { .. } => Milestone::Landing,
            Notification::Cruise { .. } => Milestone::Cruise,
        }
    }
}

/// A single-row write that must land before the notification is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMutation {
    SetFlag(ProgressFlag),
    SetCruiseTimestamp(DateTime<Utc>),
}

impl StoreMutation {
    pub fn apply_to(&self, flight: &mut TrackedFlight) {
        match *self {
            StoreMutation::SetFlag(ProgressFlag::PreDeparture) => {
                flight.notified_pre_departure = true
            }
            StoreMutation::SetFlag(ProgressFlag::Takeoff) => flight.notified_takeoff = true,
            StoreMutation::SetFlag(ProgressFlag::Landing) => flight.notified_landing = true,
            StoreMutation::SetCruiseTimestamp(ts) => {
                flight.last_cruise_notif = Some(flight.last_cruise_notif.map_or(ts, |t| t.max(ts)))
            }
        }
    }
}

/// Writes to commit for a milestone, in order. The last entry is the one
/// that makes the milestone count as sent.
pub fn commit_plan(milestone: Milestone, now: DateTime<Utc>) -> Vec<StoreMutation> {
    match milestone {
        Milestone::PreDeparture => vec![StoreMutation::SetFlag(ProgressFlag::PreDeparture)],
        // The cruise clock starts at takeoff so the first cruise update
        // follows one full interval later.
        Milestone::Takeoff => vec![
            StoreMutation::SetCruiseTimestamp(now),
            StoreMutation::SetFlag(ProgressFlag::Takeoff),
        ],
        Milestone::Landing => vec![StoreMutation::SetFlag(ProgressFlag::Landing)],
        Milestone::Cruise => vec![StoreMutation::SetCruiseTimestamp(now)],
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingNotification {
    pub key: FlightKey,
    pub channel_id: String,
    pub notification: Notification,
    pub mutations: Vec<StoreMutation>,
    /// Set for the terminal milestone: the row goes once delivery succeeds.
    pub delete_after_delivery: bool,
}

impl PendingNotification {
    pub fn flight_id(&self) -> &FlightCode {
        &self.key.flight_id
    }

    pub fn milestone(&self) -> Milestone {
        self.notification.milestone()
    }
}
