use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightStatus {
    Scheduled,
    Airborne,
    Arrived,
    Unknown,
}

impl FlightStatus {
    pub fn from_upstream(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "scheduled" | "taxiing" => FlightStatus::Scheduled,
            "airborne" => FlightStatus::Airborne,
            "arrived" => FlightStatus::Arrived,
            _ => FlightStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FlightStatus::Scheduled => "scheduled",
            FlightStatus::Airborne => "airborne",
            FlightStatus::Arrived => "arrived",
            FlightStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    pub departure_scheduled: Option<DateTime<Utc>>,
    pub departure_estimated: Option<DateTime<Utc>>,
    pub departure_actual: Option<DateTime<Utc>>,
    pub arrival_scheduled: Option<DateTime<Utc>>,
    pub arrival_estimated: Option<DateTime<Utc>>,
    pub arrival_actual: Option<DateTime<Utc>>,
}

impl Schedule {
    /// Departure delay, only when the aircraft left later than planned.
    pub fn departure_delay(&self) -> Option<Duration> {
        positive(self.departure_actual? - self.departure_scheduled?)
    }

    pub fn arrival_delay(&self) -> Option<Duration> {
        positive(self.arrival_actual? - self.arrival_scheduled?)
    }

    pub fn flight_time(&self) -> Option<Duration> {
        positive(self.arrival_actual? - self.departure_actual?)
    }
}

fn positive(d: Duration) -> Option<Duration> {
    (d > Duration::zero()).then_some(d)
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Airport {
    pub iata: String,
    pub terminal: Option<String>,
    pub gate: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPoint {
    pub timestamp: DateTime<Utc>,
    pub lat: f64,
    pub lon: f64,
}

/// Point-in-time view of a flight as scraped from the upstream tracker.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightSnapshot {
    pub airline: String,
    pub status: FlightStatus,
    pub schedule: Schedule,
    pub origin: Airport,
    pub destination: Airport,
    pub aircraft_type: String,
    pub aircraft_name: String,
    pub track: Vec<TrackPoint>,
    pub heading: Option<f64>,
    pub groundspeed: Option<i64>,
    pub altitude: Option<i64>,
    pub distance_remaining: Option<i64>,
}

impl FlightSnapshot {
    /// The upstream page returns an empty shell for flights it cannot match.
    pub fn is_resolved(&self) -> bool {
        !self.airline.trim().is_empty()
    }

    /// Most recent position by timestamp. Track points are not guaranteed
    /// to arrive in order.
    pub fn latest_position(&self) -> Option<&TrackPoint> {
        self.track.iter().max_by_key(|p| p.timestamp)
    }

    /// Whether this is the instance scheduled to leave on the UTC day of
    /// `departure_date`. The live page only shows one instance of a flight
    /// number; rows for other days must wait for theirs.
    pub fn departs_on(&self, departure_date: DateTime<Utc>) -> bool {
        self.schedule
            .departure_scheduled
            .is_some_and(|dep| dep.date_naive() == departure_date.date_naive())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, 0).unwrap()
    }

    fn point(ts: DateTime<Utc>, lat: f64) -> TrackPoint {
        TrackPoint {
            timestamp: ts,
            lat,
            lon: 2.0,
        }
    }

    #[test]
    fn latest_position_uses_timestamp_not_order() {
        let snapshot = FlightSnapshot {
            track: vec![point(at(10, 0), 1.0), point(at(10, 30), 3.0), point(at(10, 10), 2.0)],
            ..crate::test_utils::snapshot(FlightStatus::Airborne)
        };
        assert_eq!(snapshot.latest_position().unwrap().lat, 3.0);
    }

    #[test]
    fn delays_are_reported_only_when_positive() {
        let schedule = Schedule {
            departure_scheduled: Some(at(10, 0)),
            departure_actual: Some(at(10, 25)),
            arrival_scheduled: Some(at(12, 0)),
            arrival_actual: Some(at(11, 50)),
            ..Schedule::default()
        };
        assert_eq!(schedule.departure_delay(), Some(Duration::minutes(25)));
        assert_eq!(schedule.arrival_delay(), None);
        assert_eq!(schedule.flight_time(), Some(Duration::minutes(85)));
    }

    #[test]
    fn unknown_upstream_statuses_map_to_unknown() {
        assert_eq!(FlightStatus::from_upstream("Airborne"), FlightStatus::Airborne);
        assert_eq!(FlightStatus::from_upstream("cancelled"), FlightStatus::Unknown);
    }

    #[test]
    fn departs_on_compares_utc_days() {
        let s = crate::test_utils::snapshot(FlightStatus::Scheduled);
        let midnight = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();

        assert!(s.departs_on(midnight));
        assert!(s.departs_on(at(23, 30)));
        assert!(!s.departs_on(midnight + Duration::days(4)));
        assert!(!s.departs_on(midnight - Duration::days(1)));

        let unscheduled = FlightSnapshot {
            schedule: Schedule::default(),
            ..s
        };
        assert!(!unscheduled.departs_on(midnight));
    }
}
