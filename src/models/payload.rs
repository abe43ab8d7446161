use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

use super::snapshot::{Airport, FlightSnapshot, FlightStatus, Schedule, TrackPoint};

/// The `trackpollBootstrap` object embedded in a flight page.
#[derive(Debug, Deserialize)]
pub struct TrackpollBootstrap {
    #[serde(default)]
    pub flights: BTreeMap<String, FlightDetail>,
}

impl TrackpollBootstrap {
    pub fn into_first_flight(self) -> Option<FlightDetail> {
        self.flights.into_values().next()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightDetail {
    #[serde(default)]
    pub flight_status: Option<String>,
    #[serde(default)]
    pub airline: Option<Airline>,
    #[serde(default)]
    pub origin: Option<Endpoint>,
    #[serde(default)]
    pub destination: Option<Endpoint>,
    #[serde(default)]
    pub aircraft: Option<Aircraft>,
    #[serde(default)]
    pub gate_departure_times: Times,
    #[serde(default)]
    pub takeoff_times: Times,
    #[serde(default)]
    pub landing_times: Times,
    #[serde(default)]
    pub gate_arrival_times: Times,
    #[serde(default)]
    pub track: Vec<RawTrackPoint>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub heading: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub groundspeed: Option<f64>,
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub altitude: Option<f64>,
    #[serde(default)]
    pub distance: Option<Distance>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Airline {
    #[serde(default)]
    pub full_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Endpoint {
    #[serde(default)]
    pub iata: Option<String>,
    #[serde(default, deserialize_with = "parse_string_option")]
    pub terminal: Option<String>,
    #[serde(default, deserialize_with = "parse_string_option")]
    pub gate: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Aircraft {
    #[serde(default, rename = "type")]
    pub type_code: Option<String>,
    #[serde(default)]
    pub friendly_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Times {
    #[serde(default, deserialize_with = "parse_unix_option")]
    pub scheduled: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "parse_unix_option")]
    pub estimated: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "parse_unix_option")]
    pub actual: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RawTrackPoint {
    #[serde(default, deserialize_with = "parse_unix_option")]
    pub timestamp: Option<DateTime<Utc>>,
    /// `[longitude, latitude]`
    #[serde(default)]
    pub coord: Vec<f64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Distance {
    #[serde(default, deserialize_with = "parse_f64_option")]
    pub remaining: Option<f64>,
}

impl From<FlightDetail> for FlightSnapshot {
    fn from(d: FlightDetail) -> Self {
        let origin = d.origin.unwrap_or_default();
        let destination = d.destination.unwrap_or_default();
        let aircraft = d.aircraft.unwrap_or_default();

        // Gate times are what passengers see; runway times fill the gaps.
        let schedule = Schedule {
            departure_scheduled: d.gate_departure_times.scheduled.or(d.takeoff_times.scheduled),
            departure_estimated: d.gate_departure_times.estimated.or(d.takeoff_times.estimated),
            departure_actual: d.gate_departure_times.actual.or(d.takeoff_times.actual),
            arrival_scheduled: d.gate_arrival_times.scheduled.or(d.landing_times.scheduled),
            arrival_estimated: d.gate_arrival_times.estimated.or(d.landing_times.estimated),
            arrival_actual: d.gate_arrival_times.actual.or(d.landing_times.actual),
        };

        let track = d
            .track
            .into_iter()
            .filter_map(|p| match (p.timestamp, p.coord.as_slice()) {
                (Some(timestamp), [lon, lat, ..]) => Some(TrackPoint {
                    timestamp,
                    lat: *lat,
                    lon: *lon,
                }),
                _ => None,
            })
            .collect();

        FlightSnapshot {
            airline: d.airline.and_then(|a| a.full_name).unwrap_or_default(),
            status: d
                .flight_status
                .as_deref()
                .map(FlightStatus::from_upstream)
                .unwrap_or(FlightStatus::Unknown),
            schedule,
            origin: airport(origin),
            destination: airport(destination),
            aircraft_type: aircraft.type_code.unwrap_or_default(),
            aircraft_name: aircraft.friendly_type.unwrap_or_default(),
            track,
            heading: d.heading,
            groundspeed: d.groundspeed.map(|v| v as i64),
            // Upstream reports altitude in hundreds of feet.
            altitude: d.altitude.map(|v| (v * 100.0) as i64),
            distance_remaining: d.distance.and_then(|x| x.remaining).map(|v| v as i64),
        }
    }
}

fn airport(e: Endpoint) -> Airport {
    Airport {
        iata: e.iata.unwrap_or_default(),
        terminal: e.terminal,
        gate: e.gate,
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

fn parse_f64_option<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    match v {
        Some(StringOrNumber::Float(f)) => Ok(Some(f)),
        Some(StringOrNumber::Int(i)) => Ok(Some(i as f64)),
        Some(StringOrNumber::String(s)) => {
            if s.trim().is_empty() {
                Ok(None)
            } else {
                s.trim().parse::<f64>().map(Some).map_err(serde::de::Error::custom)
            }
        }
        None => Ok(None),
    }
}

fn parse_string_option<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(match v {
        Some(StringOrNumber::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(StringOrNumber::Int(i)) => Some(i.to_string()),
        Some(StringOrNumber::Float(f)) => Some(f.to_string()),
        _ => None,
    })
}

/// Unix seconds; zero and null both mean "not known yet".
fn parse_unix_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let secs = match parse_f64_option(deserializer)? {
        Some(v) if v > 0.0 => v as i64,
        _ => return Ok(None),
    };
    Ok(DateTime::from_timestamp(secs, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parsing_bootstrap_payload() {
        let payload = r#"
        {
            "version": "1.0",
            "summary": false,
            "flights": {
                "AFR1234-1740800000-schedule-0001": {
                    "flightStatus": "airborne",
                    "airline": { "fullName": "Air France", "icao": "AFR" },
                    "origin": { "iata": "CDG", "terminal": "2F", "gate": "K42" },
                    "destination": { "iata": "FCO", "terminal": 1, "gate": null },
                    "aircraft": { "type": "A320", "friendlyType": "Airbus A320" },
                    "gateDepartureTimes": { "scheduled": 1740823200, "estimated": null, "actual": 1740824100 },
                    "takeoffTimes": { "scheduled": 1740823800, "estimated": 0, "actual": 1740824700 },
                    "landingTimes": { "scheduled": 1740830400, "estimated": 1740830700, "actual": null },
                    "gateArrivalTimes": { "scheduled": 1740831000, "estimated": "1740831300", "actual": 0 },
                    "track": [
                        { "timestamp": 1740824700, "coord": [2.55, 49.0], "alt": 5, "gs": 160, "type": "TZ" },
                        { "timestamp": 1740826500, "coord": [5.1, 46.2], "alt": 360, "gs": 455, "type": "TZ" },
                        { "timestamp": null, "coord": [1.0, 1.0] },
                        { "timestamp": 1740825600, "coord": [] }
                    ],
                    "heading": "135",
                    "groundspeed": 455,
                    "altitude": 360,
                    "distance": { "elapsed": 410, "remaining": 690 }
                }
            }
        }
        "#;

        let bootstrap: TrackpollBootstrap = serde_json::from_str(payload).unwrap();
        let snapshot = FlightSnapshot::from(bootstrap.into_first_flight().unwrap());

        assert!(snapshot.is_resolved());
        assert_eq!(snapshot.status, FlightStatus::Airborne);
        assert_eq!(snapshot.origin.gate.as_deref(), Some("K42"));
        assert_eq!(snapshot.destination.terminal.as_deref(), Some("1"));
        assert_eq!(snapshot.destination.gate, None);
        assert_eq!(snapshot.aircraft_name, "Airbus A320");
        assert_eq!(
            snapshot.schedule.departure_scheduled,
            Some(Utc.timestamp_opt(1740823200, 0).unwrap())
        );
        assert_eq!(
            snapshot.schedule.arrival_estimated,
            Some(Utc.timestamp_opt(1740831300, 0).unwrap())
        );
        // gate arrival "actual" is 0 and runway landing is null
        assert_eq!(snapshot.schedule.arrival_actual, None);
        assert_eq!(snapshot.track.len(), 2);
        assert_eq!(snapshot.track[1].lat, 46.2);
        assert_eq!(snapshot.track[1].lon, 5.1);
        assert_eq!(snapshot.heading, Some(135.0));
        assert_eq!(snapshot.altitude, Some(36000));
        assert_eq!(snapshot.distance_remaining, Some(690));
    }

    #[test]
    fn empty_shell_is_unresolved() {
        let bootstrap: TrackpollBootstrap =
            serde_json::from_str(r#"{ "flights": { "x": {} } }"#).unwrap();
        let snapshot = FlightSnapshot::from(bootstrap.into_first_flight().unwrap());
        assert!(!snapshot.is_resolved());
        assert_eq!(snapshot.status, FlightStatus::Unknown);
    }
}
