use chrono::{DateTime, Utc};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;
use thiserror::Error;

/// Carrier prefix (2-3 letters) followed by a 1-4 digit flight number.
const FLIGHT_CODE_PATTERN: &str = r"^[A-Z]{2,3}[0-9]{1,4}$";

fn flight_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(FLIGHT_CODE_PATTERN).expect("flight code pattern is valid"))
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid flight code '{0}'")]
pub struct InvalidFlightCode(pub String);

/// A validated, uppercase flight identifier such as `AA100`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightCode(String);

impl FlightCode {
    pub fn parse(raw: &str) -> Result<Self, InvalidFlightCode> {
        let code = raw.trim().to_ascii_uppercase();
        if flight_code_regex().is_match(&code) {
            Ok(Self(code))
        } else {
            Err(InvalidFlightCode(raw.trim().to_string()))
        }
    }

    /// Rebuilds a code read back from the store. Rows only ever enter the
    /// store through [`FlightCode::parse`], so no validation is repeated.
    pub fn from_stored(code: String) -> Self {
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for FlightCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Primary key of a tracked flight.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlightKey {
    pub flight_id: FlightCode,
    pub departure_date: DateTime<Utc>,
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.flight_id, self.departure_date.format("%Y-%m-%d"))
    }
}

/// One-shot notification flags. Each only ever moves from false to true.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressFlag {
    PreDeparture,
    Takeoff,
    Landing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFlight {
    pub flight_id: FlightCode,
    pub departure_date: DateTime<Utc>,
    pub channel_id: String,
    pub notified_pre_departure: bool,
    pub notified_takeoff: bool,
    pub last_cruise_notif: Option<DateTime<Utc>>,
    pub notified_landing: bool,
}

impl TrackedFlight {
    pub fn new(flight_id: FlightCode, departure_date: DateTime<Utc>, channel_id: &str) -> Self {
        Self {
            flight_id,
            departure_date,
            channel_id: channel_id.to_string(),
            notified_pre_departure: false,
            notified_takeoff: false,
            last_cruise_notif: None,
            notified_landing: false,
        }
    }

    pub fn key(&self) -> FlightKey {
        FlightKey {
            flight_id: self.flight_id.clone(),
            departure_date: self.departure_date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_normalises_valid_codes() {
        assert_eq!(FlightCode::parse("AA100").unwrap().as_str(), "AA100");
        assert_eq!(FlightCode::parse(" dl4567 ").unwrap().as_str(), "DL4567");
        assert_eq!(FlightCode::parse("EZY1").unwrap().as_str(), "EZY1");
    }

    #[test]
    fn rejects_malformed_codes() {
        for raw in [
            "",
            "A100",
            "ABCD100",
            "AA",
            "AA12345",
            "AA-100",
            "1A100",
            "AA\u{661}\u{660}\u{660}",
            "AA\u{ff11}00",
        ] {
            assert!(FlightCode::parse(raw).is_err(), "{raw} should be rejected");
        }
    }
}
