use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use thiserror::Error;

use crate::models::flight::{FlightCode, InvalidFlightCode};

const DATE_LAYOUTS: [&str; 3] = ["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date '{0}'")]
pub struct InvalidDate(pub String);

/// Splits slash-command text into the flight code and whatever follows the
/// first space.
pub fn split_command_text(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(' ') {
        Some((code, rest)) => (code, rest.trim()),
        None => (text, ""),
    }
}

pub fn parse_flight_code(raw: &str) -> Result<FlightCode, InvalidFlightCode> {
    FlightCode::parse(raw)
}

/// Parses the optional date argument of a track request.
///
/// Calendar dates (including `today`/`tomorrow` and an empty argument)
/// resolve to midnight UTC, so asking twice for the same day hits the same
/// key. A full RFC 3339 timestamp is kept as given.
pub fn parse_departure_date(input: &str, now: DateTime<Utc>) -> Result<DateTime<Utc>, InvalidDate> {
    let input = input.trim();
    let today = now.date_naive();

    let date = match input.to_lowercase().as_str() {
        "" | "today" => today,
        "tomorrow" => today + Duration::days(1),
        _ => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
                return Ok(ts.with_timezone(&Utc));
            }
            DATE_LAYOUTS
                .iter()
                .find_map(|layout| NaiveDate::parse_from_str(input, layout).ok())
                .ok_or_else(|| InvalidDate(input.to_string()))?
        }
    };

    Ok(date.and_time(NaiveTime::MIN).and_utc())
}
