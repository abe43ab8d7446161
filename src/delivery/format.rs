use chrono::{DateTime, Duration, Utc};

use super::slack::{Block, SlackMessage};
use crate::engine::Notification;
use crate::models::FlightCode;

const TIME_FORMAT: &str = "%H:%M UTC, %d %b %Y";

/// Renders a notification for `channel`. `map_url` is only used by cruise
/// updates.
pub fn render(
    channel: &str,
    flight_id: &FlightCode,
    notification: &Notification,
    map_url: Option<&str>,
) -> SlackMessage {
    let (text, blocks) = match notification {
        Notification::PreDeparture {
            departure,
            within,
            origin,
            destination,
            terminal,
            gate,
        } => pre_departure(flight_id, *departure, *within, origin, destination, terminal, gate),
        Notification::Takeoff {
            scheduled_arrival,
            delay,
            aircraft_name,
            aircraft_type,
        } => takeoff(flight_id, *scheduled_arrival, *delay, aircraft_name, aircraft_type),
        Notification::Landing {
            flight_time,
            delay,
            terminal,
            gate,
        } => landing(flight_id, *flight_time, *delay, terminal, gate),
        Notification::Cruise {
            altitude,
            groundspeed,
            estimated_arrival,
            distance_remaining,
            ..
        } => cruise(
            flight_id,
            *altitude,
            *groundspeed,
            *estimated_arrival,
            *distance_remaining,
            map_url,
        ),
    };

    SlackMessage {
        channel: channel.to_string(),
        text: Some(text),
        blocks,
    }
}

fn pre_departure(
    flight_id: &FlightCode,
    departure: Option<DateTime<Utc>>,
    within: Duration,
    origin: &str,
    destination: &str,
    terminal: &Option<String>,
    gate: &Option<String>,
) -> (String, Vec<Block>) {
    let headline = format!(
        "Flight *{}* ({} → {}) is scheduled to depart in less than {}!",
        flight_id,
        or_unknown(origin),
        or_unknown(destination),
        spell_window(within)
    );
    let blocks = vec![
        Block::markdown(headline.clone()),
        Block::Divider,
        Block::markdown(format!(
            "_Departure: *{}*, Terminal {}, Gate {}_",
            time_or_unknown(departure),
            opt_or_unknown(terminal),
            opt_or_unknown(gate)
        )),
    ];
    (headline, blocks)
}

fn takeoff(
    flight_id: &FlightCode,
    scheduled_arrival: Option<DateTime<Utc>>,
    delay: Option<Duration>,
    aircraft_name: &str,
    aircraft_type: &str,
) -> (String, Vec<Block>) {
    let headline = format!("🛫 Flight *{}* has taken off!", flight_id);
    let blocks = vec![
        Block::markdown(format!(
            "{}\nScheduled Arrival: *{}*{}",
            headline,
            time_or_unknown(scheduled_arrival),
            delay_note(delay)
        )),
        Block::Divider,
        Block::markdown(format!(
            "_Aircraft: *{}* ({})_",
            or_unknown(aircraft_name),
            or_unknown(aircraft_type)
        )),
    ];
    (headline, blocks)
}

fn landing(
    flight_id: &FlightCode,
    flight_time: Option<Duration>,
    delay: Option<Duration>,
    terminal: &Option<String>,
    gate: &Option<String>,
) -> (String, Vec<Block>) {
    let headline = format!("🛬 Flight *{}* has landed!", flight_id);
    let total = flight_time.map_or_else(|| "unknown".to_string(), format_duration);
    let blocks = vec![
        Block::markdown(format!(
            "{}\nTotal Flight Time: *{}*{}",
            headline,
            total,
            delay_note(delay)
        )),
        Block::Divider,
        Block::markdown(format!(
            "_Arrived at Terminal {}, Gate {}_",
            opt_or_unknown(terminal),
            opt_or_unknown(gate)
        )),
    ];
    (headline, blocks)
}

fn cruise(
    flight_id: &FlightCode,
    altitude: Option<i64>,
    groundspeed: Option<i64>,
    estimated_arrival: Option<DateTime<Utc>>,
    distance_remaining: Option<i64>,
    map_url: Option<&str>,
) -> (String, Vec<Block>) {
    let headline = format!(
        "✈️ Flight *{}* is currently cruising at an altitude of *{} ft* with a groundspeed of *{} knots*.",
        flight_id,
        altitude.map_or_else(|| "?".to_string(), |v| v.to_string()),
        groundspeed.map_or_else(|| "?".to_string(), |v| v.to_string()),
    );

    let mut blocks = vec![Block::markdown(headline.clone())];
    if let Some(url) = map_url {
        blocks.push(Block::Image {
            image_url: url.to_string(),
            alt_text: "Aircraft Position Map".to_string(),
        });
    }
    blocks.push(Block::Divider);

    let mut footer = format!("_Estimated Arrival: *{}*", time_or_unknown(estimated_arrival));
    if let Some(remaining) = distance_remaining {
        footer.push_str(&format!(", {} mi to go", remaining));
    }
    footer.push('_');
    blocks.push(Block::markdown(footer));

    (headline, blocks)
}

fn delay_note(delay: Option<Duration>) -> String {
    match delay {
        Some(d) => format!("\n(The flight was delayed by {})", format_duration(d)),
        None => String::new(),
    }
}

/// Whole minutes only, e.g. `2h05m`, `45m`.
pub fn format_duration(d: Duration) -> String {
    let minutes = d.num_minutes().max(0);
    let (h, m) = (minutes / 60, minutes % 60);
    if h > 0 {
        format!("{}h{:02}m", h, m)
    } else {
        format!("{}m", m)
    }
}

/// `30 minutes`, `1 hour`, `2 hours`; anything else falls back to
/// [`format_duration`].
fn spell_window(d: Duration) -> String {
    match d.num_minutes() {
        1 => "1 minute".to_string(),
        60 => "1 hour".to_string(),
        m if m > 60 && m % 60 == 0 => format!("{} hours", m / 60),
        m if m < 60 => format!("{} minutes", m),
        _ => format_duration(d),
    }
}

fn time_or_unknown(t: Option<DateTime<Utc>>) -> String {
    t.map_or_else(|| "unknown".to_string(), |t| t.format(TIME_FORMAT).to_string())
}

fn or_unknown(s: &str) -> &str {
    if s.trim().is_empty() {
        "?"
    } else {
        s
    }
}

fn opt_or_unknown(s: &Option<String>) -> &str {
    s.as_deref().map_or("?", or_unknown)
}
