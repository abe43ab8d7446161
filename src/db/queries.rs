pub const CREATE_TRACKED_FLIGHTS: &str = r#"
CREATE TABLE IF NOT EXISTS tracked_flights (
    flight_id TEXT NOT NULL,
    date_departure TIMESTAMPTZ NOT NULL,
    channel_id TEXT NOT NULL,
    notified_pre_departure BOOLEAN NOT NULL DEFAULT FALSE,
    notified_takeoff BOOLEAN NOT NULL DEFAULT FALSE,
    last_cruise_notif TIMESTAMPTZ NULL,
    notified_landing BOOLEAN NOT NULL DEFAULT FALSE,
    PRIMARY KEY (flight_id, date_departure)
);
"#;

pub const SELECT_ALL_FLIGHTS: &str = r#"
SELECT flight_id, date_departure, channel_id, notified_pre_departure, notified_takeoff, last_cruise_notif, notified_landing
FROM tracked_flights
ORDER BY date_departure, flight_id;
"#;

pub const SELECT_LANDED_FLIGHTS: &str = r#"
SELECT flight_id, date_departure, channel_id, notified_pre_departure, notified_takeoff, last_cruise_notif, notified_landing
FROM tracked_flights
WHERE notified_landing = TRUE;
"#;

pub const INSERT_FLIGHT: &str = r#"
INSERT INTO tracked_flights (flight_id, date_departure, channel_id)
VALUES ($1, $2, $3)
ON CONFLICT (flight_id, date_departure) DO NOTHING;
"#;

pub const DELETE_FLIGHT: &str = r#"
DELETE FROM tracked_flights WHERE flight_id = $1 AND date_departure = $2;
"#;

pub const DELETE_LATEST_FLIGHT: &str = r#"
DELETE FROM tracked_flights
WHERE flight_id = $1
  AND date_departure = (SELECT MAX(date_departure) FROM tracked_flights WHERE flight_id = $1);
"#;

pub const DELETE_EXPIRED_FLIGHTS: &str = r#"
DELETE FROM tracked_flights
WHERE date_departure < $1
RETURNING flight_id, date_departure;
"#;

// Flags are OR-ed so a stale `false` can never clear a recorded notification.
pub const SET_NOTIFIED_PRE_DEPARTURE: &str = r#"
UPDATE tracked_flights
SET notified_pre_departure = notified_pre_departure OR $3
WHERE flight_id = $1 AND date_departure = $2;
"#;

pub const SET_NOTIFIED_TAKEOFF: &str = r#"
UPDATE tracked_flights
SET notified_takeoff = notified_takeoff OR $3
WHERE flight_id = $1 AND date_departure = $2;
"#;

pub const SET_NOTIFIED_LANDING: &str = r#"
UPDATE tracked_flights
SET notified_landing = notified_landing OR $3
WHERE flight_id = $1 AND date_departure = $2;
"#;

pub const SET_LAST_CRUISE_NOTIF: &str = r#"
UPDATE tracked_flights
SET last_cruise_notif = GREATEST(COALESCE(last_cruise_notif, $3), $3)
WHERE flight_id = $1 AND date_departure = $2;
"#;
