//! Milestone state machine.
//!
//! A tracked flight's recorded progress places it in one [`Phase`]. Each
//! poll evaluates the guarded transitions in priority order and takes at
//! most one of them:
//!
//! | milestone     | guard                                                        |
//! |---------------|--------------------------------------------------------------|
//! | pre-departure | not yet sent, `0 < scheduled departure - now <= window`      |
//! | takeoff       | not yet sent, snapshot airborne                              |
//! | landing       | not yet sent, snapshot arrived                               |
//! | cruise        | takeoff sent, snapshot airborne, interval elapsed, has track |
//!
//! `Landed` is terminal: the row is deleted once the landing message is
//! delivered, which takes it to `Untracked`.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use super::notification::{commit_plan, Milestone, Notification, PendingNotification};
use crate::models::{FlightSnapshot, FlightStatus, TrackedFlight};

/// Milestones in the order their guards are evaluated.
const PRIORITY: [Milestone; 4] = [
    Milestone::PreDeparture,
    Milestone::Takeoff,
    Milestone::Landing,
    Milestone::Cruise,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Phase {
    Untracked,
    PreDepartureDue,
    AwaitingTakeoff,
    Airborne,
    Landed,
}

impl Phase {
    pub fn of(flight: &TrackedFlight) -> Self {
        if flight.notified_landing {
            Phase::Landed
        } else if flight.notified_takeoff {
            Phase::Airborne
        } else if flight.notified_pre_departure {
            Phase::AwaitingTakeoff
        } else {
            Phase::PreDepartureDue
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Phase::Untracked => "untracked",
            Phase::PreDepartureDue => "waiting for departure",
            Phase::AwaitingTakeoff => "boarding",
            Phase::Airborne => "in flight",
            Phase::Landed => "landed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub pre_departure_window: Duration,
    pub cruise_interval: Duration,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            pre_departure_window: Duration::minutes(30),
            cruise_interval: Duration::hours(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub milestone: Milestone,
    pub from: Phase,
    pub to: Phase,
}

fn guard(
    milestone: Milestone,
    flight: &TrackedFlight,
    snapshot: &FlightSnapshot,
    now: DateTime<Utc>,
    policy: &Policy,
) -> bool {
    match milestone {
        Milestone::PreDeparture => {
            !flight.notified_pre_departure
                && snapshot
                    .schedule
                    .departure_scheduled
                    .map(|dep| dep - now)
                    .is_some_and(|diff| diff > Duration::zero() && diff <= policy.pre_departure_window)
        }
        Milestone::Takeoff => !flight.notified_takeoff && snapshot.status == FlightStatus::Airborne,
        Milestone::Landing => !flight.notified_landing && snapshot.status == FlightStatus::Arrived,
        Milestone::Cruise => {
            flight.notified_takeoff
                && snapshot.status == FlightStatus::Airborne
                && flight
                    .last_cruise_notif
                    .map_or(true, |last| now - last >= policy.cruise_interval)
                && !snapshot.track.is_empty()
        }
    }
}

/// Picks the single transition to take this cycle, if any.
pub fn next_transition(
    flight: &TrackedFlight,
    snapshot: &FlightSnapshot,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Option<Transition> {
    let from = Phase::of(flight);
    if from == Phase::Landed || !snapshot.is_resolved() {
        return None;
    }

    let milestone = PRIORITY
        .into_iter()
        .find(|m| guard(*m, flight, snapshot, now, policy))?;

    // A delivered landing removes the row altogether.
    let to = if milestone == Milestone::Landing {
        Phase::Untracked
    } else {
        let mut after = flight.clone();
        for mutation in commit_plan(milestone, now) {
            mutation.apply_to(&mut after);
        }
        Phase::of(&after)
    };

    Some(Transition { milestone, from, to })
}

/// Decides what, if anything, to announce for `flight` given a fresh
/// snapshot. Returns the notification together with the writes that must
/// be committed before it is delivered.
pub fn decide(
    flight: &TrackedFlight,
    snapshot: &FlightSnapshot,
    now: DateTime<Utc>,
    policy: &Policy,
) -> Option<PendingNotification> {
    let transition = next_transition(flight, snapshot, now, policy)?;
    let notification = build(transition.milestone, snapshot, policy)?;
    debug!(
        "{}: {:?} -> {:?} ({})",
        flight.key(),
        transition.from,
        transition.to,
        transition.milestone.as_str()
    );

    Some(PendingNotification {
        key: flight.key(),
        channel_id: flight.channel_id.clone(),
        notification,
        mutations: commit_plan(transition.milestone, now),
        delete_after_delivery: transition.milestone == Milestone::Landing,
    })
}

fn build(
    milestone: Milestone,
    snapshot: &FlightSnapshot,
    policy: &Policy,
) -> Option<Notification> {
    let schedule = &snapshot.schedule;
    Some(match milestone {
        Milestone::PreDeparture => Notification::PreDeparture {
            departure: schedule.departure_estimated.or(schedule.departure_scheduled),
            within: policy.pre_departure_window,
            origin: snapshot.origin.iata.clone(),
            destination: snapshot.destination.iata.clone(),
            terminal: snapshot.origin.terminal.clone(),
            gate: snapshot.origin.gate.clone(),
        },
        Milestone::Takeoff => Notification::Takeoff {
            scheduled_arrival: schedule.arrival_scheduled,
            delay: schedule.departure_delay(),
            aircraft_name: snapshot.aircraft_name.clone(),
            aircraft_type: snapshot.aircraft_type.clone(),
        },
        Milestone::Landing => Notification::Landing {
            flight_time: schedule.flight_time(),
            delay: schedule.arrival_delay(),
            terminal: snapshot.destination.terminal.clone(),
            gate: snapshot.destination.gate.clone(),
        },
        Milestone::Cruise => Notification::Cruise {
            altitude: snapshot.altitude,
            groundspeed: snapshot.groundspeed,
            estimated_arrival: schedule.arrival_estimated,
            distance_remaining: snapshot.distance_remaining,
            position: snapshot.latest_position()?.clone(),
            heading: snapshot.heading,
            track: snapshot.track.clone(),
        },
    })
}
