use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::commit::{commit, CommitOutcome};
use crate::config::AppConfig;
use crate::context::AppContext;
use crate::delivery::{format, SlackMessage};
use crate::engine::{decide, Milestone, Notification, PendingNotification, Policy};
use crate::error::FetchError;
use crate::models::{FlightCode, FlightSnapshot, TrackedFlight};

#[derive(Debug, Clone)]
pub struct PollSettings {
    pub interval: std::time::Duration,
    pub policy: Policy,
    /// Flights that never took off and whose departure date is further in
    /// the past than this are not fetched any more.
    pub stale_after: Duration,
    /// Rows departing further in the past than this are deleted outright,
    /// whatever their progress.
    pub purge_after: Duration,
    pub fetch_concurrency: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: std::time::Duration::from_secs(60),
            policy: Policy::default(),
            stale_after: Duration::hours(36),
            purge_after: Duration::hours(96),
            fetch_concurrency: 1,
        }
    }
}

impl PollSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            interval: std::time::Duration::from_secs(config.poll_interval_secs.max(1)),
            policy: Policy {
                pre_departure_window: Duration::minutes(config.pre_departure_window_mins),
                cruise_interval: Duration::minutes(config.cruise_interval_mins),
            },
            stale_after: Duration::hours(config.stale_after_hours),
            purge_after: Duration::hours(config.purge_after_hours.max(config.stale_after_hours)),
            fetch_concurrency: config.fetch_concurrency.max(1),
        }
    }
}

/// What one tick did; mostly useful for logs and tests.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TickReport {
    pub checked: usize,
    pub skipped_stale: usize,
    pub not_found: usize,
    pub other_day: usize,
    pub fetch_errors: usize,
    pub sent: Vec<(FlightCode, Milestone)>,
    pub abandoned: usize,
    pub undelivered: usize,
    pub swept: usize,
    pub expired: usize,
}

pub struct Poller {
    ctx: Arc<AppContext>,
    settings: PollSettings,
}

impl Poller {
    pub fn new(ctx: Arc<AppContext>, settings: PollSettings) -> Self {
        Self { ctx, settings }
    }

    /// Runs ticks forever. A single task drives the interval and awaits each
    /// tick, so ticks never overlap; triggers missed while a tick overran
    /// are dropped.
    pub async fn run(self) {
        info!(
            "Polling tracked flights every {}s",
            self.settings.interval.as_secs()
        );
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let span = info_span!("poll_tick", tick_id = %Uuid::new_v4());
            let report = self.run_tick(Utc::now()).instrument(span).await;
            info!(
                "Tick done: checked={} sent={} stale={} not_found={} other_day={} fetch_errors={} abandoned={} undelivered={} swept={} expired={}",
                report.checked,
                report.sent.len(),
                report.skipped_stale,
                report.not_found,
                report.other_day,
                report.fetch_errors,
                report.abandoned,
                report.undelivered,
                report.swept,
                report.expired
            );
        }
    }

    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport {
            swept: self.sweep_landed().await,
            expired: self.purge_expired(now).await,
            ..TickReport::default()
        };

        let flights = match self.ctx.store.list_all().await {
            Ok(flights) => flights,
            Err(e) => {
                error!("Error querying tracked flights: {}", e);
                return report;
            }
        };

        let mut due = Vec::with_capacity(flights.len());
        for flight in flights {
            if flight.notified_landing {
                continue;
            }
            if self.is_stale(&flight, now) {
                debug!("Skipping stale flight {}", flight.key());
                report.skipped_stale += 1;
                continue;
            }
            due.push(flight);
        }

        let fetcher = self.ctx.fetcher.clone();
        let mut fetches = stream::iter(due)
            .map(|flight| {
                let fetcher = fetcher.clone();
                async move {
                    let result = fetcher.fetch(&flight.flight_id).await;
                    (flight, result)
                }
            })
            .buffered(self.settings.fetch_concurrency);

        while let Some((flight, result)) = fetches.next().await {
            report.checked += 1;
            self.process(&flight, result, now, &mut report).await;
        }

        report
    }

    /// Removes rows whose landing was recorded but never cleaned up.
    async fn sweep_landed(&self) -> usize {
        let landed = match self.ctx.store.list_landed().await {
            Ok(landed) => landed,
            Err(e) => {
                warn!("Error listing landed flights: {}", e);
                return 0;
            }
        };

        let mut swept = 0;
        for flight in landed {
            match self.ctx.store.delete(&flight.key()).await {
                Ok(true) => {
                    warn!("Removed landed flight {} left behind by an earlier tick", flight.key());
                    swept += 1;
                }
                Ok(false) => {}
                Err(e) => warn!("Error removing landed flight {}: {}", flight.key(), e),
            }
        }
        swept
    }

    /// Drops rows whose departure is long past. Stale rows are never fetched
    /// and would otherwise stay forever.
    async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        match self
            .ctx
            .store
            .delete_departed_before(now - self.settings.purge_after)
            .await
        {
            Ok(expired) => {
                for key in &expired {
                    warn!("Removed expired flight {} that never landed", key);
                }
                expired.len()
            }
            Err(e) => {
                warn!("Error removing expired flights: {}", e);
                0
            }
        }
    }

    fn is_stale(&self, flight: &TrackedFlight, now: DateTime<Utc>) -> bool {
        !flight.notified_takeoff && now - flight.departure_date > self.settings.stale_after
    }

    async fn process(
        &self,
        flight: &TrackedFlight,
        fetched: Result<Option<FlightSnapshot>, FetchError>,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        let snapshot = match fetched {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => {
                debug!("No data for flight {}, retrying next tick", flight.flight_id);
                report.not_found += 1;
                return;
            }
            Err(e) => {
                warn!("Error fetching flight {}: {}", flight.flight_id, e);
                report.fetch_errors += 1;
                return;
            }
        };

        debug!(
            "Checked flight {}: status={}",
            flight.flight_id,
            snapshot.status.as_str()
        );

        if !snapshot.departs_on(flight.departure_date) {
            debug!(
                "Live {} is not the instance departing on {}, waiting",
                flight.flight_id,
                flight.departure_date.format("%Y-%m-%d")
            );
            report.other_day += 1;
            return;
        }

        let Some(pending) = decide(flight, &snapshot, now, &self.settings.policy) else {
            return;
        };

        let Some(message) = self.prepare(&pending).await else {
            return;
        };

        let outcome = commit(
            self.ctx.store.as_ref(),
            self.ctx.sink.as_ref(),
            &pending,
            &message,
        )
        .await;

        let milestone = pending.milestone();
        match &outcome {
            CommitOutcome::Abandoned(e) => {
                warn!(
                    "Abandoning {} notification for {}, state not recorded: {}",
                    milestone.as_str(),
                    pending.key,
                    e
                );
                report.abandoned += 1;
            }
            CommitOutcome::Undelivered(e) => {
                error!(
                    "Failed to deliver {} notification for {} to {}: {}",
                    milestone.as_str(),
                    pending.key,
                    pending.channel_id,
                    e
                );
                report.undelivered += 1;
            }
            CommitOutcome::RemovalFailed(e) => {
                error!("Error removing landed flight {} from tracking: {}", pending.key, e);
            }
            CommitOutcome::Delivered | CommitOutcome::Completed => {}
        }
        if outcome.was_delivered() {
            report.sent.push((pending.flight_id().clone(), milestone));
        }
    }

    /// Builds the chat message. Cruise updates publish their map first; if
    /// that fails the update waits for the next tick, before anything has
    /// been written.
    async fn prepare(&self, pending: &PendingNotification) -> Option<SlackMessage> {
        let map_url = match (&pending.notification, &self.ctx.maps) {
            (
                Notification::Cruise {
                    position,
                    track,
                    heading,
                    ..
                },
                Some(maps),
            ) => match maps.publish(position, track, *heading).await {
                Ok(url) => Some(url),
                Err(e) => {
                    warn!("Error publishing map for {}: {}", pending.key, e);
                    return None;
                }
            },
            _ => None,
        };

        Some(format::render(
            &pending.channel_id,
            pending.flight_id(),
            &pending.notification,
            map_url.as_deref(),
        ))
    }
}
