use std::sync::Arc;

use crate::commands::CommandReplier;
use crate::db::FlightStore;
use crate::delivery::{DeliverySink, MapPublisher};
use crate::fetcher::SnapshotFetcher;

/// Handles shared by the poller and the command front end.
#[derive(Clone)]
pub struct AppContext {
    pub store: Arc<dyn FlightStore>,
    pub fetcher: Arc<dyn SnapshotFetcher>,
    pub sink: Arc<dyn DeliverySink>,
    /// Absent when no CDN is configured; cruise updates then go out without
    /// a map.
    pub maps: Option<MapPublisher>,
    /// Late answers to slash commands.
    pub replier: Arc<dyn CommandReplier>,
}
