use async_trait::async_trait;
use regex::Regex;
use reqwest::{Client, StatusCode};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

use crate::error::FetchError;
use crate::models::payload::TrackpollBootstrap;
use crate::models::{FlightCode, FlightSnapshot};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Resolves a flight code into its current status.
///
/// `Ok(None)` means the upstream has no such flight, which is a different
/// outcome from a failed lookup: callers reject or skip the former, and
/// retry the latter.
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    async fn fetch(&self, flight_id: &FlightCode) -> Result<Option<FlightSnapshot>, FetchError>;
}

fn bootstrap_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"trackpollBootstrap = (\{.*?\});").expect("bootstrap pattern is valid")
    })
}

/// Extracts the embedded flight data from a live flight page.
pub fn parse_flight_page(body: &str) -> Result<Option<FlightSnapshot>, FetchError> {
    let Some(json) = bootstrap_regex().captures(body).and_then(|c| c.get(1)) else {
        return Ok(None);
    };

    let bootstrap: TrackpollBootstrap = serde_json::from_str(json.as_str())?;
    Ok(bootstrap
        .into_first_flight()
        .map(FlightSnapshot::from)
        .filter(FlightSnapshot::is_resolved))
}

/// Scrapes FlightAware's live flight page.
#[derive(Clone)]
pub struct FlightAwareFetcher {
    client: Client,
    base_url: String,
}

impl FlightAwareFetcher {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SnapshotFetcher for FlightAwareFetcher {
    async fn fetch(&self, flight_id: &FlightCode) -> Result<Option<FlightSnapshot>, FetchError> {
        let url = format!("{}/live/flight/{}", self.base_url, flight_id);
        let resp = self.client.get(&url).send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(None),
            s if !s.is_success() => return Err(FetchError::Status(s.as_u16())),
            _ => {}
        }

        let body = resp.text().await?;
        let snapshot = parse_flight_page(&body)?;
        debug!(
            "Fetched {}: {}",
            flight_id,
            snapshot.as_ref().map_or("not found", |s| s.status.as_str())
        );
        Ok(snapshot)
    }
}
