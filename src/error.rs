//! Error types for each seam of the service.
//!
//! The split mirrors how failures are handled by the poll loop:
//!
//! - [`FetchError`]: transient upstream failure. The flight is skipped for
//!   this tick and nothing is written. A flight that simply does not exist
//!   is *not* an error; fetchers return `Ok(None)` for that.
//! - [`StoreError`]: a write did not land. The notification is abandoned
//!   before delivery and retried on the next tick.
//! - [`DeliveryError`]: the chat provider refused or never saw the message.
//!   Logged only; the milestone is already recorded as sent.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),

    #[error("malformed flight payload: {0}")]
    Payload(#[from] serde_json::Error),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Http(e)
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The keyed row vanished between listing and writing, typically
    /// because the flight was untracked mid-tick.
    #[error("tracked flight {0} no longer exists")]
    Missing(String),

    #[cfg(test)]
    #[error("injected store failure")]
    Injected,
}

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat API returned HTTP {0}")]
    Status(u16),

    #[error("chat API error: {0}")]
    Api(String),

    #[cfg(test)]
    #[error("injected delivery failure")]
    Injected,
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to encode map image: {0}")]
    Encode(String),

    #[error("failed to write map image: {0}")]
    Io(#[from] std::io::Error),

    #[error("upload failed: {0}")]
    Upload(#[from] reqwest::Error),

    #[error("upload rejected with HTTP {0}")]
    UploadStatus(u16),

    #[cfg(test)]
    #[error("injected map failure")]
    Injected,
}
