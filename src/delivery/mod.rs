pub mod cdn;
pub mod format;
pub mod map;
pub mod slack;

use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

use crate::error::{DeliveryError, MapError};
use crate::models::TrackPoint;

pub use cdn::{CdnUploader, MapUploader};
pub use map::{MapRenderer, PngMapRenderer};
pub use slack::{SlackClient, SlackMessage};

#[async_trait]
pub trait DeliverySink: Send + Sync {
    async fn send(&self, message: &SlackMessage) -> Result<(), DeliveryError>;
}

/// Renders a position map and publishes it, returning a public URL.
#[derive(Clone)]
pub struct MapPublisher {
    renderer: Arc<dyn MapRenderer>,
    uploader: Arc<dyn MapUploader>,
}

impl MapPublisher {
    pub fn new(renderer: Arc<dyn MapRenderer>, uploader: Arc<dyn MapUploader>) -> Self {
        Self { renderer, uploader }
    }

    pub async fn publish(
        &self,
        position: &TrackPoint,
        track: &[TrackPoint],
        heading: Option<f64>,
    ) -> Result<String, MapError> {
        let image = self.renderer.render(position, track, heading)?;
        let uploaded = self.uploader.upload(image.path()).await;
        // The temporary image goes whether or not the upload worked.
        if let Err(e) = image.close() {
            warn!("Failed to remove temporary map image: {}", e);
        }
        uploaded
    }
}
