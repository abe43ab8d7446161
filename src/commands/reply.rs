use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::CommandResponse;
use crate::error::DeliveryError;

/// Delivers a late answer to a slash command through its `response_url`.
#[async_trait]
pub trait CommandReplier: Send + Sync {
    async fn reply(&self, response_url: &str, response: &CommandResponse)
        -> Result<(), DeliveryError>;
}

#[derive(Clone)]
pub struct WebhookReplier {
    client: Client,
}

impl WebhookReplier {
    pub fn new(timeout: Duration) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl CommandReplier for WebhookReplier {
    async fn reply(
        &self,
        response_url: &str,
        response: &CommandResponse,
    ) -> Result<(), DeliveryError> {
        let resp = self.client.post(response_url).json(response).send().await?;
        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use tokio::sync::mpsc;

    /// Local stand-in for Slack's response_url endpoint.
    async fn webhook(status: StatusCode) -> (String, mpsc::UnboundedReceiver<Value>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(tx): State<mpsc::UnboundedSender<Value>>, Json(body): Json<Value>| async move {
                        let _ = tx.send(body);
                        status
                    },
                ),
            )
            .with_state(tx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/hook", addr), rx)
    }

    #[tokio::test]
    async fn posts_response_as_json() {
        let (url, mut rx) = webhook(StatusCode::OK).await;
        let replier = WebhookReplier::new(Duration::from_secs(5)).unwrap();
        let response = CommandResponse {
            response_type: "in_channel",
            text: "Flight AA100 has been added for tracking on 01 Mar 2025.".to_string(),
        };

        replier.reply(&url, &response).await.unwrap();

        assert_eq!(
            rx.recv().await.unwrap(),
            serde_json::json!({
                "response_type": "in_channel",
                "text": "Flight AA100 has been added for tracking on 01 Mar 2025.",
            })
        );
    }

    #[tokio::test]
    async fn rejected_webhook_is_an_error() {
        let (url, _rx) = webhook(StatusCode::NOT_FOUND).await;
        let replier = WebhookReplier::new(Duration::from_secs(5)).unwrap();
        let response = CommandResponse {
            response_type: "ephemeral",
            text: "x".to_string(),
        };

        let err = replier.reply(&url, &response).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(404)));
    }
}
