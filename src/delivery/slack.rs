use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::DeliverySink;
use crate::error::DeliveryError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlackMessage {
    pub channel: String,
    /// Plain-text fallback shown in notifications.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: Text },
    Divider,
    Image { image_url: String, alt_text: String },
}

impl Block {
    pub fn markdown(text: impl Into<String>) -> Self {
        Block::Section {
            text: Text {
                kind: "mrkdwn",
                text: text.into(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts messages through the Web API `chat.postMessage` method.
#[derive(Clone)]
pub struct SlackClient {
    client: Client,
    api_url: String,
    token: String,
}

impl SlackClient {
    pub fn new(api_url: &str, token: &str) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }
}

#[async_trait]
impl DeliverySink for SlackClient {
    async fn send(&self, message: &SlackMessage) -> Result<(), DeliveryError> {
        let resp = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(&self.token)
            .json(message)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(DeliveryError::Status(resp.status().as_u16()));
        }

        let body: PostMessageResponse = resp.json().await?;
        if !body.ok {
            return Err(DeliveryError::Api(
                body.error.unwrap_or_else(|| "unknown_error".to_string()),
            ));
        }
        Ok(())
    }
}
