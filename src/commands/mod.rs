//! Slash-command front end: `/api/track`, `/api/untrack` and `/api/list`.
//!
//! Only ever inserts or deletes single rows by key; the notification state
//! of a row is left entirely to the poller.

pub mod parse;
pub mod reply;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::engine::Phase;
use crate::error::{FetchError, StoreError};
use crate::models::flight::InvalidFlightCode;
use crate::models::FlightCode;
use parse::{parse_departure_date, parse_flight_code, split_command_text, InvalidDate};
pub use reply::{CommandReplier, WebhookReplier};

/// Form fields Slack posts for a slash command.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct SlashCommand {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub user_id: String,
    /// Where a late answer goes. Slack gives up on the inline reply after
    /// three seconds.
    #[serde(default)]
    pub response_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandResponse {
    pub response_type: &'static str,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    FlightCode(#[from] InvalidFlightCode),

    #[error(transparent)]
    Date(#[from] InvalidDate),

    #[error("flight {0} not found")]
    UnknownFlight(FlightCode),

    #[error("lookup failed: {0}")]
    Lookup(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("missing channel")]
    MissingChannel,
}

impl CommandError {
    fn user_message(&self) -> String {
        match self {
            CommandError::FlightCode(_) => {
                "Invalid flight number format. Please use a format like 'AA123' or 'DL4567'."
                    .to_string()
            }
            CommandError::Date(_) => {
                "Invalid date format. Please use 'today', 'tomorrow', 'DD/MM/YYYY', 'YYYY-MM-DD' or 'DD-MM-YYYY'."
                    .to_string()
            }
            CommandError::UnknownFlight(code) => {
                format!("Could not find flight {}. Please check the flight number.", code)
            }
            CommandError::Lookup(_) => {
                "Could not reach the flight data provider. Please try again in a moment."
                    .to_string()
            }
            CommandError::Store(_) => "Something went wrong saving your request.".to_string(),
            CommandError::MissingChannel => "This command must be run from a channel.".to_string(),
        }
    }
}

pub async fn track(
    ctx: &AppContext,
    cmd: &SlashCommand,
    now: DateTime<Utc>,
) -> Result<String, CommandError> {
    if cmd.channel_id.trim().is_empty() {
        return Err(CommandError::MissingChannel);
    }
    let (raw_code, raw_date) = split_command_text(&cmd.text);
    let code = parse_flight_code(raw_code)?;
    let departure_date = parse_departure_date(raw_date, now)?;

    // Unknown flights are never stored.
    if ctx.fetcher.fetch(&code).await?.is_none() {
        return Err(CommandError::UnknownFlight(code));
    }

    let inserted = ctx
        .store
        .upsert(&code, departure_date, cmd.channel_id.trim())
        .await?;
    let day = departure_date.format("%d %b %Y");
    if inserted {
        info!(
            "Tracking {} on {} for channel {} (requested by {})",
            code, day, cmd.channel_id, cmd.user_id
        );
        Ok(format!("Flight {} has been added for tracking on {}.", code, day))
    } else {
        Ok(format!("Flight {} is already being tracked on {}.", code, day))
    }
}

pub async fn untrack(ctx: &AppContext, cmd: &SlashCommand) -> Result<String, CommandError> {
    let (raw_code, _) = split_command_text(&cmd.text);
    let code = parse_flight_code(raw_code)?;

    if ctx.store.delete_latest(&code).await? {
        info!("Untracked {} for channel {}", code, cmd.channel_id);
        Ok(format!("Flight {} is no longer being tracked.", code))
    } else {
        Ok(format!("Flight {} was not being tracked.", code))
    }
}

pub async fn list(ctx: &AppContext, cmd: &SlashCommand) -> Result<String, CommandError> {
    let channel = cmd.channel_id.trim();
    let lines: Vec<String> = ctx
        .store
        .list_all()
        .await?
        .into_iter()
        .filter(|f| channel.is_empty() || f.channel_id == channel)
        .map(|f| {
            format!(
                "• *{}* on {} ({})",
                f.flight_id,
                f.departure_date.format("%d %b %Y"),
                Phase::of(&f).label()
            )
        })
        .collect();

    if lines.is_empty() {
        Ok("No flights are being tracked.".to_string())
    } else {
        Ok(format!("Tracked flights:\n{}", lines.join("\n")))
    }
}

fn respond(command: &str, result: Result<String, CommandError>) -> Json<CommandResponse> {
    Json(match result {
        Ok(text) => CommandResponse {
            response_type: "in_channel",
            text,
        },
        Err(e) => {
            warn!("Rejected {} request: {}", command, e);
            CommandResponse {
                response_type: "ephemeral",
                text: e.user_message(),
            }
        }
    })
}

/// Tracking needs an upstream lookup that can outlast Slack's reply window,
/// so the request is acknowledged at once and answered via `response_url`.
async fn track_handler(
    State(ctx): State<Arc<AppContext>>,
    Form(cmd): Form<SlashCommand>,
) -> Json<CommandResponse> {
    if cmd.response_url.trim().is_empty() {
        return respond("track", track(&ctx, &cmd, Utc::now()).await);
    }

    let ack = CommandResponse {
        response_type: "ephemeral",
        text: format!("Looking up {}...", cmd.text.trim()),
    };
    tokio::spawn(answer_track(ctx, cmd));
    Json(ack)
}

async fn answer_track(ctx: Arc<AppContext>, cmd: SlashCommand) {
    let Json(response) = respond("track", track(&ctx, &cmd, Utc::now()).await);
    if let Err(e) = ctx.replier.reply(cmd.response_url.trim(), &response).await {
        error!(
            "Failed to answer track request from channel {}: {}",
            cmd.channel_id, e
        );
    }
}

async fn untrack_handler(
    State(ctx): State<Arc<AppContext>>,
    Form(cmd): Form<SlashCommand>,
) -> Json<CommandResponse> {
    respond("untrack", untrack(&ctx, &cmd).await)
}

async fn list_handler(
    State(ctx): State<Arc<AppContext>>,
    Form(cmd): Form<SlashCommand>,
) -> Json<CommandResponse> {
    respond("list", list(&ctx, &cmd).await)
}

pub fn router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/", get(|| async { "flight tracker is running" }))
        .route("/api/track", post(track_handler))
        .route("/api/untrack", post(untrack_handler))
        .route("/api/list", post(list_handler))
        .with_state(ctx)
}
