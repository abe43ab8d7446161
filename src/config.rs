use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::str::FromStr;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub slack_bot_token: String,
    pub slack_api_url: String,
    pub port: u16,
    pub poll_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub fetch_concurrency: usize,
    pub pre_departure_window_mins: i64,
    pub cruise_interval_mins: i64,
    pub stale_after_hours: i64,
    pub purge_after_hours: i64,
    pub flightaware_base_url: String,
    pub cdn_upload_url: Option<String>,
    pub log_level: String,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let db_host = env::var("DB_HOST").unwrap_or_else(|_| "localhost".to_string());
        let db_port = env::var("DB_PORT").unwrap_or_else(|_| "5432".to_string());
        let db_name = env::var("DB_DATABASE").unwrap_or_else(|_| "flight_tracker".to_string());
        let db_user = env::var("DB_USER").unwrap_or_else(|_| "flights".to_string());
        let db_pwd = env::var("DB_PWD").unwrap_or_else(|_| "flights".to_string());

        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}",
            db_user, db_pwd, db_host, db_port, db_name
        );
        let db_max_connections = parse_or("DB_MAX_CONNECTIONS", 10);

        let slack_bot_token = env::var("SLACK_BOT_TOKEN").unwrap_or_default();
        if slack_bot_token.is_empty() {
            anyhow::bail!("SLACK_BOT_TOKEN must be set");
        }
        let slack_api_url =
            env::var("SLACK_API_URL").unwrap_or_else(|_| "https://slack.com/api".to_string());

        let port = parse_or("PORT", 8080);
        let poll_interval_secs = parse_or("POLL_INTERVAL_SECS", 60);
        let fetch_timeout_secs = parse_or("FETCH_TIMEOUT_SECS", 10);
        let fetch_concurrency = parse_or::<usize>("FETCH_CONCURRENCY", 1).max(1);
        let pre_departure_window_mins = parse_or("PRE_DEPARTURE_WINDOW_MINS", 30);
        let cruise_interval_mins = parse_or("CRUISE_INTERVAL_MINS", 120);
        let stale_after_hours = parse_or("STALE_AFTER_HOURS", 36);
        let purge_after_hours = parse_or("PURGE_AFTER_HOURS", 96);

        let flightaware_base_url = env::var("FLIGHTAWARE_BASE_URL")
            .unwrap_or_else(|_| "https://fr.flightaware.com".to_string());
        let cdn_upload_url = env::var("CDN_UPLOAD_URL").ok().filter(|s| !s.trim().is_empty());

        let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            database_url,
            db_max_connections,
            slack_bot_token,
            slack_api_url,
            port,
            poll_interval_secs,
            fetch_timeout_secs,
            fetch_concurrency,
            pre_departure_window_mins,
            cruise_interval_mins,
            stale_after_hours,
            purge_after_hours,
            flightaware_base_url,
            cdn_upload_url,
            log_level,
        })
    }
}

fn parse_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
