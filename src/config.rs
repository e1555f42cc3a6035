//! Application configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honored for local runs.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CALLBACK_URL: &str = "https://fitbit.hackclub.cc/callback";
pub const DEFAULT_FITBIT_API_BASE: &str = "https://api.fitbit.com";
pub const DEFAULT_FITBIT_TOKEN_URL: &str = "https://api.fitbit.com/oauth2/token";
pub const DEFAULT_FITBIT_AUTHORIZE_URL: &str = "https://www.fitbit.com/oauth2/authorize";
pub const DEFAULT_SLACK_API_BASE: &str = "https://slack.com/api";

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Fitbit OAuth ---
    /// Fitbit OAuth client ID (public)
    pub fitbit_client_id: String,
    /// Fitbit OAuth client secret
    pub fitbit_client_secret: String,
    /// Redirect URI registered with Fitbit
    pub callback_url: String,
    /// Setup server port
    pub port: u16,
    /// Where the token record lives
    pub token_file: PathBuf,

    // --- Slack ---
    pub slack_bot_token: String,
    pub slack_channel_id: String,

    // --- Scheduling ---
    pub goal_hours: f64,
    /// Local hour at which the daily polling window opens.
    pub day_start_hour: u32,
    /// Local hour at which an undispatched day is abandoned.
    pub cutoff_hour: u32,
    pub poll_interval: Duration,
    pub refresh_interval: Duration,
    pub http_timeout: Duration,

    // --- Endpoints ---
    pub fitbit_api_base: String,
    pub fitbit_token_url: String,
    pub fitbit_authorize_url: String,
    pub slack_api_base: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            fitbit_client_id: required("FITBIT_CLIENT_ID")?,
            fitbit_client_secret: required("FITBIT_CLIENT_SECRET")?,
            callback_url: env::var("FITBIT_CALLBACK_URL")
                .unwrap_or_else(|_| DEFAULT_CALLBACK_URL.to_string()),
            port: parsed("PORT", 8080)?,
            token_file: env::var("TOKEN_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("tokens.json")),

            slack_bot_token: env::var("SLACK_BOT_TOKEN")
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
            slack_channel_id: env::var("SLACK_CHANNEL_ID").unwrap_or_default(),

            goal_hours: parsed("SLEEP_GOAL_HOURS", 8.0)?,
            day_start_hour: parsed("DAY_START_HOUR", 5)?,
            cutoff_hour: parsed("CUTOFF_HOUR", 22)?,
            poll_interval: Duration::from_secs(parsed("POLL_INTERVAL_SECS", 60 * 60)?),
            refresh_interval: Duration::from_secs(parsed(
                "TOKEN_REFRESH_INTERVAL_SECS",
                6 * 60 * 60,
            )?),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 30)?),

            fitbit_api_base: env::var("FITBIT_API_BASE")
                .unwrap_or_else(|_| DEFAULT_FITBIT_API_BASE.to_string()),
            fitbit_token_url: env::var("FITBIT_TOKEN_URL")
                .unwrap_or_else(|_| DEFAULT_FITBIT_TOKEN_URL.to_string()),
            fitbit_authorize_url: env::var("FITBIT_AUTHORIZE_URL")
                .unwrap_or_else(|_| DEFAULT_FITBIT_AUTHORIZE_URL.to_string()),
            slack_api_base: env::var("SLACK_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Deterministic config for tests. Endpoints point at localhost.
    pub fn test_default() -> Self {
        Self {
            fitbit_client_id: "test_client_id".to_string(),
            fitbit_client_secret: "test_secret".to_string(),
            callback_url: "http://localhost:8080/callback".to_string(),
            port: 8080,
            token_file: PathBuf::from("tokens.json"),
            slack_bot_token: "xoxb-test".to_string(),
            slack_channel_id: "C0TEST".to_string(),
            goal_hours: 8.0,
            day_start_hour: 5,
            cutoff_hour: 22,
            poll_interval: Duration::from_secs(60 * 60),
            refresh_interval: Duration::from_secs(6 * 60 * 60),
            http_timeout: Duration::from_secs(30),
            fitbit_api_base: "http://127.0.0.1:9".to_string(),
            fitbit_token_url: "http://127.0.0.1:9/oauth2/token".to_string(),
            fitbit_authorize_url: DEFAULT_FITBIT_AUTHORIZE_URL.to_string(),
            slack_api_base: "http://127.0.0.1:9".to_string(),
        }
    }

    /// Fail early if the daemon cannot possibly post anything.
    pub fn require_slack(&self) -> Result<(), ConfigError> {
        if self.slack_bot_token.is_empty() {
            return Err(ConfigError::Missing("SLACK_BOT_TOKEN"));
        }
        if self.slack_channel_id.is_empty() {
            return Err(ConfigError::Missing("SLACK_CHANNEL_ID"));
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.day_start_hour >= self.cutoff_hour || self.cutoff_hour > 24 {
            return Err(ConfigError::Invalid(
                "DAY_START_HOUR",
                format!(
                    "window {}:00-{}:00 is empty",
                    self.day_start_hour, self.cutoff_hour
                ),
            ));
        }
        if self.goal_hours.is_nan() || self.goal_hours <= 0.0 {
            return Err(ConfigError::Invalid(
                "SLEEP_GOAL_HOURS",
                self.goal_hours.to_string(),
            ));
        }
        if self.poll_interval.is_zero() || self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "POLL_INTERVAL_SECS",
                "intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Settings for the `lid` one-liner, which posts with its own bot token.
#[derive(Debug, Clone)]
pub struct LidConfig {
    pub bot_token: String,
    pub channel_id: String,
    pub slack_api_base: String,
    pub http_timeout: Duration,
}

impl LidConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        Ok(Self {
            bot_token: required("SLACK_WORKFLOW_BOT_TOKEN")?,
            channel_id: required("LID_CHANNEL_ID")?,
            slack_api_base: env::var("SLACK_API_BASE")
                .unwrap_or_else(|_| DEFAULT_SLACK_API_BASE.to_string()),
            http_timeout: Duration::from_secs(parsed("HTTP_TIMEOUT_SECS", 30)?),
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

fn parsed<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(value),
            Err(_) => Err(ConfigError::Invalid(name, raw)),
        },
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}
