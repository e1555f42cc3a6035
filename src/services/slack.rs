// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Slack `chat.postMessage` notification sink.

use crate::config::{Config, LidConfig};
use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Something that can deliver a line of text to a human.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, text: &str) -> Result<(), AppError>;
}

/// Posts messages to one Slack channel with a bot token.
#[derive(Clone)]
pub struct SlackNotifier {
    http: reqwest::Client,
    api_base: String,
    token: String,
    channel: String,
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

impl SlackNotifier {
    /// Notifier for the daily sleep summary.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        Self::build(
            &config.slack_api_base,
            &config.slack_bot_token,
            &config.slack_channel_id,
            config.http_timeout,
        )
    }

    /// Notifier for lid sleep/wake events.
    pub fn for_lid(config: &LidConfig) -> Result<Self, AppError> {
        Self::build(
            &config.slack_api_base,
            &config.bot_token,
            &config.channel_id,
            config.http_timeout,
        )
    }

    fn build(
        api_base: &str,
        token: &str,
        channel: &str,
        timeout: Duration,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
            channel: channel.to_string(),
        })
    }

    /// Post `text` to `channel`.
    pub async fn post_message(&self, channel: &str, text: &str) -> Result<(), AppError> {
        tracing::info!(channel, text, "Sending Slack message");

        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.api_base))
            .bearer_auth(&self.token)
            .json(&PostMessage { channel, text })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Notify {
                code: status.as_u16(),
                message: body,
            });
        }

        let result: PostMessageResponse = response.json().await?;
        if !result.ok {
            return Err(AppError::Notify {
                code: status.as_u16(),
                message: result.error.unwrap_or_else(|| "unknown_error".to_string()),
            });
        }

        tracing::debug!(channel, "Slack message sent");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, text: &str) -> Result<(), AppError> {
        self.post_message(&self.channel, text).await
    }
}
