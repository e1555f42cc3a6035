// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Fitbit Web API client and token lifecycle.
//!
//! Handles:
//! - Authorization-code exchange (PKCE) during setup
//! - Refresh-token exchange for the background daemon
//! - Date-scoped sleep log fetches

use crate::config::Config;
use crate::error::AppError;
use crate::models::{ClientCredentials, SleepResponse, SleepSession, TokenRecord};
use crate::services::pkce::PkcePair;
use crate::services::scheduler::SleepProvider;
use crate::services::token_store::TokenStore;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// Scopes requested during setup.
pub const FITBIT_SCOPES: &str = "sleep profile";

/// Margin before token expiration when we proactively refresh (5 minutes).
const TOKEN_REFRESH_MARGIN_SECS: i64 = 5 * 60;

/// Build the URL the user visits to authorize the app.
pub fn authorization_url(config: &Config, pkce: &PkcePair) -> String {
    format!(
        "{}?\
         client_id={}&\
         response_type=code&\
         code_challenge={}&\
         code_challenge_method={}&\
         scope={}&\
         redirect_uri={}",
        config.fitbit_authorize_url,
        urlencoding::encode(&config.fitbit_client_id),
        pkce.challenge,
        pkce.method(),
        urlencoding::encode(FITBIT_SCOPES),
        urlencoding::encode(&config.callback_url),
    )
}

/// Fitbit API client. Stateless apart from the connection pool.
#[derive(Clone)]
pub struct FitbitClient {
    http: reqwest::Client,
    api_base: String,
    token_url: String,
}

impl FitbitClient {
    /// Create a client using the endpoints and timeout from config.
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| AppError::Internal(anyhow::anyhow!("HTTP client init failed: {}", e)))?;

        Ok(Self {
            http,
            api_base: config.fitbit_api_base.trim_end_matches('/').to_string(),
            token_url: config.fitbit_token_url.clone(),
        })
    }

    /// Exchange an authorization code (plus PKCE verifier) for tokens.
    pub async fn exchange_authorization_code(
        &self,
        code: &str,
        credentials: &ClientCredentials,
    ) -> Result<TokenRecord, AppError> {
        let pkce = credentials.pkce.as_ref().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("No PKCE verifier for this setup session"))
        })?;

        self.post_token_form(
            credentials,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("code", code),
                ("code_verifier", pkce.verifier.as_str()),
                ("grant_type", "authorization_code"),
                ("redirect_uri", credentials.redirect_uri.as_str()),
            ],
        )
        .await
    }

    /// Exchange the current refresh token for a new record.
    ///
    /// Fitbit refresh tokens are single use: after success the old one is dead.
    pub async fn refresh(
        &self,
        current: &TokenRecord,
        credentials: &ClientCredentials,
    ) -> Result<TokenRecord, AppError> {
        self.post_token_form(
            credentials,
            &[
                ("client_id", credentials.client_id.as_str()),
                ("grant_type", "refresh_token"),
                ("refresh_token", current.refresh_token.as_str()),
            ],
        )
        .await
    }

    /// Get all sleep logs for `date`. An empty list means "not synced yet".
    pub async fn fetch_sleep(
        &self,
        access_token: &str,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<SleepSession, AppError> {
        let url = format!(
            "{}/1.2/user/{}/sleep/date/{}.json",
            self.api_base,
            user_id,
            date.format("%Y-%m-%d")
        );

        let response = self.http.get(&url).bearer_auth(access_token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AppError::Unauthorized);
        }
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(AppError::Provider {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SleepResponse = serde_json::from_str(&body)?;
        tracing::debug!(%date, entries = parsed.sleep.len(), "Fetched sleep logs");
        Ok(SleepSession::new(date, parsed.sleep))
    }

    /// POST to the token endpoint with HTTP Basic client authentication.
    async fn post_token_form(
        &self,
        credentials: &ClientCredentials,
        form: &[(&str, &str)],
    ) -> Result<TokenRecord, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status != StatusCode::OK {
            return Err(AppError::TokenEndpoint {
                status: status.as_u16(),
                body,
            });
        }

        let token: TokenResponse = serde_json::from_str(&body)?;
        Ok(token.into_record())
    }
}

/// Token endpoint response from Fitbit.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    token_type: String,
    user_id: String,
}

impl TokenResponse {
    fn into_record(self) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            expires_in: self.expires_in,
            token_type: self.token_type,
            user_id: self.user_id,
            obtained_at: Some(Utc::now()),
        }
    }
}

/// Finish interactive setup: exchange the code and persist the record.
pub async fn complete_authorization(
    client: &FitbitClient,
    store: &TokenStore,
    code: &str,
    credentials: &ClientCredentials,
) -> Result<TokenRecord, AppError> {
    let record = client.exchange_authorization_code(code, credentials).await?;
    store.save(&record)?;
    tracing::info!(user_id = %record.user_id, "Fitbit tokens saved");
    Ok(record)
}

// ─────────────────────────────────────────────────────────────────────────────
// FitbitService - Token-managed API access for the daemon
// ─────────────────────────────────────────────────────────────────────────────

/// Owns the live token record and serializes every change to it.
///
/// Readers clone a snapshot under the read lock, so a refresh landing in the
/// middle of a request never changes the bearer value already in flight.
#[derive(Clone)]
pub struct FitbitService {
    client: FitbitClient,
    credentials: ClientCredentials,
    store: TokenStore,
    tokens: Arc<RwLock<TokenRecord>>,
    /// Held for the whole refresh so the single-use refresh token is spent once.
    refresh_lock: Arc<Mutex<()>>,
}

impl FitbitService {
    pub fn new(
        client: FitbitClient,
        credentials: ClientCredentials,
        store: TokenStore,
        record: TokenRecord,
    ) -> Self {
        Self {
            client,
            credentials,
            store,
            tokens: Arc::new(RwLock::new(record)),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Start from the persisted record. Fails if setup never ran.
    pub fn load(
        client: FitbitClient,
        credentials: ClientCredentials,
        store: TokenStore,
    ) -> Result<Self, AppError> {
        let record = store.load()?;
        tracing::info!(user_id = %record.user_id, "Loaded Fitbit tokens");
        Ok(Self::new(client, credentials, store, record))
    }

    /// Consistent copy of the current record.
    pub async fn snapshot(&self) -> TokenRecord {
        self.tokens.read().await.clone()
    }

    /// Refresh the token pair, then replace and persist the record.
    ///
    /// On failure the cached record is untouched.
    pub async fn refresh_tokens(&self) -> Result<(), AppError> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.snapshot().await;
        let fresh = self.client.refresh(&current, &self.credentials).await?;

        let mut tokens = self.tokens.write().await;
        *tokens = fresh;
        // The old refresh token is already spent, so memory keeps the new
        // record even if the write below fails.
        self.store.save(&tokens)?;

        tracing::info!(user_id = %tokens.user_id, "Fitbit token refreshed and saved");
        Ok(())
    }

    /// Fetch sleep logs with the current access token.
    pub async fn fetch_sleep(&self, date: NaiveDate) -> Result<SleepSession, AppError> {
        self.refresh_if_expired().await;

        let token = self.snapshot().await;
        self.client
            .fetch_sleep(&token.access_token, &token.user_id, date)
            .await
    }

    async fn refresh_if_expired(&self) {
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if !self.snapshot().await.is_expired(Utc::now(), margin) {
            return;
        }

        tracing::info!("Access token expired, refreshing before fetch");
        if let Err(e) = self.refresh_tokens().await {
            tracing::warn!(error = %e, "Proactive token refresh failed, using old token");
        }
    }
}

#[async_trait]
impl SleepProvider for FitbitService {
    async fn fetch_sleep(&self, date: NaiveDate) -> Result<SleepSession, AppError> {
        FitbitService::fetch_sleep(self, date).await
    }

    async fn refresh_tokens(&self) -> Result<(), AppError> {
        FitbitService::refresh_tokens(self).await
    }
}
