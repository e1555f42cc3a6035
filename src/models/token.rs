//! OAuth token and client credential models.

use crate::config::Config;
use crate::services::pkce::PkcePair;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The single persisted Fitbit token record.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, as reported at issue time
    pub expires_in: i64,
    pub token_type: String,
    /// Fitbit encoded user ID
    pub user_id: String,
    /// When the token was issued (absent in records written by older setups)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obtained_at: Option<DateTime<Utc>>,
}

impl TokenRecord {
    /// Absolute expiry, if the issue time is known.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.obtained_at
            .map(|at| at + Duration::seconds(self.expires_in))
    }

    /// True only when the record is known to expire within `margin` of `now`.
    pub fn is_expired(&self, now: DateTime<Utc>, margin: Duration) -> bool {
        self.expires_at()
            .map(|expires_at| now + margin >= expires_at)
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for TokenRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecord")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("user_id", &self.user_id)
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}

/// Client identity used against the token endpoint.
///
/// The PKCE pair only exists during a setup session; the background daemon
/// carries credentials without one.
#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub pkce: Option<PkcePair>,
}

impl ClientCredentials {
    /// Long-lived credentials for token refresh.
    pub fn from_config(config: &Config) -> Self {
        Self {
            client_id: config.fitbit_client_id.clone(),
            client_secret: config.fitbit_client_secret.clone(),
            redirect_uri: config.callback_url.clone(),
            pkce: None,
        }
    }

    /// Credentials for one interactive setup session.
    pub fn for_setup(config: &Config, pkce: PkcePair) -> Self {
        Self {
            pkce: Some(pkce),
            ..Self::from_config(config)
        }
    }
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("pkce", &self.pkce)
            .finish()
    }
}
