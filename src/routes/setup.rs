// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! One-time Fitbit OAuth setup routes.

use axum::{
    extract::{Query, State},
    response::{Html, Redirect},
    routing::get,
    Router,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::services::fitbit::complete_authorization;
use crate::AppState;

const SETUP_COMPLETE_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>fitbit-sleep-bot</title>
</head>
<body>
    <h1>setup complete ^-^</h1>
    <p>You can close this tab and start the bot.</p>
</body>
</html>
"#;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", get(login))
        .route("/callback", get(callback))
}

/// Redirect to the Fitbit consent page for this setup session.
async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    Redirect::temporary(&state.authorization_url)
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback - exchange code for tokens and persist them.
async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>> {
    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Fitbit");
        return Err(AppError::BadRequest(format!("Authorization denied: {}", error)));
    }

    let code = params
        .code
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Missing code".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");

    let record =
        complete_authorization(&state.client, &state.store, &code, &state.credentials)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Fitbit token exchange failed"))?;

    tracing::info!(user_id = %record.user_id, "Setup complete");
    Ok(Html(SETUP_COMPLETE_HTML))
}
