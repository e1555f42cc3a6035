// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! fitbit-sleep-bot: post last night's sleep to Slack every morning
//!
//! This crate keeps a Fitbit OAuth token pair alive, polls the sleep API
//! once the day's window opens, and sends a short summary per day.

pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use models::ClientCredentials;
use services::{FitbitClient, TokenStore};

/// Shared state for the one-time setup server.
pub struct AppState {
    pub client: FitbitClient,
    /// Includes the PKCE verifier matching `authorization_url`.
    pub credentials: ClientCredentials,
    pub store: TokenStore,
    pub authorization_url: String,
}
