// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! fitbit-sleep-bot daemon
//!
//! Runs the daily sleep summary loop, the one-time OAuth setup server, or the
//! lid sleep/wake one-liner, depending on the subcommand.

use clap::Parser;
use fitbit_sleep_bot::{
    cli::{Cli, Command, LidEvent},
    config::{Config, LidConfig},
    models::ClientCredentials,
    services::{
        fitbit::authorization_url, scheduler::spawn_refresh_timer, Clock, DailyScheduler,
        FitbitClient, FitbitService, PkcePair, SchedulerSettings, SleepProvider, SlackNotifier,
        SystemClock, TokenStore,
    },
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let cli = Cli::parse();
    match cli.command {
        None => run_bot(false).await,
        Some(Command::Test) => run_bot(true).await,
        Some(Command::Setup) => run_setup().await,
        Some(Command::Lid { event }) => run_lid(event).await,
    }
}

/// Daily loop plus background token refresh.
async fn run_bot(skip_first_wait: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    config.require_slack()?;

    let client = FitbitClient::new(&config)?;
    let store = TokenStore::new(&config.token_file);
    let credentials = ClientCredentials::from_config(&config);

    // Missing tokens are fatal: the bot cannot run without a prior setup.
    let fitbit = Arc::new(FitbitService::load(client, credentials, store)?);
    let notifier = Arc::new(SlackNotifier::new(&config)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let provider: Arc<dyn SleepProvider> = fitbit;

    tracing::info!(
        start_hour = config.day_start_hour,
        cutoff_hour = config.cutoff_hour,
        goal_hours = config.goal_hours,
        "Starting fitbit-sleep-bot"
    );

    let refresh = spawn_refresh_timer(provider.clone(), clock.clone(), config.refresh_interval);
    let scheduler = DailyScheduler::new(
        provider,
        notifier,
        clock,
        SchedulerSettings::from_config(&config, skip_first_wait),
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupt received, shutting down");
        }
    }

    refresh.abort();
    Ok(())
}

/// Print the authorization URL and serve the callback until interrupted.
async fn run_setup() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let pkce = PkcePair::generate()?;
    let auth_url = authorization_url(&config, &pkce);

    println!("{}", auth_url);
    tracing::info!(url = %auth_url, "Visit the following URL to authorize the application");

    let state = Arc::new(AppState {
        client: FitbitClient::new(&config)?,
        credentials: ClientCredentials::for_setup(&config, pkce),
        store: TokenStore::new(&config.token_file),
        authorization_url: auth_url,
    });

    let app = fitbit_sleep_bot::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Setup server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

async fn run_lid(event: LidEvent) -> Result<(), Box<dyn std::error::Error>> {
    let config = LidConfig::from_env()?;
    let notifier = SlackNotifier::for_lid(&config)?;
    notifier
        .post_message(&config.channel_id, event.message())
        .await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("fitbit_sleep_bot=debug,info"));

    tracing_subscriber::registry().with(filter).with(format).init();
}
