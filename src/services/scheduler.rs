// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily polling and notification loop.
//!
//! Each day the scheduler:
//! - sleeps until the window opens (05:00 local by default)
//! - polls Fitbit for today's sleep logs, backing off between attempts
//! - sends one summary as soon as logs appear
//! - gives up on the day at the cutoff hour (22:00 local by default)
//!
//! Token refresh runs independently on its own timer.

use crate::config::Config;
use crate::error::AppError;
use crate::models::SleepSession;
use crate::services::clock::Clock;
use crate::services::slack::Notifier;
use crate::services::summary::SleepSummary;
use crate::time_utils::next_occurrence;
use async_trait::async_trait;
use chrono::{NaiveDate, Timelike};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Source of sleep data that also owns the credentials used to get it.
#[async_trait]
pub trait SleepProvider: Send + Sync {
    async fn fetch_sleep(&self, date: NaiveDate) -> Result<SleepSession, AppError>;

    async fn refresh_tokens(&self) -> Result<(), AppError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    WaitingForWindow,
    PollingForData,
    Dispatched,
}

/// How a polling window ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowOutcome {
    Dispatched(NaiveDate),
    /// Cutoff reached with no summary sent.
    Abandoned(NaiveDate),
    AlreadyDispatched(NaiveDate),
}

#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub day_start_hour: u32,
    pub cutoff_hour: u32,
    /// Backoff between polls, after empty results and failures alike.
    pub poll_interval: Duration,
    pub goal_hours: f64,
    /// Start polling right away instead of waiting for the first window.
    pub skip_first_wait: bool,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config, skip_first_wait: bool) -> Self {
        Self {
            day_start_hour: config.day_start_hour,
            cutoff_hour: config.cutoff_hour,
            poll_interval: config.poll_interval,
            goal_hours: config.goal_hours,
            skip_first_wait,
        }
    }
}

/// The date a summary was last sent for.
#[derive(Debug, Clone, Default)]
pub struct DispatchState {
    last_dispatched: Option<NaiveDate>,
}

impl DispatchState {
    pub fn is_dispatched(&self, date: NaiveDate) -> bool {
        self.last_dispatched == Some(date)
    }

    /// Only called after a successful send.
    pub fn mark(&mut self, date: NaiveDate) {
        self.last_dispatched = Some(date);
    }

    pub fn last(&self) -> Option<NaiveDate> {
        self.last_dispatched
    }
}

pub struct DailyScheduler {
    provider: Arc<dyn SleepProvider>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    settings: SchedulerSettings,
    dispatch: DispatchState,
    state: SchedulerState,
    skip_wait: bool,
}

impl DailyScheduler {
    pub fn new(
        provider: Arc<dyn SleepProvider>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        settings: SchedulerSettings,
    ) -> Self {
        let skip_wait = settings.skip_first_wait;
        Self {
            provider,
            notifier,
            clock,
            settings,
            dispatch: DispatchState::default(),
            state: SchedulerState::WaitingForWindow,
            skip_wait,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn last_dispatched(&self) -> Option<NaiveDate> {
        self.dispatch.last()
    }

    /// Run forever.
    pub async fn run(mut self) {
        loop {
            self.wait_for_window().await;
            match self.run_window().await {
                WindowOutcome::Dispatched(date) => {
                    tracing::info!(%date, "Sleep summary dispatched");
                }
                WindowOutcome::Abandoned(date) => {
                    tracing::warn!(%date, "No sleep summary sent today");
                }
                WindowOutcome::AlreadyDispatched(date) => {
                    tracing::debug!(%date, "Already sent sleep data for today");
                }
            }
        }
    }

    /// Block until the next window opens.
    pub async fn wait_for_window(&mut self) {
        self.state = SchedulerState::WaitingForWindow;

        if std::mem::take(&mut self.skip_wait) {
            tracing::info!("Test mode: skipping wait for the polling window");
            return;
        }

        let now = self.clock.now();
        let mut next = next_occurrence(now, self.settings.day_start_hour);
        if self.dispatch.is_dispatched(next.date()) {
            // Summary already out for that date; wait for tomorrow's window.
            next += chrono::Duration::days(1);
        }
        let wait = (next - now).to_std().unwrap_or_default();
        tracing::info!(until = %next, "Sleeping until polling window opens");
        self.clock.sleep(wait).await;
    }

    /// Poll for today's data until it is dispatched or the cutoff passes.
    pub async fn run_window(&mut self) -> WindowOutcome {
        let date = self.clock.now().date();
        if self.dispatch.is_dispatched(date) {
            self.state = SchedulerState::Dispatched;
            return WindowOutcome::AlreadyDispatched(date);
        }

        self.state = SchedulerState::PollingForData;
        loop {
            let now = self.clock.now();
            if now.date() != date || now.hour() >= self.settings.cutoff_hour {
                tracing::warn!(%date, "Cutoff reached without sleep data, skipping day");
                self.state = SchedulerState::WaitingForWindow;
                return WindowOutcome::Abandoned(date);
            }

            if self.poll_once(date).await {
                self.dispatch.mark(date);
                self.state = SchedulerState::Dispatched;
                return WindowOutcome::Dispatched(date);
            }

            self.clock.sleep(self.settings.poll_interval).await;
        }
    }

    /// One fetch attempt. Returns true once the summary has been sent.
    async fn poll_once(&self, date: NaiveDate) -> bool {
        match self.provider.fetch_sleep(date).await {
            Ok(session) if session.is_empty() => {
                tracing::info!(%date, "No sleep data yet, retrying later");
                false
            }
            Ok(session) => {
                tracing::info!(%date, entries = session.entries.len(), "Found sleep data");
                let summary =
                    SleepSummary::from_session(&session, self.settings.goal_hours, self.clock.now());
                match self.send_summary(&summary).await {
                    Ok(()) => true,
                    Err(e) => {
                        tracing::warn!(error = %e, %date, "Failed to send sleep summary, will retry");
                        false
                    }
                }
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(%date, "Fitbit rejected the access token, refreshing");
                if let Err(e) = self.provider.refresh_tokens().await {
                    tracing::error!(error = %e, "Token refresh after 401 failed");
                }
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, %date, "Error getting sleep data");
                false
            }
        }
    }

    async fn send_summary(&self, summary: &SleepSummary) -> Result<(), AppError> {
        self.notifier.notify(&summary.headline()).await?;
        self.notifier.notify(&summary.progress()).await
    }
}

/// Refresh tokens every `interval`, forever. Failures are logged and the
/// old token stays in use.
pub fn spawn_refresh_timer(
    provider: Arc<dyn SleepProvider>,
    clock: Arc<dyn Clock>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            clock.sleep(interval).await;
            match provider.refresh_tokens().await {
                Ok(()) => tracing::debug!("Scheduled token refresh complete"),
                Err(e) => tracing::error!(error = %e, "Error refreshing token"),
            }
        }
    })
}
