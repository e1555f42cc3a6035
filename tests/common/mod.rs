// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use fitbit_sleep_bot::config::Config;
use fitbit_sleep_bot::error::AppError;
use fitbit_sleep_bot::models::{SleepLogEntry, SleepSession, TokenRecord};
use fitbit_sleep_bot::services::{Notifier, SleepProvider};
use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Config with every endpoint pointed at a mock server.
#[allow(dead_code)]
pub fn test_config(server_uri: &str, token_file: &Path) -> Config {
    Config {
        fitbit_api_base: server_uri.to_string(),
        fitbit_token_url: format!("{}/oauth2/token", server_uri),
        slack_api_base: server_uri.to_string(),
        token_file: token_file.to_path_buf(),
        ..Config::test_default()
    }
}

#[allow(dead_code)]
pub fn token_record(access: &str, refresh: &str) -> TokenRecord {
    TokenRecord {
        access_token: access.to_string(),
        refresh_token: refresh.to_string(),
        expires_in: 28800,
        token_type: "Bearer".to_string(),
        user_id: "ABC123".to_string(),
        obtained_at: Some(chrono::Utc::now()),
    }
}

#[allow(dead_code)]
pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

#[allow(dead_code)]
pub fn entry(start: &str, end: &str, duration_ms: i64) -> SleepLogEntry {
    SleepLogEntry {
        start_time: start.to_string(),
        end_time: end.to_string(),
        duration: duration_ms,
        date_of_sleep: None,
        minutes_asleep: None,
        efficiency: None,
        is_main_sleep: Some(true),
        log_id: None,
    }
}

/// An eight hour night ending on the morning of 2024-01-02.
#[allow(dead_code)]
pub fn full_night() -> Vec<SleepLogEntry> {
    vec![entry(
        "2024-01-01T23:00:00.000",
        "2024-01-02T07:00:00.000",
        8 * 3_600_000,
    )]
}

/// Sleep provider that replays queued results, then returns `fallback`.
#[allow(dead_code)]
pub struct FakeProvider {
    queued: Mutex<VecDeque<Result<Vec<SleepLogEntry>, AppError>>>,
    fallback: Vec<SleepLogEntry>,
    refresh_fails: bool,
    pub fetches: AtomicUsize,
    pub refreshes: AtomicUsize,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new(fallback: Vec<SleepLogEntry>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback,
            refresh_fails: false,
            fetches: AtomicUsize::new(0),
            refreshes: AtomicUsize::new(0),
        }
    }

    pub fn with_failing_refresh(mut self) -> Self {
        self.refresh_fails = true;
        self
    }

    pub fn push(&self, result: Result<Vec<SleepLogEntry>, AppError>) {
        self.queued.lock().unwrap().push_back(result);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn refresh_count(&self) -> usize {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SleepProvider for FakeProvider {
    async fn fetch_sleep(&self, date: NaiveDate) -> Result<SleepSession, AppError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let next = self.queued.lock().unwrap().pop_front();
        let entries = match next {
            Some(result) => result?,
            None => self.fallback.clone(),
        };
        Ok(SleepSession::new(date, entries))
    }

    async fn refresh_tokens(&self) -> Result<(), AppError> {
        self.refreshes.fetch_add(1, Ordering::SeqCst);
        if self.refresh_fails {
            return Err(AppError::TokenEndpoint {
                status: 400,
                body: "invalid_grant".to_string(),
            });
        }
        Ok(())
    }
}

/// Notifier that records delivered messages and can fail on chosen calls.
#[allow(dead_code)]
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    /// 1-based call numbers that should fail.
    fail_on: Mutex<Vec<usize>>,
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn failing_on(calls: &[usize]) -> Self {
        Self {
            fail_on: Mutex::new(calls.to_vec()),
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, text: &str) -> Result<(), AppError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on.lock().unwrap().contains(&call) {
            return Err(AppError::Notify {
                code: 200,
                message: "ratelimited".to_string(),
            });
        }
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}
