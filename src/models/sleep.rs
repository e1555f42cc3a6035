//! Sleep log models for the Fitbit sleep endpoint.

use crate::time_utils::parse_fitbit_timestamp;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Body of `GET /1.2/user/{id}/sleep/date/{date}.json`.
///
/// Only `sleep` is required; the per-day `summary` and any other fields are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct SleepResponse {
    pub sleep: Vec<SleepLogEntry>,
}

/// One sleep log as reported by Fitbit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepLogEntry {
    /// Local time, `YYYY-MM-DDTHH:MM:SS.mmm`
    pub start_time: String,
    pub end_time: String,
    /// Milliseconds
    pub duration: i64,
    #[serde(default)]
    pub date_of_sleep: Option<String>,
    #[serde(default)]
    pub minutes_asleep: Option<u32>,
    #[serde(default)]
    pub efficiency: Option<u32>,
    #[serde(default)]
    pub is_main_sleep: Option<bool>,
    #[serde(default)]
    pub log_id: Option<i64>,
}

/// All sleep logs for one calendar day.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepSession {
    pub date: NaiveDate,
    pub entries: Vec<SleepLogEntry>,
}

impl SleepSession {
    pub fn new(date: NaiveDate, entries: Vec<SleepLogEntry>) -> Self {
        Self { date, entries }
    }

    /// `YYYY-MM-DD`
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// No logs yet for this date.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of all entry durations.
    pub fn total_asleep(&self) -> Duration {
        Duration::milliseconds(self.entries.iter().map(|e| e.duration).sum())
    }

    pub fn total_hours(&self) -> f64 {
        self.total_asleep().num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0)
    }

    /// Earliest parseable start across all entries.
    pub fn earliest_start(&self) -> Option<NaiveDateTime> {
        self.entries
            .iter()
            .filter_map(|e| parse_fitbit_timestamp(&e.start_time))
            .min()
    }

    /// Latest parseable end across all entries.
    pub fn latest_end(&self) -> Option<NaiveDateTime> {
        self.entries
            .iter()
            .filter_map(|e| parse_fitbit_timestamp(&e.end_time))
            .max()
    }
}
