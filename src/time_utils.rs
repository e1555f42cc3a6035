// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Fitbit local timestamps, e.g. `2024-01-01T23:00:00.000`.
const FITBIT_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"];

/// Parse a Fitbit sleep-log timestamp.
pub fn parse_fitbit_timestamp(raw: &str) -> Option<NaiveDateTime> {
    FITBIT_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
}

/// Format as a 12-hour clock time, e.g. `11:00 PM`.
pub fn format_clock_time(time: NaiveDateTime) -> String {
    time.format("%-I:%M %p").to_string()
}

/// Next time the wall clock reads `hour:00`, today if not yet passed.
pub fn next_occurrence(now: NaiveDateTime, hour: u32) -> NaiveDateTime {
    let at = NaiveTime::from_hms_opt(hour % 24, 0, 0).unwrap_or(NaiveTime::MIN);
    let candidate = now.date().and_time(at);
    if now > candidate {
        candidate + Duration::days(1)
    } else {
        candidate
    }
}
