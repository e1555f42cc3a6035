// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Human-readable daily sleep summary.

use crate::models::SleepSession;
use crate::time_utils::format_clock_time;
use chrono::{Duration, NaiveDateTime};

const BAR_BLOCKS: usize = 10;
const FILLED: char = '█';
const EMPTY: char = '░';

/// Everything needed to render the two summary messages.
#[derive(Debug, Clone, PartialEq)]
pub struct SleepSummary {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub asleep: Duration,
    pub goal_hours: f64,
}

impl SleepSummary {
    /// Aggregate a session. Boundaries that cannot be parsed become `now`.
    pub fn from_session(session: &SleepSession, goal_hours: f64, now: NaiveDateTime) -> Self {
        let start = session.earliest_start().unwrap_or_else(|| {
            tracing::warn!(date = %session.date, "Unparseable sleep start times, using now");
            now
        });
        let end = session.latest_end().unwrap_or_else(|| {
            tracing::warn!(date = %session.date, "Unparseable sleep end times, using now");
            now
        });

        Self {
            start,
            end,
            asleep: session.total_asleep(),
            goal_hours,
        }
    }

    pub fn hours(&self) -> f64 {
        hours(self.asleep)
    }

    /// "I slept from 11:00 PM -> 7:00 AM for a total of 8.0 hours!"
    pub fn headline(&self) -> String {
        format!(
            "I slept from {} -> {} for a total of {:.1} hours!",
            format_clock_time(self.start),
            format_clock_time(self.end),
            self.hours()
        )
    }

    /// "`█████░░░░░` (4.0h/8.0h)"
    pub fn progress(&self) -> String {
        format!(
            "`{}` ({:.1}h/{:.1}h)",
            sleep_bar(self.asleep, self.goal_hours),
            self.hours(),
            self.goal_hours
        )
    }
}

fn hours(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64 / (1000.0 * 60.0 * 60.0)
}

/// Ten-block bar filled in proportion to `slept / goal`, capped at full.
pub fn sleep_bar(slept: Duration, goal_hours: f64) -> String {
    let percent = if goal_hours > 0.0 {
        (hours(slept) / goal_hours * 100.0).clamp(0.0, 100.0)
    } else {
        100.0
    };
    let filled = ((percent / 10.0).floor() as usize).min(BAR_BLOCKS);

    std::iter::repeat(FILLED)
        .take(filled)
        .chain(std::iter::repeat(EMPTY).take(BAR_BLOCKS - filled))
        .collect()
}
