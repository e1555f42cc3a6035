// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Daily scheduler behavior on a manual clock.

use chrono::NaiveDate;
use fitbit_sleep_bot::error::AppError;
use fitbit_sleep_bot::services::scheduler::{
    spawn_refresh_timer, SchedulerState, WindowOutcome,
};
use fitbit_sleep_bot::services::{
    Clock, DailyScheduler, ManualClock, SchedulerSettings, SystemClock,
};
use std::sync::Arc;
use std::time::Duration;

mod common;
use common::{at, entry, full_night, FakeProvider, RecordingNotifier};

const HOUR: Duration = Duration::from_secs(3600);

fn settings(skip_first_wait: bool) -> SchedulerSettings {
    SchedulerSettings {
        day_start_hour: 5,
        cutoff_hour: 22,
        poll_interval: HOUR,
        goal_hours: 8.0,
        skip_first_wait,
    }
}

fn scheduler(
    provider: &Arc<FakeProvider>,
    notifier: &Arc<RecordingNotifier>,
    clock: &Arc<ManualClock>,
) -> DailyScheduler {
    DailyScheduler::new(
        provider.clone(),
        notifier.clone(),
        clock.clone(),
        settings(false),
    )
}

fn jan(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
}

#[tokio::test]
async fn test_dispatches_once_per_date() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));
    assert_eq!(scheduler.state(), SchedulerState::Dispatched);
    assert_eq!(scheduler.last_dispatched(), Some(jan(2)));

    // Data is still there on later polls the same day, but nothing is resent.
    clock.set(at(2024, 1, 2, 9, 0));
    assert_eq!(
        scheduler.run_window().await,
        WindowOutcome::AlreadyDispatched(jan(2))
    );

    assert_eq!(
        notifier.sent(),
        vec![
            "I slept from 11:00 PM -> 7:00 AM for a total of 8.0 hours!".to_string(),
            "`██████████` (8.0h/8.0h)".to_string(),
        ]
    );
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn test_empty_results_back_off_hourly_until_data() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    for _ in 0..3 {
        provider.push(Ok(vec![]));
    }
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));

    assert_eq!(clock.sleeps(), vec![HOUR, HOUR, HOUR]);
    assert_eq!(clock.now(), at(2024, 1, 2, 8, 0));
    assert_eq!(provider.fetch_count(), 4);
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_day_abandoned_at_cutoff() {
    let provider = Arc::new(FakeProvider::new(vec![]));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Abandoned(jan(2)));

    // One poll per hour from 05:00 through 21:00.
    assert_eq!(provider.fetch_count(), 17);
    assert_eq!(clock.now(), at(2024, 1, 2, 22, 0));
    assert!(notifier.sent().is_empty());
    assert_eq!(scheduler.last_dispatched(), None);
    assert_eq!(scheduler.state(), SchedulerState::WaitingForWindow);
}

#[tokio::test]
async fn test_window_opened_after_cutoff_is_abandoned_immediately() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 23, 30)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Abandoned(jan(2)));
    assert_eq!(provider.fetch_count(), 0);
}

#[tokio::test]
async fn test_send_failure_leaves_date_undispatched_and_retries() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    // First headline fails, so the whole summary is retried next poll.
    let notifier = Arc::new(RecordingNotifier::failing_on(&[1]));
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 6, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));

    assert_eq!(provider.fetch_count(), 2);
    assert_eq!(clock.sleeps(), vec![HOUR]);
    assert_eq!(notifier.sent().len(), 2);
}

#[tokio::test]
async fn test_second_message_failure_resends_both() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::failing_on(&[2]));
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 6, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));

    let sent = notifier.sent();
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0], sent[1]);
    assert!(sent[2].contains("8.0h/8.0h"));
}

#[tokio::test]
async fn test_transient_errors_do_not_abort_the_day() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    provider.push(Err(AppError::Transport("connection reset".to_string())));
    provider.push(Err(AppError::Provider {
        status: 503,
        body: "unavailable".to_string(),
    }));
    provider.push(Err(AppError::Decode("expected value".to_string())));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));

    assert_eq!(provider.fetch_count(), 4);
    assert_eq!(provider.refresh_count(), 0);
    assert_eq!(clock.sleeps(), vec![HOUR, HOUR, HOUR]);
}

#[tokio::test]
async fn test_unauthorized_triggers_refresh() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    provider.push(Err(AppError::Unauthorized));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));
    assert_eq!(provider.refresh_count(), 1);
}

#[tokio::test]
async fn test_failed_refresh_after_unauthorized_keeps_polling() {
    let provider = Arc::new(FakeProvider::new(full_night()).with_failing_refresh());
    provider.push(Err(AppError::Unauthorized));
    provider.push(Err(AppError::Unauthorized));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 5, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));
    assert_eq!(provider.refresh_count(), 2);
    assert_eq!(provider.fetch_count(), 3);
}

#[tokio::test]
async fn test_multiple_entries_in_any_order() {
    let provider = Arc::new(FakeProvider::new(vec![
        entry("2024-01-02T03:00:00.000", "2024-01-02T07:30:00.000", 4 * 3_600_000),
        entry("2024-01-01T22:30:00.000", "2024-01-02T02:00:00.000", 3 * 3_600_000),
    ]));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 8, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    scheduler.run_window().await;

    assert_eq!(
        notifier.sent(),
        vec![
            "I slept from 10:30 PM -> 7:30 AM for a total of 7.0 hours!".to_string(),
            "`████████░░` (7.0h/8.0h)".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_waits_until_next_window() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 23, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    scheduler.wait_for_window().await;

    assert_eq!(clock.sleeps(), vec![Duration::from_secs(6 * 3600)]);
    assert_eq!(clock.now(), at(2024, 1, 3, 5, 0));
    assert_eq!(scheduler.state(), SchedulerState::WaitingForWindow);
}

#[tokio::test]
async fn test_test_mode_skips_only_the_first_wait() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 14, 0)));
    let mut scheduler = DailyScheduler::new(
        provider.clone(),
        notifier.clone(),
        clock.clone(),
        settings(true),
    );

    scheduler.wait_for_window().await;
    assert!(clock.sleeps().is_empty());
    assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(2)));

    scheduler.wait_for_window().await;
    assert_eq!(clock.now(), at(2024, 1, 3, 5, 0));
}

#[tokio::test]
async fn test_consecutive_days_each_dispatch_once() {
    let provider = Arc::new(FakeProvider::new(full_night()));
    let notifier = Arc::new(RecordingNotifier::default());
    let clock = Arc::new(ManualClock::new(at(2024, 1, 2, 1, 0)));
    let mut scheduler = scheduler(&provider, &notifier, &clock);

    for day in [2, 3, 4] {
        scheduler.wait_for_window().await;
        assert_eq!(clock.now(), at(2024, 1, day, 5, 0));
        assert_eq!(scheduler.run_window().await, WindowOutcome::Dispatched(jan(day)));
    }

    assert_eq!(notifier.sent().len(), 6);
    assert_eq!(scheduler.last_dispatched(), Some(jan(4)));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_timer_fires_every_interval() {
    let provider = Arc::new(FakeProvider::new(vec![]));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let interval = Duration::from_secs(6 * 3600);

    let handle = spawn_refresh_timer(provider.clone(), clock, interval);

    tokio::time::sleep(interval - Duration::from_secs(1)).await;
    assert_eq!(provider.refresh_count(), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(provider.refresh_count(), 1);

    tokio::time::sleep(interval).await;
    assert_eq!(provider.refresh_count(), 2);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_timer_survives_failures() {
    let provider = Arc::new(FakeProvider::new(vec![]).with_failing_refresh());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let interval = Duration::from_secs(6 * 3600);

    let handle = spawn_refresh_timer(provider.clone(), clock, interval);

    tokio::time::sleep(interval * 3 + Duration::from_secs(1)).await;
    assert_eq!(provider.refresh_count(), 3);
    assert!(!handle.is_finished());

    handle.abort();
}
