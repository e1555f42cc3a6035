// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod clock;
pub mod fitbit;
pub mod pkce;
pub mod scheduler;
pub mod slack;
pub mod summary;
pub mod token_store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use fitbit::{FitbitClient, FitbitService};
pub use pkce::PkcePair;
pub use scheduler::{DailyScheduler, SchedulerSettings, SleepProvider};
pub use slack::{Notifier, SlackNotifier};
pub use token_store::TokenStore;
