// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod sleep;
pub mod token;

pub use sleep::{SleepLogEntry, SleepResponse, SleepSession};
pub use token::{ClientCredentials, TokenRecord};
