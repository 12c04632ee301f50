// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod athlete;
pub mod credentials;
pub mod stats;

pub use activity::Activity;
pub use athlete::Athlete;
pub use credentials::{Credentials, TokenResponse};
pub use stats::{ActivityStats, StatsDisplay};
