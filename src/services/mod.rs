// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod dashboard;
pub mod names;
pub mod session;
pub mod strava;

pub use dashboard::{DashboardService, ImportOutcome};
pub use names::NamingStyle;
pub use session::{AuthChanged, ExchangeOutcome, Session};
pub use strava::{AuthenticatedClient, StravaClient};
