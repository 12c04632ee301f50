// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time formatting.

use chrono::{DateTime, SecondsFormat, Utc};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Convert epoch milliseconds to a UTC timestamp.
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_epoch_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or_default()
}

/// Format epoch milliseconds as RFC3339, for logs and status output.
pub fn format_epoch_millis(millis: i64) -> String {
    format_utc_rfc3339(from_epoch_millis(millis))
}

/// Short calendar date as `M/D/YYYY`.
pub fn format_short_date(date: DateTime<Utc>) -> String {
    date.format("%-m/%-d/%Y").to_string()
}
