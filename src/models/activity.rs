// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava activity model as returned by the list and update endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Summary activity. Only `name` is ever written back to Strava.
///
/// Numeric fields that are missing or `null` deserialize as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Activity {
    /// Strava activity ID
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub id: u64,
    /// Activity type (Ride, Run, Hike, etc.)
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub activity_type: String,
    /// Finer-grained sport type, when Strava sends one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sport_type: Option<String>,
    /// Activity name/title
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Distance in meters
    #[serde(default, deserialize_with = "null_as_default")]
    pub distance: f64,
    /// Moving time in seconds
    #[serde(default, deserialize_with = "null_as_default")]
    pub moving_time: f64,
    /// Elevation gain in meters
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_elevation_gain: f64,
    /// Start date/time (ISO 8601)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
}

impl Activity {
    /// Parsed start date, or `None` when absent or malformed.
    pub fn start_date_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.start_date.as_deref()?;
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
