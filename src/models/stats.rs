//! Dashboard aggregate figures over the loaded activity list.

use serde::Serialize;
use std::collections::HashSet;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::format_utils::to_fixed;
use crate::models::Activity;

const METERS_PER_MILE: f64 = 1609.34;

/// Totals shown at the top of the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ActivityStats {
    pub activity_count: usize,
    pub total_distance_meters: f64,
    pub total_moving_seconds: f64,
    pub total_elevation_meters: f64,
    /// Distinct activity types, compared case-insensitively
    pub distinct_types: usize,
    pub average_moving_seconds: f64,
}

impl ActivityStats {
    pub fn from_activities(activities: &[Activity]) -> Self {
        let total_distance_meters = activities.iter().map(|a| a.distance).sum();
        let total_moving_seconds: f64 = activities.iter().map(|a| a.moving_time).sum();
        let total_elevation_meters = activities.iter().map(|a| a.total_elevation_gain).sum();

        let distinct_types = activities
            .iter()
            .map(|a| a.activity_type.to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        let average_moving_seconds = if activities.is_empty() {
            0.0
        } else {
            total_moving_seconds / activities.len() as f64
        };

        Self {
            activity_count: activities.len(),
            total_distance_meters,
            total_moving_seconds,
            total_elevation_meters,
            distinct_types,
            average_moving_seconds,
        }
    }

    /// Total distance in miles: `1.2k mi`, `250 mi` or `12.5 mi`.
    pub fn display_distance(&self) -> String {
        let miles = self.total_distance_meters / METERS_PER_MILE;
        if miles > 1000.0 {
            format!("{}k mi", to_fixed(miles / 1000.0, 1))
        } else if miles > 100.0 {
            format!("{} mi", to_fixed(miles, 0))
        } else {
            format!("{} mi", to_fixed(miles, 1))
        }
    }

    /// Whole hours, or whole minutes when under an hour.
    pub fn display_total_time(&self) -> String {
        let seconds = self.total_moving_seconds.max(0.0) as u64;
        let hours = seconds / 3600;
        if hours > 0 {
            format!("{}h", hours)
        } else {
            format!("{}m", seconds / 60)
        }
    }

    pub fn display_elevation(&self) -> String {
        if self.total_elevation_meters > 1000.0 {
            format!("{}k m", to_fixed(self.total_elevation_meters / 1000.0, 1))
        } else {
            format!("{} m", self.total_elevation_meters.round())
        }
    }

    pub fn display_average_duration(&self) -> String {
        format!("{}m", (self.average_moving_seconds.max(0.0) / 60.0).floor())
    }

    /// All display strings together, as sent to the dashboard.
    pub fn display(&self) -> StatsDisplay {
        StatsDisplay {
            distance: self.display_distance(),
            total_time: self.display_total_time(),
            elevation: self.display_elevation(),
            average_duration: self.display_average_duration(),
        }
    }
}

/// Formatted dashboard figures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct StatsDisplay {
    pub distance: String,
    pub total_time: String,
    pub elevation: String,
    pub average_duration: String,
}
