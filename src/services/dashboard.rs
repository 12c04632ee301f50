// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard view state and the user actions on it.

use crate::error::{AppError, Result};
use crate::models::{Activity, ActivityStats, Athlete, StatsDisplay};
use crate::services::names;
use crate::services::session::{AuthChanged, Session};
use crate::time_utils::format_epoch_millis;
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Activities fetched on dashboard load.
pub const DASHBOARD_PAGE_SIZE: u32 = 20;

/// How far back the first import looks when nothing was imported before (7 days).
const DEFAULT_IMPORT_LOOKBACK_MILLIS: i64 = 7 * 24 * 60 * 60 * 1000;

/// Snapshot of the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub athlete: Option<Athlete>,
    pub activities: Vec<Activity>,
    /// Last import time (RFC3339)
    pub last_import: Option<String>,
    pub stats: ActivityStats,
    /// `stats` formatted for display
    pub stats_display: StatsDisplay,
    pub import_enabled: bool,
}

/// Result of renaming one activity.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenameResult {
    pub activity_id: u64,
    pub name: String,
    pub style: String,
}

/// Result of "import new activities".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImportOutcome {
    /// Import is switched off; nothing was fetched.
    Disabled,
    Imported { count: usize },
}

#[derive(Debug, Default)]
struct ViewState {
    athlete: Option<Athlete>,
    activities: Vec<Activity>,
}

/// Dashboard state backed by a [`Session`].
pub struct DashboardService {
    session: Session,
    import_enabled: bool,
    state: RwLock<ViewState>,
}

impl DashboardService {
    pub fn new(session: Session, import_enabled: bool) -> Self {
        Self {
            session,
            import_enabled,
            state: RwLock::new(ViewState::default()),
        }
    }

    /// Fetch the athlete and the latest activities together.
    ///
    /// [`AppError::TokenExpired`] means the user has to log in again.
    pub async fn load(&self) -> Result<DashboardView> {
        let result = tokio::try_join!(
            self.session.get_athlete(),
            self.session.get_activities(1, DASHBOARD_PAGE_SIZE),
        );

        let (athlete, activities) = match result {
            Ok(loaded) => loaded,
            Err(e) => {
                if e.requires_login() {
                    tracing::info!(error = %e, "Dashboard load needs re-authentication");
                } else {
                    tracing::error!(error = %e, "Error loading dashboard");
                }
                return Err(e);
            }
        };

        tracing::info!(
            athlete_id = athlete.id,
            count = activities.len(),
            "Dashboard loaded"
        );

        {
            let mut state = self.state.write().await;
            state.athlete = Some(athlete);
            state.activities = activities;
        }

        Ok(self.view().await)
    }

    /// Current view without fetching anything.
    pub async fn view(&self) -> DashboardView {
        let state = self.state.read().await;
        let stats = ActivityStats::from_activities(&state.activities);
        DashboardView {
            athlete: state.athlete.clone(),
            activities: state.activities.clone(),
            last_import: self.session.last_import().map(format_epoch_millis),
            stats_display: stats.display(),
            stats,
            import_enabled: self.import_enabled,
        }
    }

    /// Aggregate figures over the current activity list.
    pub async fn stats(&self) -> ActivityStats {
        ActivityStats::from_activities(&self.state.read().await.activities)
    }

    /// Generate a name in `style` and write it to Strava.
    pub async fn rename(&self, activity_id: u64, style: &str) -> Result<RenameResult> {
        let activity = self
            .state
            .read()
            .await
            .activities
            .iter()
            .find(|a| a.id == activity_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Activity {}", activity_id)))?;

        let name = names::generate_name(&activity, style);
        self.session.update_activity_name(activity_id, &name).await?;

        {
            let mut state = self.state.write().await;
            if let Some(a) = state.activities.iter_mut().find(|a| a.id == activity_id) {
                a.name = name.clone();
            }
        }

        tracing::info!(activity_id, style = %style, name = %name, "Activity renamed");

        Ok(RenameResult {
            activity_id,
            name,
            style: style.to_string(),
        })
    }

    /// Fetch activities since the last import and put them at the top.
    ///
    /// Does nothing unless import is enabled in configuration.
    pub async fn import_new_activities(&self) -> Result<ImportOutcome> {
        if !self.import_enabled {
            tracing::info!("Activity import is disabled");
            return Ok(ImportOutcome::Disabled);
        }

        let now = Utc::now().timestamp_millis();
        let since = self
            .session
            .last_import()
            .unwrap_or(now - DEFAULT_IMPORT_LOOKBACK_MILLIS);

        let fetched = self.session.get_new_activities(since / 1000).await?;

        let count = {
            let mut state = self.state.write().await;
            let known: HashSet<u64> = state.activities.iter().map(|a| a.id).collect();
            let mut fresh: Vec<Activity> = fetched
                .into_iter()
                .filter(|a| !known.contains(&a.id))
                .collect();
            let count = fresh.len();
            fresh.append(&mut state.activities);
            state.activities = fresh;
            count
        };

        if count > 0 {
            self.session.set_last_import(now)?;
        }

        tracing::info!(count, since = %format_epoch_millis(since), "Imported new activities");
        Ok(ImportOutcome::Imported { count })
    }

    /// Drop cached view state once the session is no longer authenticated.
    pub async fn on_auth_changed(&self) {
        if self.session.is_authenticated() {
            return;
        }

        let mut state = self.state.write().await;
        if state.athlete.is_some() || !state.activities.is_empty() {
            tracing::info!("Session ended, clearing dashboard");
            *state = ViewState::default();
        }
    }

    /// Follow the session's auth notifications for the life of the process.
    pub fn spawn_auth_listener(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let mut events = self.session.subscribe();
        let dashboard = Arc::clone(self);

        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(AuthChanged) | Err(broadcast::error::RecvError::Lagged(_)) => {
                        dashboard.on_auth_changed().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}
