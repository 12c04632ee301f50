// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Dashboard API routes.

use crate::error::{AppError, Result};
use crate::services::dashboard::{DashboardView, ImportOutcome, RenameResult};
use crate::services::names::{StyleOption, STYLE_OPTIONS};
use crate::services::session::SessionStatus;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/styles", get(get_styles))
        .route("/api/dashboard", get(get_dashboard))
        .route("/api/activities/{id}/name", post(rename_activity))
        .route("/api/import", post(import_activities))
}

/// Connection status (no secrets).
async fn get_status(State(state): State<Arc<AppState>>) -> Json<SessionStatus> {
    Json(state.session.status())
}

/// Naming styles offered to the user.
async fn get_styles() -> Json<Vec<StyleOption>> {
    Json(STYLE_OPTIONS.to_vec())
}

/// Load athlete and latest activities.
async fn get_dashboard(State(state): State<Arc<AppState>>) -> Result<Json<DashboardView>> {
    Ok(Json(state.dashboard.load().await?))
}

#[derive(Debug, Deserialize)]
struct RenameRequest {
    style: String,
}

/// Generate a new name and push it to Strava.
async fn rename_activity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(request): Json<RenameRequest>,
) -> Result<Json<RenameResult>> {
    if request.style.trim().is_empty() {
        return Err(AppError::BadRequest("style must not be empty".to_string()));
    }

    Ok(Json(state.dashboard.rename(id, &request.style).await?))
}

/// Import activities since the last import.
async fn import_activities(State(state): State<Arc<AppState>>) -> Result<Json<ImportOutcome>> {
    Ok(Json(state.dashboard.import_new_activities().await?))
}
