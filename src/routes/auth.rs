// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava OAuth authentication routes.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::error::Result;
use crate::services::session::CallbackParams;
use crate::services::ExchangeOutcome;
use crate::AppState;

/// Where a logged-in user is sent.
pub const DASHBOARD_PATH: &str = "/api/dashboard";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(login))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", get(logout))
}

/// Login - redirect to Strava authorization, or to the dashboard when
/// already authenticated.
async fn login(State(state): State<Arc<AppState>>) -> Redirect {
    if state.session.is_authenticated() {
        return Redirect::temporary(DASHBOARD_PATH);
    }

    tracing::info!(
        client_id = %state.config.strava_client_id,
        redirect_uri = %state.config.redirect_uri,
        "Starting OAuth flow, redirecting to Strava"
    );

    Redirect::temporary(&state.session.authorization_url())
}

/// Callback outcome.
#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct CallbackResponse {
    pub status: String,
    /// `exchanged`, `already_authenticated` or `skipped`
    pub outcome: String,
    pub athlete_name: Option<String>,
    pub next: String,
}

/// OAuth callback - exchange the code for tokens.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Json<CallbackResponse>> {
    let outcome = state.session.handle_callback(&params).await?;

    let (outcome, athlete_name) = match outcome {
        ExchangeOutcome::Exchanged(response) => (
            "exchanged",
            response.athlete.as_ref().map(|a| a.display_name()),
        ),
        ExchangeOutcome::AlreadyAuthenticated(_) => ("already_authenticated", None),
        // The in-flight exchange is authoritative
        ExchangeOutcome::Skipped => ("skipped", None),
    };

    tracing::info!(outcome, "OAuth callback handled");

    Ok(Json(CallbackResponse {
        status: "success".to_string(),
        outcome: outcome.to_string(),
        athlete_name,
        next: DASHBOARD_PATH.to_string(),
    }))
}

#[derive(Debug, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LogoutResponse {
    pub success: bool,
}

/// Logout - forget tokens and local state.
async fn logout(State(state): State<Arc<AppState>>) -> Json<LogoutResponse> {
    state.session.logout();
    Json(LogoutResponse { success: true })
}
