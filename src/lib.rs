// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava Namer: give your Strava activities better names
//!
//! This crate connects one Strava account over OAuth2, keeps its tokens in
//! a local key-value file, lists recent activities, and renames them with
//! names generated from a handful of style templates.

pub mod config;
pub mod db;
pub mod error;
pub mod format_utils;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::{DashboardService, Session};
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub session: Session,
    pub dashboard: Arc<DashboardService>,
}

impl AppState {
    /// Wire the dashboard to `session` using the flags in `config`.
    pub fn new(config: Config, session: Session) -> Self {
        let dashboard = Arc::new(DashboardService::new(
            session.clone(),
            config.import_enabled,
        ));
        Self {
            config,
            session,
            dashboard,
        }
    }
}
