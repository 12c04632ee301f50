// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava Namer local server
//!
//! Connects a Strava account over OAuth2 and renames activities with
//! generated names. Listens on the loopback interface only.

use std::sync::Arc;
use strava_namer::{
    config::Config,
    db::{JsonFileStore, KeyValueStore},
    services::{Session, StravaClient},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured JSON logging
    init_logging();

    // Load configuration from environment
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        port = config.port,
        import_enabled = config.import_enabled,
        "Starting Strava Namer"
    );

    // Open the local key-value store
    let store: Arc<dyn KeyValueStore> = Arc::new(
        JsonFileStore::open(&config.store_path).expect("Failed to open key-value store"),
    );
    tracing::info!(path = %config.store_path.display(), "Key-value store opened");

    let client = StravaClient::new(&config);
    let session = Session::new(client, store).expect("Failed to load session");

    // Build shared state
    let state = Arc::new(AppState::new(config.clone(), session));
    state.dashboard.spawn_auth_listener();

    if state.session.is_authenticated() {
        tracing::info!("Stored credentials are valid");
    } else {
        tracing::info!(url = %state.session.authorization_url(), "Not connected to Strava, open the login URL");
    }

    // Build router
    let app = strava_namer::routes::create_router(state);

    // Start server
    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("strava_namer=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
