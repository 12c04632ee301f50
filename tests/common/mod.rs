// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared test helpers: a fake Strava server on an ephemeral port and
//! constructors for sessions and app state pointed at it.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Form, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use strava_namer::config::Config;
use strava_namer::db::{keys, KeyValueStore, MemoryStore};
use strava_namer::error::AppError;
use strava_namer::routes::create_router;
use strava_namer::services::{Session, StravaClient};
use strava_namer::AppState;

pub const ATHLETE_ID: u64 = 12345;

/// Recorded traffic and knobs for the fake Strava server.
#[derive(Default)]
pub struct FakeState {
    token_calls: AtomicUsize,
    token_delay_ms: AtomicU64,
    fail_token: AtomicBool,
    /// Epoch seconds returned as `expires_at`; 0 means six hours from now
    expires_at: AtomicI64,
    pub grant_types: Mutex<Vec<String>>,
    pub activity_queries: Mutex<Vec<HashMap<String, String>>>,
    pub renames: Mutex<Vec<(u64, String)>>,
}

/// Stand-in for the Strava OAuth and REST endpoints.
pub struct FakeStrava {
    pub base_url: String,
    pub state: Arc<FakeState>,
}

#[allow(dead_code)]
impl FakeStrava {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());

        let app = Router::new()
            .route("/oauth/token", post(token))
            .route("/api/v3/athlete", get(athlete))
            .route("/api/v3/athlete/activities", get(activities))
            .route("/api/v3/activities/{id}", put(update_activity))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake Strava server");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
        }
    }

    /// Config whose token and API URLs point at this server.
    pub fn config(&self) -> Config {
        Config {
            token_url: format!("{}/oauth/token", self.base_url),
            api_base_url: format!("{}/api/v3", self.base_url),
            ..Config::test_default()
        }
    }

    pub fn token_calls(&self) -> usize {
        self.state.token_calls.load(Ordering::SeqCst)
    }

    pub fn set_token_delay(&self, delay: Duration) {
        self.state
            .token_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_token_failure(&self, fail: bool) {
        self.state.fail_token.store(fail, Ordering::SeqCst);
    }

    pub fn set_expires_at(&self, epoch_secs: i64) {
        self.state.expires_at.store(epoch_secs, Ordering::SeqCst);
    }

    pub fn renames(&self) -> Vec<(u64, String)> {
        self.state.renames.lock().unwrap().clone()
    }

    pub fn activity_queries(&self) -> Vec<HashMap<String, String>> {
        self.state.activity_queries.lock().unwrap().clone()
    }
}

async fn token(
    State(state): State<Arc<FakeState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    let n = state.token_calls.fetch_add(1, Ordering::SeqCst) + 1;

    let delay = state.token_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    if state.fail_token.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Bad Request", "errors": [{ "field": "code", "code": "invalid" }] })),
        )
            .into_response();
    }

    let grant_type = form.get("grant_type").cloned().unwrap_or_default();
    state.grant_types.lock().unwrap().push(grant_type.clone());

    let expires_at = match state.expires_at.load(Ordering::SeqCst) {
        0 => Utc::now().timestamp() + 6 * 60 * 60,
        secs => secs,
    };

    let mut body = json!({
        "token_type": "Bearer",
        "access_token": format!("access-{}", n),
        "refresh_token": format!("refresh-{}", n),
        "expires_at": expires_at,
        "expires_in": 21600,
    });
    if grant_type == "authorization_code" {
        body["athlete"] = athlete_json();
    }

    Json(body).into_response()
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("Bearer access-") || v == "Bearer stored-access")
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "Authorization Error" })),
    )
        .into_response()
}

fn athlete_json() -> Value {
    json!({
        "id": ATHLETE_ID,
        "firstname": "Test",
        "lastname": "Athlete",
        "username": "tester",
        "city": "Palo Alto",
        "premium": true,
    })
}

fn activity_json(id: u64, kind: &str, name: &str, distance: f64, moving: u64, elev: f64) -> Value {
    json!({
        "id": id,
        "type": kind,
        "sport_type": kind,
        "name": name,
        "distance": distance,
        "moving_time": moving,
        "total_elevation_gain": elev,
        "start_date": "2024-01-15T08:00:00Z",
    })
}

async fn athlete(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(athlete_json()).into_response()
}

async fn activities(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let is_import = query.contains_key("after");
    state.activity_queries.lock().unwrap().push(query);

    let list = if is_import {
        // One new activity and one already on the dashboard
        vec![
            activity_json(3, "Hike", "Afternoon Hike", 8000.0, 7200, 400.0),
            activity_json(1, "Run", "Morning Run", 5000.0, 1800, 50.0),
        ]
    } else {
        vec![
            activity_json(1, "Run", "Morning Run", 5000.0, 1800, 50.0),
            activity_json(2, "Ride", "Lunch Ride", 20000.0, 3600, 200.0),
        ]
    };

    Json(Value::Array(list)).into_response()
}

async fn update_activity(
    State(state): State<Arc<FakeState>>,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }

    let name = body["name"].as_str().unwrap_or_default().to_string();
    state.renames.lock().unwrap().push((id, name.clone()));

    Json(activity_json(id, "Run", &name, 5000.0, 1800, 50.0)).into_response()
}

/// Store a full credential record that the fake server accepts.
#[allow(dead_code)]
pub fn seed_credentials(store: &dyn KeyValueStore, expires_at_millis: i64) {
    store.set(keys::ACCESS_TOKEN, "stored-access").unwrap();
    store.set(keys::REFRESH_TOKEN, "stored-refresh").unwrap();
    store
        .set(keys::TOKEN_EXPIRY, &expires_at_millis.to_string())
        .unwrap();
}

/// Memory store whose `set` fails for one key, like a disk filling up
/// halfway through a write.
#[allow(dead_code)]
#[derive(Default)]
pub struct FailingStore {
    pub inner: MemoryStore,
    fail_key: Mutex<Option<String>>,
}

#[allow(dead_code)]
impl FailingStore {
    pub fn fail_on(&self, key: &str) {
        *self.fail_key.lock().unwrap() = Some(key.to_string());
    }
}

impl KeyValueStore for FailingStore {
    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), AppError> {
        if self.fail_key.lock().unwrap().as_deref() == Some(key) {
            return Err(AppError::Storage("disk full".to_string()));
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), AppError> {
        self.inner.remove(key)
    }

    fn keys(&self) -> Result<Vec<String>, AppError> {
        self.inner.keys()
    }
}

/// Epoch milliseconds `offset` from now.
#[allow(dead_code)]
pub fn millis_from_now(offset: Duration) -> i64 {
    Utc::now().timestamp_millis() + offset.as_millis() as i64
}

#[allow(dead_code)]
pub fn session_for(config: &Config, store: Arc<dyn KeyValueStore>) -> Session {
    Session::new(StravaClient::new(config), store).expect("Failed to create session")
}

/// Create a test app against `config`.
/// Returns the router and the shared state.
#[allow(dead_code)]
pub fn create_test_app(config: Config, store: Arc<dyn KeyValueStore>) -> (Router, Arc<AppState>) {
    let session = session_for(&config, store);
    let state = Arc::new(AppState::new(config, session));
    (create_router(state.clone()), state)
}
