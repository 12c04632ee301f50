// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and OAuth token lifecycle.
//!
//! A [`Session`] owns the single Strava credential for this profile:
//! - Authorization-code exchange (de-duplicated while one is in flight)
//! - Persistence of the credential record in the key-value store
//! - Expiry checks and a background refresh when expiry is near
//! - Logout, which clears everything under the `strava_` namespace
//!
//! Every mutation of the credential is announced on a broadcast channel
//! (see [`Session::subscribe`]).

use crate::db::{keys, KeyValueStore};
use crate::error::{AppError, Result};
use crate::models::credentials::redact;
use crate::models::{Activity, Athlete, Credentials, TokenResponse};
use crate::services::strava::{AuthenticatedClient, StravaClient};
use crate::time_utils::format_epoch_millis;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

/// Window before expiry in which a background refresh is started (5 minutes).
pub const REFRESH_HORIZON_MILLIS: i64 = 5 * 60 * 1000;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Source of the current time; replaceable in tests.
pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Zero-payload notification sent after every credential mutation
/// (exchange, refresh, logout). Listeners re-derive their own state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthChanged;

/// Result of [`Session::exchange_code_for_tokens`].
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    /// The code was exchanged and the new credential stored.
    Exchanged(TokenResponse),
    /// A credential already existed; no request was made.
    AlreadyAuthenticated(TokenResponse),
    /// Another exchange is in flight and is authoritative.
    Skipped,
}

/// Query parameters Strava appends to the redirect URI.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Connection status snapshot. Contains no secrets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    pub has_access_token: bool,
    pub token_expired: bool,
    pub authenticated: bool,
    /// Access token expiry (RFC3339)
    pub expires_at: Option<String>,
    pub seconds_until_expiry: Option<i64>,
    /// Last activity import (RFC3339)
    pub last_import: Option<String>,
}

/// Claims an atomic flag for the lifetime of the guard.
struct InFlight<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlight<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// The Strava session for this profile. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    client: StravaClient,
    store: Arc<dyn KeyValueStore>,
    /// In-memory copy of the persisted credential record.
    credentials: Mutex<Option<Credentials>>,
    exchanging: AtomicBool,
    refreshing: AtomicBool,
    events: broadcast::Sender<AuthChanged>,
    now: NowProvider,
}

impl Session {
    /// Create a session, loading any credential already in `store`.
    pub fn new(client: StravaClient, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        Self::with_clock(client, store, Arc::new(Utc::now))
    }

    /// Create a session with a custom clock.
    pub fn with_clock(
        client: StravaClient,
        store: Arc<dyn KeyValueStore>,
        now: NowProvider,
    ) -> Result<Self> {
        let credentials = load_credentials(store.as_ref())?;
        if let Some(creds) = &credentials {
            tracing::info!(
                expires_at = %format_epoch_millis(creds.expires_at_millis),
                "Loaded stored Strava credentials"
            );
        }

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            inner: Arc::new(SessionInner {
                client,
                store,
                credentials: Mutex::new(credentials),
                exchanging: AtomicBool::new(false),
                refreshing: AtomicBool::new(false),
                events,
                now,
            }),
        })
    }

    /// Receive an [`AuthChanged`] after every credential mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<AuthChanged> {
        self.inner.events.subscribe()
    }

    /// URL the user is sent to for consent.
    pub fn authorization_url(&self) -> String {
        self.inner.client.authorization_url()
    }

    // ─── Credential State ────────────────────────────────────────────────────

    /// Copy of the current credential record.
    pub fn credentials(&self) -> Option<Credentials> {
        self.lock_credentials().clone()
    }

    /// No stored expiry counts as expired.
    pub fn is_token_expired(&self) -> bool {
        let now = self.now_millis();
        self.lock_credentials()
            .as_ref()
            .map_or(true, |creds| now >= creds.expires_at_millis)
    }

    pub fn is_authenticated(&self) -> bool {
        let has_token = self
            .lock_credentials()
            .as_ref()
            .is_some_and(|creds| !creds.access_token.is_empty());
        has_token && !self.is_token_expired()
    }

    pub fn status(&self) -> SessionStatus {
        let now = self.now_millis();
        let creds = self.credentials();
        let token_expired = self.is_token_expired();

        SessionStatus {
            has_access_token: creds.is_some(),
            token_expired,
            authenticated: self.is_authenticated(),
            expires_at: creds
                .as_ref()
                .map(|c| format_epoch_millis(c.expires_at_millis)),
            seconds_until_expiry: creds
                .as_ref()
                .map(|c| (c.expires_at_millis - now) / 1000),
            last_import: self.last_import().map(format_epoch_millis),
        }
    }

    // ─── OAuth ───────────────────────────────────────────────────────────────

    /// Handle the redirect back from Strava's consent page.
    pub async fn handle_callback(&self, params: &CallbackParams) -> Result<ExchangeOutcome> {
        if let Some(error) = &params.error {
            tracing::warn!(error = %error, "OAuth error from Strava");
            return Err(AppError::AuthorizationDenied(error.clone()));
        }

        let code = params.code.as_deref().ok_or(AppError::MissingCode)?;
        self.exchange_code_for_tokens(code).await
    }

    /// Exchange an authorization code for tokens and store them.
    ///
    /// Returns [`ExchangeOutcome::Skipped`] without a request when another
    /// exchange is in flight, and the existing record when already
    /// authenticated.
    pub async fn exchange_code_for_tokens(&self, code: &str) -> Result<ExchangeOutcome> {
        if code.trim().is_empty() {
            return Err(AppError::MissingCode);
        }

        let Some(_in_flight) = InFlight::claim(&self.inner.exchanging) else {
            tracing::info!("Token exchange already in progress, skipping");
            return Ok(ExchangeOutcome::Skipped);
        };

        if let Some(existing) = self.credentials() {
            tracing::info!("Tokens already exist, skipping exchange");
            return Ok(ExchangeOutcome::AlreadyAuthenticated(
                existing.to_token_response(),
            ));
        }

        tracing::info!("Exchanging authorization code for tokens");

        let response = self.inner.client.exchange_code(code).await.map_err(|e| {
            tracing::error!(error = %e, "Token exchange failed");
            e
        })?;

        let creds = Credentials::from_token_response(&response);
        {
            let mut current = self.lock_credentials();
            self.persist_credentials(&creds)?;
            *current = Some(creds);
        }

        tracing::info!(
            access_token = %redact(&response.access_token),
            expires_at = %format_epoch_millis(response.expires_at.saturating_mul(1000)),
            athlete_id = response.athlete.as_ref().map(|a| a.id),
            "Token exchange successful, credentials stored"
        );

        self.notify();
        Ok(ExchangeOutcome::Exchanged(response))
    }

    /// Refresh the access token with the stored refresh token.
    pub async fn refresh_access_token(&self) -> Result<TokenResponse> {
        let refresh_token = self
            .credentials()
            .map(|c| c.refresh_token)
            .ok_or(AppError::Unauthorized)?;

        let response = self
            .inner
            .client
            .refresh_token(&refresh_token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Error refreshing token");
                e
            })?;

        let creds = Credentials::from_token_response(&response);
        {
            let mut current = self.lock_credentials();
            // A logout while the request was in flight wins
            if current.is_none() {
                tracing::warn!("Session logged out during refresh, discarding new tokens");
                return Err(AppError::Unauthorized);
            }
            self.persist_credentials(&creds)?;
            *current = Some(creds);
        }

        tracing::info!(
            expires_at = %format_epoch_millis(response.expires_at.saturating_mul(1000)),
            "Access token refreshed"
        );

        self.notify();
        Ok(response)
    }

    /// Client for authenticated API calls.
    ///
    /// Fails with [`AppError::TokenExpired`] when the token has expired. When
    /// expiry is within [`REFRESH_HORIZON_MILLIS`], a refresh is started in a
    /// detached task; the returned client still carries the current token.
    pub fn get_authenticated_client(&self) -> Result<AuthenticatedClient> {
        let now = self.now_millis();
        let creds = self
            .credentials()
            .filter(|c| now < c.expires_at_millis)
            .ok_or(AppError::TokenExpired)?;

        if creds.expires_at_millis < now + REFRESH_HORIZON_MILLIS {
            self.spawn_background_refresh();
        }

        Ok(self.inner.client.authenticated(&creds.access_token))
    }

    fn spawn_background_refresh(&self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!("No async runtime, skipping background token refresh");
            return;
        };

        if self.inner.refreshing.load(Ordering::Acquire) {
            return;
        }

        let session = self.clone();
        runtime.spawn(async move {
            let Some(_in_flight) = InFlight::claim(&session.inner.refreshing) else {
                return;
            };

            tracing::info!("Token expires soon, refreshing in background");
            if let Err(e) = session.refresh_access_token().await {
                tracing::error!(error = %e, "Failed to refresh token");
            }
        });
    }

    /// Clear the credential, the last-import timestamp and every other
    /// `strava_` key, then notify listeners.
    pub fn logout(&self) {
        tracing::info!("Logging out, clearing all tokens");

        {
            let mut current = self.lock_credentials();
            *current = None;

            for key in [
                keys::ACCESS_TOKEN,
                keys::REFRESH_TOKEN,
                keys::TOKEN_EXPIRY,
                keys::LAST_IMPORT,
            ] {
                self.remove_key(key);
            }

            match self.inner.store.keys() {
                Ok(all) => {
                    for key in all.iter().filter(|k| k.starts_with(keys::NAMESPACE)) {
                        tracing::debug!(key = %key, "Removing stored item");
                        self.remove_key(key);
                    }
                }
                Err(e) => tracing::warn!(error = %e, "Failed to list stored keys during logout"),
            }
        }

        self.notify();
    }

    // ─── Last Import ─────────────────────────────────────────────────────────

    /// Last import time, epoch milliseconds.
    pub fn last_import(&self) -> Option<i64> {
        match self.inner.store.get(keys::LAST_IMPORT) {
            Ok(value) => value.and_then(|v| v.trim().parse().ok()),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read last import timestamp");
                None
            }
        }
    }

    pub fn set_last_import(&self, millis: i64) -> Result<()> {
        self.inner.store.set(keys::LAST_IMPORT, &millis.to_string())
    }

    // ─── API Wrappers ────────────────────────────────────────────────────────

    /// Get the authenticated athlete's profile.
    pub async fn get_athlete(&self) -> Result<Athlete> {
        let api = self.get_authenticated_client()?;
        let athlete = api.get_athlete().await.map_err(|e| {
            tracing::error!(error = %e, "Error getting athlete");
            e
        })?;

        tracing::info!(
            athlete_id = athlete.id,
            name = %athlete.display_name(),
            username = athlete.username.as_deref().unwrap_or("not set"),
            premium = athlete.premium,
            "Strava account connection verified"
        );
        Ok(athlete)
    }

    /// List activities (paginated, newest first).
    pub async fn get_activities(&self, page: u32, per_page: u32) -> Result<Vec<Activity>> {
        let api = self.get_authenticated_client()?;
        api.list_activities(page, per_page).await.map_err(|e| {
            tracing::error!(error = %e, page, per_page, "Error getting activities");
            e
        })
    }

    /// List activities started after `after` (Unix timestamp, seconds).
    pub async fn get_new_activities(&self, after: i64) -> Result<Vec<Activity>> {
        tracing::info!(after, "Getting new activities");
        let api = self.get_authenticated_client()?;
        api.list_activities_after(after).await.map_err(|e| {
            tracing::error!(error = %e, after, "Error getting new activities");
            e
        })
    }

    /// Rename an activity on Strava.
    pub async fn update_activity_name(&self, activity_id: u64, name: &str) -> Result<Activity> {
        let api = self.get_authenticated_client()?;
        api.update_activity_name(activity_id, name)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, activity_id, "Error updating activity name");
                e
            })
    }

    /// Whether a simple authenticated call succeeds.
    pub async fn test_api_connection(&self) -> bool {
        let api = match self.get_authenticated_client() {
            Ok(api) => api,
            Err(e) => {
                tracing::warn!(error = %e, "API connection test failed");
                return false;
            }
        };

        match api.get_athlete().await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "API connection test failed");
                false
            }
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────────

    fn now_millis(&self) -> i64 {
        (self.inner.now)().timestamp_millis()
    }

    fn lock_credentials(&self) -> MutexGuard<'_, Option<Credentials>> {
        self.inner
            .credentials
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Write the whole record or nothing.
    fn persist_credentials(&self, creds: &Credentials) -> Result<()> {
        let expiry = creds.expires_at_millis.to_string();
        self.inner
            .store
            .set_many(&[
                (keys::ACCESS_TOKEN, creds.access_token.as_str()),
                (keys::REFRESH_TOKEN, creds.refresh_token.as_str()),
                (keys::TOKEN_EXPIRY, expiry.as_str()),
            ])
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to store credentials");
                e
            })
    }

    fn remove_key(&self, key: &str) {
        if let Err(e) = self.inner.store.remove(key) {
            tracing::warn!(key = %key, error = %e, "Failed to remove stored item");
        }
    }

    fn notify(&self) {
        // No receivers is fine
        let _ = self.inner.events.send(AuthChanged);
    }
}

/// Read the credential record. All three keys must be present and the
/// expiry must parse; anything less is treated as no credential.
///
/// Two tokens without a usable expiry are not trusted: expiry gates every
/// API call, so such a record is dropped and the next callback exchanges
/// a fresh code.
fn load_credentials(store: &dyn KeyValueStore) -> Result<Option<Credentials>> {
    let access_token = store.get(keys::ACCESS_TOKEN)?;
    let refresh_token = store.get(keys::REFRESH_TOKEN)?;
    let expiry = store.get(keys::TOKEN_EXPIRY)?;

    match (access_token, refresh_token, expiry) {
        (Some(access_token), Some(refresh_token), Some(expiry)) => {
            match expiry.trim().parse::<i64>() {
                Ok(expires_at_millis) => Ok(Some(Credentials {
                    access_token,
                    refresh_token,
                    expires_at_millis,
                })),
                Err(_) => {
                    tracing::warn!(expiry = %expiry, "Stored token expiry is not a number, ignoring credentials");
                    Ok(None)
                }
            }
        }
        (None, None, None) => Ok(None),
        _ => {
            tracing::warn!("Incomplete stored credentials, ignoring");
            Ok(None)
        }
    }
}
