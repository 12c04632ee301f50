// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization URL construction
//! - Authorization-code exchange and token refresh (form-encoded)
//! - Bearer-authenticated activity and athlete calls

use crate::config::Config;
use crate::error::AppError;
use crate::models::credentials::redact;
use crate::models::{Activity, Athlete, TokenResponse};
use serde::Deserialize;

/// Strava OAuth client: knows the app credentials and the token endpoint.
#[derive(Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    auth_url: String,
    token_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    scope: String,
}

impl StravaClient {
    /// Create a new Strava client from configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth_url: config.auth_url.clone(),
            token_url: config.token_url.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            client_id: config.strava_client_id.clone(),
            client_secret: config.strava_client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
            scope: config.scope.clone(),
        }
    }

    /// URL the user is sent to for consent.
    pub fn authorization_url(&self) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&approval_prompt=force",
            self.auth_url,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(&self.scope),
        )
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(&self, code: &str) -> Result<TokenResponse, AppError> {
        tracing::info!(
            url = %self.token_url,
            client_id = %self.client_id,
            code = %redact(code),
            grant_type = "authorization_code",
            "Sending token exchange request"
        );

        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Token exchange request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// Refresh an access token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AppError> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Token refresh request failed: {}", e)))?;

        check_response_json(response).await
    }

    /// A client that sends `access_token` as a bearer token.
    pub fn authenticated(&self, access_token: &str) -> AuthenticatedClient {
        AuthenticatedClient {
            http: self.http.clone(),
            base_url: self.api_base_url.clone(),
            access_token: access_token.to_string(),
        }
    }
}

/// Request client pre-configured with a bearer token and the API base URL.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("base_url", &self.base_url)
            .field("access_token", &redact(&self.access_token))
            .finish()
    }
}

impl AuthenticatedClient {
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Get authenticated athlete profile.
    pub async fn get_athlete(&self) -> Result<Athlete, AppError> {
        self.get_json("/athlete", &[]).await
    }

    /// List activities, newest first (paginated).
    pub async fn list_activities(
        &self,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Activity>, AppError> {
        self.get_json(
            "/athlete/activities",
            &[("page", page.to_string()), ("per_page", per_page.to_string())],
        )
        .await
    }

    /// List activities that started after `after` (Unix timestamp, seconds).
    pub async fn list_activities_after(&self, after: i64) -> Result<Vec<Activity>, AppError> {
        self.get_json("/athlete/activities", &[("after", after.to_string())])
            .await
    }

    /// Update an activity's name.
    pub async fn update_activity_name(
        &self,
        activity_id: u64,
        name: &str,
    ) -> Result<Activity, AppError> {
        let url = format!("{}/activities/{}", self.base_url, activity_id);

        let body = serde_json::json!({
            "name": name
        });

        let response = self
            .http
            .put(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        check_response_json(response).await
    }

    /// Generic GET request with JSON response.
    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::Transport(e.to_string()))?;

        check_response_json(response).await
    }
}

/// Check response status and parse JSON body.
async fn check_response_json<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, AppError> {
    let status = response.status();
    if !status.is_success() {
        let url = response.url().path().to_string();
        let body = response.text().await.unwrap_or_default();

        if status.as_u16() == 429 {
            tracing::warn!(url = %url, "Strava rate limit hit (429)");
        } else {
            tracing::error!(status = %status, url = %url, body = %body, "Strava request failed");
        }

        return Err(AppError::StravaApi {
            status: status.as_u16(),
            body,
        });
    }

    response
        .json()
        .await
        .map_err(|e| AppError::Transport(format!("JSON parse error: {}", e)))
}
