// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! OAuth credential record and the token endpoint's response shape.

use crate::models::Athlete;
use serde::{Deserialize, Serialize};

/// Number of leading characters of a secret that may appear in logs.
const REDACT_PREFIX_LEN: usize = 10;

/// Shorten a secret for logging: first 10 characters then `...`.
pub fn redact(secret: &str) -> String {
    match secret.char_indices().nth(REDACT_PREFIX_LEN) {
        Some((idx, _)) => format!("{}...", &secret[..idx]),
        None => "***".to_string(),
    }
}

/// The single stored OAuth credential.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry, epoch milliseconds
    pub expires_at_millis: i64,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at_millis", &self.expires_at_millis)
            .finish()
    }
}

impl Credentials {
    /// Build from a token endpoint response (`expires_at` is epoch seconds).
    pub fn from_token_response(response: &TokenResponse) -> Self {
        Self {
            access_token: response.access_token.clone(),
            refresh_token: response.refresh_token.clone(),
            expires_at_millis: response.expires_at.saturating_mul(1000),
        }
    }

    /// Reshape into the token endpoint's response form.
    pub fn to_token_response(&self) -> TokenResponse {
        TokenResponse {
            access_token: self.access_token.clone(),
            refresh_token: self.refresh_token.clone(),
            expires_at: self.expires_at_millis / 1000,
            athlete: None,
        }
    }
}

/// Token exchange/refresh response from Strava OAuth.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Epoch seconds
    pub expires_at: i64,
    /// Present on the authorization-code grant only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub athlete: Option<Athlete>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &redact(&self.access_token))
            .field("refresh_token", &redact(&self.refresh_token))
            .field("expires_at", &self.expires_at)
            .field("athlete", &self.athlete.as_ref().map(|a| a.id))
            .finish()
    }
}
