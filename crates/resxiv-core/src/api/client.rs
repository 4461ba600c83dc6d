//! HTTP client for the ResXiv auth API.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{ApiError, ApiResult};
use super::types::{
    Ack, ForgotPasswordRequest, LoginRequest, LoginResponse, RefreshRequest, RegisterRequest,
    ResetPasswordRequest, TokenPair,
};
use crate::config::Config;

/// Auth API client configuration.
#[derive(Debug, Clone)]
pub struct ApiSettings {
    /// Base URL including any path prefix, e.g. `https://host/api/v1/auth`.
    pub base_url: String,
    pub timeout: Duration,
}

impl ApiSettings {
    /// Resolves settings from config plus environment.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            base_url: config.api_base_url()?,
            timeout: config.api_timeout(),
        })
    }
}

/// Auth API client.
#[derive(Debug, Clone)]
pub struct AuthClient {
    base_url: String,
    http: reqwest::Client,
}

impl AuthClient {
    /// Creates a client for `settings`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(settings: &ApiSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("resxiv/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// `POST /login`
    ///
    /// # Errors
    /// `Rejected` for bad credentials, `Network`/`Unexpected` otherwise.
    pub async fn login(&self, request: &LoginRequest) -> ApiResult<LoginResponse> {
        let builder = self.http.post(self.url("login")).json(request);
        self.send_json(builder, "login").await
    }

    /// `POST /register`
    ///
    /// # Errors
    /// `Rejected` with field errors (notably a duplicate email).
    pub async fn register(&self, request: &RegisterRequest) -> ApiResult<Ack> {
        let builder = self.http.post(self.url("register")).json(request);
        self.send_json(builder, "register").await
    }

    /// `POST /forgot-password`
    ///
    /// # Errors
    /// Only transport or server failures; unknown emails still succeed.
    pub async fn forgot_password(&self, request: &ForgotPasswordRequest) -> ApiResult<Ack> {
        let builder = self.http.post(self.url("forgot-password")).json(request);
        self.send_json(builder, "forgot-password").await
    }

    /// `GET /validate-reset-token?token=..`
    ///
    /// # Errors
    /// `Rejected` when the token is invalid or expired.
    pub async fn validate_reset_token(&self, token: &str) -> ApiResult<()> {
        let builder = self
            .http
            .get(self.url("validate-reset-token"))
            .query(&[("token", token)]);
        self.send(builder, "validate-reset-token").await.map(drop)
    }

    /// `POST /reset-password`
    ///
    /// # Errors
    /// `Rejected` for a bad token or a refused password.
    pub async fn reset_password(&self, request: &ResetPasswordRequest) -> ApiResult<Ack> {
        let builder = self.http.post(self.url("reset-password")).json(request);
        self.send_json(builder, "reset-password").await
    }

    /// `POST /refresh`
    ///
    /// # Errors
    /// `Rejected` when the refresh token is no longer accepted.
    pub async fn refresh(&self, refresh_token: &str) -> ApiResult<TokenPair> {
        let builder = self
            .http
            .post(self.url("refresh"))
            .json(&RefreshRequest { refresh_token });
        self.send_json(builder, "refresh").await
    }

    /// `POST /logout` with the caller's auth headers.
    ///
    /// # Errors
    /// Any failure; callers treat logout as best-effort.
    pub async fn logout(&self, auth_headers: HeaderMap) -> ApiResult<()> {
        if !auth_headers.contains_key(AUTHORIZATION) {
            tracing::debug!("logout without an access token");
        }
        let builder = self.http.post(self.url("logout")).headers(auth_headers);
        self.send(builder, "logout").await.map(drop)
    }

    async fn send(&self, builder: RequestBuilder, operation: &str) -> ApiResult<Response> {
        tracing::debug!(operation, "sending auth request");
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &body);
        tracing::info!(operation, status = status.as_u16(), error = %err, "auth request rejected");
        Err(err)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        operation: &str,
    ) -> ApiResult<T> {
        let response = self.send(builder, operation).await?;
        let body = response.text().await?;
        decode_body(&body)
            .map_err(|e| ApiError::Unexpected(format!("{operation} response: {e}")))
    }
}

/// Decodes a success body, unwrapping a `{"data": {..}}` envelope.
///
/// An empty body decodes as `{}`, which `Ack`-style types accept.
fn decode_body<T: DeserializeOwned>(body: &str) -> serde_json::Result<T> {
    let value: Value = if body.trim().is_empty() {
        Value::Object(serde_json::Map::new())
    } else {
        serde_json::from_str(body)?
    };
    serde_json::from_value(unwrap_envelope(value))
}

fn unwrap_envelope(value: Value) -> Value {
    let Value::Object(mut outer) = value else {
        return value;
    };
    match outer.remove("data") {
        Some(Value::Object(mut inner)) => {
            if let Some(message) = outer.remove("message") {
                inner.entry("message").or_insert(message);
            }
            Value::Object(inner)
        }
        Some(other) => {
            outer.insert("data".to_string(), other);
            Value::Object(outer)
        }
        None => Value::Object(outer),
    }
}
