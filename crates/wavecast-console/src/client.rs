//! HTTP transport for the lock operations.
//!
//! Used by agents running outside the server process (operator tooling,
//! kiosk displays). Identity travels as a bearer token; the server derives
//! the caller from it, so the client never sends a user ID.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use wavecast_core::error::AppError;
use wavecast_core::result::AppResult;

use crate::api::ConsoleApi;
use crate::dto::{HeartbeatStatus, KickNotice, LockStatus};

/// [`ConsoleApi`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpConsoleClient {
    http: reqwest::Client,
    base_url: String,
    bearer_token: String,
}

impl HttpConsoleClient {
    /// Create a client for the given server and bearer token.
    pub fn new(base_url: impl Into<String>, bearer_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            bearer_token: bearer_token.into(),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("Request failed: {e}")))?;

        Self::check_status(response.status())?;

        response
            .json()
            .await
            .map_err(|e| AppError::external_service(format!("Invalid response body: {e}")))
    }

    async fn post_json<T: DeserializeOwned>(&self, path: &str) -> AppResult<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("Request failed: {e}")))?;

        Self::check_status(response.status())?;

        response
            .json()
            .await
            .map_err(|e| AppError::external_service(format!("Invalid response body: {e}")))
    }

    async fn post_empty(&self, path: &str) -> AppResult<()> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .map_err(|e| AppError::external_service(format!("Request failed: {e}")))?;

        Self::check_status(response.status())
    }

    /// Map HTTP status codes back onto the error taxonomy.
    fn check_status(status: StatusCode) -> AppResult<()> {
        if status.is_success() {
            return Ok(());
        }
        Err(match status {
            StatusCode::UNAUTHORIZED => AppError::unauthorized("Server rejected the token"),
            StatusCode::FORBIDDEN => AppError::forbidden("Console access required"),
            StatusCode::CONFLICT => AppError::conflict("Lock claim lost a race"),
            StatusCode::SERVICE_UNAVAILABLE => {
                AppError::service_unavailable("Server temporarily unavailable")
            }
            other => AppError::external_service(format!("Unexpected response status: {other}")),
        })
    }
}

#[async_trait]
impl ConsoleApi for HttpConsoleClient {
    async fn status(&self) -> AppResult<LockStatus> {
        self.get_json("/api/console/lock").await
    }

    async fn claim(&self) -> AppResult<()> {
        self.post_empty("/api/console/lock/claim").await
    }

    async fn release(&self) -> AppResult<()> {
        self.post_empty("/api/console/lock/release").await
    }

    async fn heartbeat(&self) -> AppResult<HeartbeatStatus> {
        self.post_json("/api/console/lock/heartbeat").await
    }

    async fn check_kicked(&self) -> AppResult<KickNotice> {
        self.post_json("/api/console/lock/kick-notice").await
    }
}
