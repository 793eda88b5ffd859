//! Client for the city analysis backend.
//!
//! The backend owns data aggregation, sensor integration and AI inference.
//! This module only speaks its two endpoints:
//!
//! - `POST /analyze-city` with `{ "city": .. }`, returning a [`CityPayload`]
//! - `POST /chat` with a [`ChatRequest`], returning `{ "reply": .. }`
//!
//! One attempt per call. No retry, backoff or client-side timeout.

use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::model::{AnalyzeRequest, ChatReply, ChatRequest, CityPayload};

/// Default backend location.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8000";

/// Errors from a backend call.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("backend returned {0}")]
    Status(StatusCode),

    #[error("malformed backend response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            BackendError::Status(status)
        } else if err.is_decode() {
            BackendError::Decode(err.to_string())
        } else {
            BackendError::Transport(err)
        }
    }
}

/// The backend seam used by sessions.
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Fetch the analysis payload for a city.
    async fn analyze_city(&self, city: &str) -> Result<CityPayload, BackendError>;

    /// Ask the assistant a question about a city.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError>;
}

/// [`BackendClient`] over HTTP.
#[derive(Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpBackend {
    /// Create a client pointed at [`DEFAULT_BACKEND_URL`].
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BACKEND_URL)
    }

    /// Create a client with a custom base URL.
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl BackendClient for HttpBackend {
    #[instrument(skip(self))]
    async fn analyze_city(&self, city: &str) -> Result<CityPayload, BackendError> {
        let url = format!("{}/analyze-city", self.base_url);
        let body = AnalyzeRequest {
            city: city.to_string(),
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload = response.json::<CityPayload>().await?;

        debug!(
            markers = payload.map_markers.len(),
            recent = payload.recent_issues.len(),
            "City payload received"
        );
        Ok(payload)
    }

    #[instrument(skip(self, request), fields(city = %request.city, message_len = request.message.len()))]
    async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, BackendError> {
        let url = format!("{}/chat", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await?
            .error_for_status()?;
        let reply = response.json::<ChatReply>().await?;
        Ok(reply)
    }
}
