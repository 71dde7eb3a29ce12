//! HTTP client for the remote progress service.
//!
//! Endpoints, relative to [`HttpConfig::base_url`]:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | start | `POST journeys/{journey}/users/{user}/start` |
//! | get_state | `GET journeys/{journey}/users/{user}/progress?totalDistanceM=..&nextLandmarkDistanceM=..` |
//! | progress | `POST journeys/{journey}/users/{user}/progress` with `{"totalDistanceM", "deltaM"}` |
//!
//! Responses carry `{"progressM", "percent", "message"}`. Status codes map onto
//! [`SyncError`]: 409 is a conflict, 404 not found, 400/422 a rejected request,
//! anything else a network error. There is no retry here; that policy belongs
//! to the caller.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};

use crate::error::{SyncError, ValidationError};
use crate::sync::{ProgressService, RemoteProgress};

/// Configuration for [`HttpProgressService`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Service root, e.g. `https://api.example.com/v1/`
    pub base_url: String,
    /// Sent as `Authorization: Bearer <token>` when present
    pub bearer_token: Option<String>,
    /// Whole-request timeout. Default: 30
    pub timeout_secs: u64,
    /// Idle pooled connections are closed after this. Default: 60
    pub pool_idle_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bearer_token: None,
            timeout_secs: 30,
            pool_idle_timeout_secs: 60,
        }
    }
}

/// Response body shared by all three endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProgressResponse {
    progress_m: f64,
    #[serde(default)]
    percent: f64,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRequest {
    total_distance_m: f64,
    delta_m: f64,
}

/// [`ProgressService`] over HTTP/JSON.
pub struct HttpProgressService {
    client: Client,
    base_url: String,
    auth_header: Option<String>,
}

impl HttpProgressService {
    pub fn new(config: HttpConfig) -> Result<Self, SyncError> {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .tcp_keepalive(Duration::from_secs(30))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SyncError::Network(format!("Failed to create HTTP client: {}", e)))?;

        let mut base_url = config.base_url;
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self {
            client,
            base_url,
            auth_header: config.bearer_token.map(|t| format!("Bearer {}", t)),
        })
    }

    fn url(&self, user_id: &str, journey_id: &str, action: &str) -> String {
        format!(
            "{}journeys/{}/users/{}/{}",
            self.base_url, journey_id, user_id, action
        )
    }

    async fn send(
        &self,
        request: RequestBuilder,
        user_id: &str,
        journey_id: &str,
    ) -> Result<RemoteProgress, SyncError> {
        let request = match self.auth_header {
            Some(ref auth) => request.header("Authorization", auth),
            None => request,
        };

        let req_start = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("Request error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                "[HttpProgressService] {} for {}/{} after {:?}",
                status,
                user_id,
                journey_id,
                req_start.elapsed()
            );
            return Err(classify_status(status, body, user_id, journey_id));
        }

        let data: ProgressResponse = response
            .json()
            .await
            .map_err(|e| SyncError::Network(format!("JSON parse error: {}", e)))?;

        debug!(
            "[HttpProgressService] {}/{} -> {:.0}m ({:.1}%) in {:?}",
            user_id,
            journey_id,
            data.progress_m,
            data.percent,
            req_start.elapsed()
        );

        Ok(RemoteProgress {
            progress_m: data.progress_m,
            percent: data.percent,
            message: data.message,
        })
    }
}

fn classify_status(status: StatusCode, body: String, user_id: &str, journey_id: &str) -> SyncError {
    match status {
        StatusCode::CONFLICT => SyncError::Conflict {
            user_id: user_id.to_string(),
            journey_id: journey_id.to_string(),
        },
        StatusCode::NOT_FOUND => SyncError::NotFound {
            user_id: user_id.to_string(),
            journey_id: journey_id.to_string(),
        },
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            let reason = if body.is_empty() {
                format!("HTTP {}", status)
            } else {
                body
            };
            SyncError::Validation(ValidationError::Rejected(reason))
        }
        _ => SyncError::Network(format!("HTTP {}", status)),
    }
}

#[async_trait]
impl ProgressService for HttpProgressService {
    async fn start(&self, user_id: &str, journey_id: &str) -> Result<RemoteProgress, SyncError> {
        let request = self.client.post(self.url(user_id, journey_id, "start"));
        self.send(request, user_id, journey_id).await
    }

    async fn get_state(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        next_landmark_distance_m: Option<f64>,
    ) -> Result<RemoteProgress, SyncError> {
        let mut query = vec![("totalDistanceM", total_distance_m.to_string())];
        if let Some(next) = next_landmark_distance_m {
            query.push(("nextLandmarkDistanceM", next.to_string()));
        }
        let request = self
            .client
            .get(self.url(user_id, journey_id, "progress"))
            .query(&query);
        self.send(request, user_id, journey_id).await
    }

    async fn progress(
        &self,
        user_id: &str,
        journey_id: &str,
        total_distance_m: f64,
        delta_m: f64,
    ) -> Result<RemoteProgress, SyncError> {
        let request = self
            .client
            .post(self.url(user_id, journey_id, "progress"))
            .json(&ProgressRequest {
                total_distance_m,
                delta_m,
            });
        self.send(request, user_id, journey_id).await
    }
}
