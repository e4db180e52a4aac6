//! HTTP client for the job registry service
//!
//! Speaks the registry's JSON API:
//!
//! | Operation | Request |
//! |---|---|
//! | create | `POST /job/create` |
//! | get    | `GET /job/{id}` |
//! | list   | `GET /jobs` |
//! | update | `POST /job/update` with `{id, status, result}` |

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RegistryError;
use crate::registry_traits::{JobId, JobRecord, JobRegistry, JobUpdate, RegistryResult};

/// Default registry endpoint
pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:8080";

/// Registry client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the registry service
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            base_url: std::env::var("SCOREBOX_REGISTRY_URL")
                .unwrap_or_else(|_| DEFAULT_REGISTRY_URL.to_string()),
            request_timeout_secs: 30,
        }
    }
}

impl RegistryConfig {
    /// Create a new config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    /// Create config for a specific endpoint
    pub fn new(base_url: &str) -> Self {
        RegistryConfig {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

/// Registry client over HTTP
pub struct HttpJobRegistry {
    config: RegistryConfig,
    http_client: reqwest::Client,
}

impl HttpJobRegistry {
    /// Create a new registry client
    pub fn new(config: RegistryConfig) -> RegistryResult<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("scorebox/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(HttpJobRegistry {
            config,
            http_client,
        })
    }

    /// Create client from environment variables
    pub fn from_env() -> RegistryResult<Self> {
        Self::new(RegistryConfig::from_env())
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Map a response to its decoded body, treating anything but 2xx as a
    /// refusal.
    async fn decode<T: DeserializeOwned>(
        response: reqwest::Response,
        job_id: Option<&JobId>,
    ) -> RegistryResult<T> {
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            if let Some(id) = job_id {
                return Err(RegistryError::NotFound {
                    job_id: id.0.clone(),
                });
            }
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RegistryError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl JobRegistry for HttpJobRegistry {
    async fn create(&self) -> RegistryResult<JobRecord> {
        let response = self.http_client.post(self.url("/job/create")).send().await?;
        Self::decode(response, None).await
    }

    async fn get(&self, id: &JobId) -> RegistryResult<JobRecord> {
        let response = self
            .http_client
            .get(self.url(&format!("/job/{}", id)))
            .send()
            .await?;
        Self::decode(response, Some(id)).await
    }

    async fn list(&self) -> RegistryResult<Vec<JobId>> {
        let response = self.http_client.get(self.url("/jobs")).send().await?;
        Self::decode(response, None).await
    }

    async fn update(&self, update: JobUpdate) -> RegistryResult<JobRecord> {
        debug!(job = %update.id.short(), status = %update.status, "Sending job update");
        let response = self
            .http_client
            .post(self.url("/job/update"))
            .json(&update)
            .send()
            .await?;
        Self::decode(response, Some(&update.id)).await
    }
}
