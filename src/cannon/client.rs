//! HTTP client for a single ion cannon
//!
//! Wire protocol:
//! - `GET  {base}/status` → `{"generation": int, "available": bool}`
//! - `POST {base}/fire` with `{"target": {"x", "y"}, "enemies": int}` →
//!   `{"casualties": int, "generation": int}`
//!
//! No retries are attempted here. A fire command must never be sent twice.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use url::Url;

use super::{CannonError, CannonResult, CannonStatus, FireOutcome, IonCannon};

// ============================================================================
// Client Configuration
// ============================================================================

/// Configuration for one cannon client
#[derive(Debug, Clone)]
pub struct IonCannonClientConfig {
    /// Cannon base URL
    pub base_url: String,

    /// Display name, defaults to the base URL
    pub name: Option<String>,

    /// Transport-level request timeout
    pub timeout: Duration,
}

impl IonCannonClientConfig {
    /// Create a new client config
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            name: None,
            timeout: Duration::from_secs(10),
        }
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> CannonResult<()> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| CannonError::InvalidConfig(format!("{}: {e}", self.base_url)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CannonError::InvalidConfig(format!(
                "{}: URL must use http or https",
                self.base_url
            )));
        }

        if self.timeout.is_zero() {
            return Err(CannonError::InvalidConfig(
                "timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct FireTarget {
    x: u32,
    y: u32,
}

#[derive(Debug, Serialize)]
struct FireRequest {
    target: FireTarget,
    enemies: u32,
}

// ============================================================================
// Ion Cannon Client
// ============================================================================

/// HTTP-backed [`IonCannon`]
#[derive(Debug, Clone)]
pub struct IonCannonClient {
    name: String,
    base_url: String,
    http_client: Client,
}

impl IonCannonClient {
    /// Create a new cannon client
    pub fn new(config: IonCannonClientConfig) -> CannonResult<Self> {
        config.validate()?;

        let http_client = Client::builder().timeout(config.timeout).build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            name: config.name.unwrap_or_else(|| base_url.clone()),
            base_url,
            http_client,
        })
    }

    /// Base URL without trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    async fn decode<T: for<'de> serde::Deserialize<'de>>(response: Response) -> CannonResult<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(CannonError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| CannonError::Decode(e.to_string()))
    }
}

#[async_trait]
impl IonCannon for IonCannonClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn check_status(&self) -> CannonResult<CannonStatus> {
        let response = self.http_client.get(self.endpoint("status")).send().await?;
        Self::decode(response).await
    }

    async fn fire_command(&self, x: u32, y: u32, enemies: u32) -> CannonResult<FireOutcome> {
        let request = FireRequest {
            target: FireTarget { x, y },
            enemies,
        };

        let response = self
            .http_client
            .post(self.endpoint("fire"))
            .json(&request)
            .send()
            .await?;

        Self::decode(response).await
    }
}

// ============================================================================
// Tests
// ============================================================================
