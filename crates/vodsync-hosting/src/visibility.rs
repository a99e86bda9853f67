//! Video-hosting visibility adapter.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vodsync_models::{AssetId, SubscriberId};

use crate::error::{HostingError, HostingResult};

/// Visibility of one asset for one audience scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Visibility implied by an entitlement flag.
    pub fn from_entitled(entitled: bool) -> Self {
        if entitled {
            Visibility::Public
        } else {
            Visibility::Private
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Boundary to the video-hosting collaborator that owns playback
/// visibility.
#[async_trait]
pub trait VideoHost: Send + Sync {
    /// Set one asset's visibility for one subscriber's audience scope.
    async fn set_visibility(
        &self,
        asset_id: &AssetId,
        audience: &SubscriberId,
        visibility: Visibility,
    ) -> HostingResult<()>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Configuration for the HTTP video-host adapter.
#[derive(Debug, Clone)]
pub struct VideoHostConfig {
    /// Base URL of the hosting service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl VideoHostConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("VIDEO_HOST_URL")
                .unwrap_or_else(|_| "http://localhost:8091".to_string()),
            timeout: Duration::from_secs(
                std::env::var("VIDEO_HOST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(15),
            ),
        }
    }
}

#[derive(Serialize)]
struct VisibilityRequest {
    visibility: Visibility,
}

/// REST client for the hosting service.
pub struct HttpVideoHost {
    http: Client,
    base_url: String,
}

impl HttpVideoHost {
    pub fn new(config: VideoHostConfig) -> HostingResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vodsync-hosting/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HostingError::HostUnreachable)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> HostingResult<Self> {
        Self::new(VideoHostConfig::from_env())
    }
}

#[async_trait]
impl VideoHost for HttpVideoHost {
    async fn set_visibility(
        &self,
        asset_id: &AssetId,
        audience: &SubscriberId,
        visibility: Visibility,
    ) -> HostingResult<()> {
        let url = format!(
            "{}/v1/videos/{}/audience/{}",
            self.base_url, asset_id, audience
        );
        let response = self
            .http
            .put(&url)
            .json(&VisibilityRequest { visibility })
            .send()
            .await
            .map_err(HostingError::HostUnreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::host_rejected(format!(
                "status {status}: {body}"
            )));
        }

        debug!(asset_id = %asset_id, audience = %audience, visibility = %visibility, "visibility updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn host_for(server: &MockServer) -> HttpVideoHost {
        HttpVideoHost::new(VideoHostConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_set_visibility_puts_audience_scope() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/videos/asset-1/audience/sub-1"))
            .and(body_json(json!({"visibility": "private"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let host = host_for(&server);
        host.set_visibility(
            &AssetId::from_string("asset-1"),
            &SubscriberId::from_string("sub-1"),
            Visibility::Private,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_rejection_carries_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403).set_body_string("unknown audience"))
            .mount(&server)
            .await;

        let host = host_for(&server);
        let err = host
            .set_visibility(
                &AssetId::from_string("asset-1"),
                &SubscriberId::from_string("sub-1"),
                Visibility::Public,
            )
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("video host rejected"), "{msg}");
        assert!(msg.contains("unknown audience"), "{msg}");
    }
}
