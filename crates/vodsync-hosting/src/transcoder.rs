//! Worker adapter for the external transcoding capability.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vodsync_models::{EncodingProfile, ThumbnailPlan};

use crate::error::{HostingError, HostingResult};

/// The capability's native job identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExternalJobId(pub String);

impl ExternalJobId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Work handed to the capability for one (source, parameters) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerPayload {
    /// Encode the source with one tier's profile.
    Encode { profile: EncodingProfile },
    /// Capture the scheduled thumbnail set.
    Thumbnails { plan: ThumbnailPlan },
}

/// Remote job state as reported by the capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteJobState {
    Pending,
    Running,
    Completed,
    Failed,
}

impl RemoteJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RemoteJobState::Completed | RemoteJobState::Failed)
    }
}

/// One poll of a remote job.
#[derive(Debug, Clone, Deserialize)]
pub struct TranscodePoll {
    pub state: RemoteJobState,
    #[serde(default)]
    pub progress: u8,
    #[serde(default)]
    pub output_ref: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Boundary to the external transcoding capability.
///
/// Pure translation: no retry policy, no aggregation, no job-store
/// writes. Communication failures surface as errors with
/// distinguishable messages; they are never swallowed.
#[async_trait]
pub trait TranscodeBackend: Send + Sync {
    /// Hand one unit of work to the capability.
    async fn submit(&self, source_ref: &str, payload: WorkerPayload)
        -> HostingResult<ExternalJobId>;

    /// Report the current state of a previously submitted job.
    async fn poll(&self, job: &ExternalJobId) -> HostingResult<TranscodePoll>;
}

// =============================================================================
// HTTP implementation
// =============================================================================

/// Configuration for the HTTP transcoder adapter.
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    /// Base URL of the transcoding service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
    /// Connect timeout
    pub connect_timeout: Duration,
}

impl TranscoderConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TRANSCODER_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCODER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            connect_timeout: Duration::from_secs(
                std::env::var("TRANSCODER_CONNECT_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        }
    }
}

#[derive(Serialize)]
struct SubmitRequest<'a> {
    source_ref: &'a str,
    #[serde(flatten)]
    payload: &'a WorkerPayload,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: ExternalJobId,
}

/// REST client for the transcoding service.
pub struct HttpTranscodeBackend {
    http: Client,
    base_url: String,
}

impl HttpTranscodeBackend {
    pub fn new(config: TranscoderConfig) -> HostingResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(concat!("vodsync-hosting/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(HostingError::TranscoderUnreachable)?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> HostingResult<Self> {
        Self::new(TranscoderConfig::from_env())
    }
}

#[async_trait]
impl TranscodeBackend for HttpTranscodeBackend {
    async fn submit(
        &self,
        source_ref: &str,
        payload: WorkerPayload,
    ) -> HostingResult<ExternalJobId> {
        let url = format!("{}/v1/jobs", self.base_url);
        let response = self
            .http
            .post(&url)
            .json(&SubmitRequest {
                source_ref,
                payload: &payload,
            })
            .send()
            .await
            .map_err(HostingError::TranscoderUnreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::rejected(format!("status {status}: {body}")));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| HostingError::bad_response(e.to_string()))?;

        debug!(external_job_id = %parsed.id, source_ref, "submitted work to transcoder");
        Ok(parsed.id)
    }

    async fn poll(&self, job: &ExternalJobId) -> HostingResult<TranscodePoll> {
        let url = format!("{}/v1/jobs/{}", self.base_url, job);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(HostingError::TranscoderUnreachable)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HostingError::rejected(format!("status {status}: {body}")));
        }

        response
            .json()
            .await
            .map_err(|e| HostingError::bad_response(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vodsync_models::{ContainerMode, QualityTier};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn backend_for(server: &MockServer) -> HttpTranscodeBackend {
        HttpTranscodeBackend::new(TranscoderConfig {
            base_url: server.uri(),
            timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    fn encode_payload() -> WorkerPayload {
        let tier = QualityTier::from("720p");
        WorkerPayload::Encode {
            profile: EncodingProfile::for_tier(&tier, ContainerMode::SingleFile),
        }
    }

    #[tokio::test]
    async fn test_submit_round_trip() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .and(body_partial_json(json!({
                "source_ref": "s3://uploads/raw.mkv",
                "type": "encode",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "ext-42"})))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let id = backend
            .submit("s3://uploads/raw.mkv", encode_payload())
            .await
            .unwrap();
        assert_eq!(id.as_str(), "ext-42");
    }

    #[tokio::test]
    async fn test_poll_parses_terminal_state() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/ext-42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "state": "completed",
                "progress": 100,
                "output_ref": "s3://outputs/720p.mp4",
            })))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let poll = backend.poll(&ExternalJobId("ext-42".to_string())).await.unwrap();
        assert_eq!(poll.state, RemoteJobState::Completed);
        assert!(poll.state.is_terminal());
        assert_eq!(poll.output_ref.as_deref(), Some("s3://outputs/720p.mp4"));
    }

    #[tokio::test]
    async fn test_server_error_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/jobs"))
            .respond_with(ResponseTemplate::new(500).set_body_string("encoder pool exhausted"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .submit("s3://uploads/raw.mkv", encode_payload())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("transcoder rejected submission"), "{msg}");
        assert!(msg.contains("encoder pool exhausted"), "{msg}");
    }

    #[tokio::test]
    async fn test_malformed_body_is_distinguishable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/jobs/ext-42"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let backend = backend_for(&server);
        let err = backend
            .poll(&ExternalJobId("ext-42".to_string()))
            .await
            .unwrap_err();
        assert!(
            err.to_string().contains("malformed response"),
            "{err}"
        );
    }

    #[tokio::test]
    async fn test_connection_failure_is_distinguishable() {
        let backend = HttpTranscodeBackend::new(TranscoderConfig {
            // Nothing listens here
            base_url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
            connect_timeout: Duration::from_secs(1),
        })
        .unwrap();

        let err = backend
            .poll(&ExternalJobId("ext-1".to_string()))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("transcoder request failed"), "{err}");
    }
}
