//! Router tests against in-process collaborator fakes.

use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use vodsync_api::{create_router, AppState};
use vodsync_hosting::{
    ExternalJobId, HostingResult, RemoteJobState, TranscodeBackend, TranscodePoll, VideoHost,
    Visibility, WorkerPayload,
};
use vodsync_models::{AssetId, SubscriberId};
use vodsync_pipeline::PipelineConfig;

/// Backend whose jobs complete on the first poll.
struct InstantBackend;

#[async_trait]
impl TranscodeBackend for InstantBackend {
    async fn submit(
        &self,
        _source_ref: &str,
        _payload: WorkerPayload,
    ) -> HostingResult<ExternalJobId> {
        Ok(ExternalJobId("ext-1".to_string()))
    }

    async fn poll(&self, _job: &ExternalJobId) -> HostingResult<TranscodePoll> {
        Ok(TranscodePoll {
            state: RemoteJobState::Completed,
            progress: 100,
            output_ref: Some("s3://outputs/file.mp4".to_string()),
            error_message: None,
        })
    }
}

struct NoopHost;

#[async_trait]
impl VideoHost for NoopHost {
    async fn set_visibility(
        &self,
        _asset_id: &AssetId,
        _audience: &SubscriberId,
        _visibility: Visibility,
    ) -> HostingResult<()> {
        Ok(())
    }
}

fn test_app() -> Router {
    let state = AppState::new(
        Arc::new(InstantBackend),
        Arc::new(NoopHost),
        PipelineConfig::default(),
    );
    create_router(state, None)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_health_probe() {
    let app = test_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_process_trigger_creates_batch() {
    let app = test_app();

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/process",
            json!({
                "asset_id": "asset-1",
                "source_ref": "s3://uploads/asset-1.mkv",
                "duration_secs": 600.0,
                "tiers": ["480p", "720p"],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = response_json(response).await;
    assert_eq!(body["asset_id"], "asset-1");
    assert!(!body["batch_id"].as_str().unwrap().is_empty());
    // One job per tier plus the thumbnail job
    let job_ids = body["job_ids"].as_array().unwrap();
    assert_eq!(job_ids.len(), 3);

    // The created jobs are pollable straight away
    let job_id = job_ids[0].as_str().unwrap();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!("/api/jobs/{job_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["kind"], "transcode");
    assert_eq!(body["asset_id"], "asset-1");

    // So is the asset record
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/assets/asset-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_process_trigger_validates_body() {
    let app = test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/process",
            json!({
                "asset_id": "asset-1",
                "source_ref": "s3://uploads/asset-1.mkv",
                "duration_secs": 600.0,
                "tiers": [],
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_job_is_404() {
    let app = test_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/jobs/no-such-job")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_billing_webhook_applies_event() {
    let app = test_app();

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/billing/webhook",
            json!({
                "subscriber_id": "sub-1",
                "outcome": "failure",
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let body = response_json(response).await;
    assert_eq!(body["subscription_status"], "past_due");
    assert_eq!(body["payment_failure_count"], 1);
    // active -> past_due crossed the boundary, so a sync job ran
    assert!(!body["sync_job_id"].as_str().unwrap().is_empty());
}
