//! Processing trigger.
//!
//! The boundary called by the upload-handling collaborator once a
//! source asset has landed.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use vodsync_models::{AssetId, ContainerMode, QualityTier};
use vodsync_models::thumbnail::DEFAULT_THUMBNAIL_COUNT;
use vodsync_pipeline::BatchRequest;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Body of the processing trigger.
#[derive(Debug, Deserialize, Validate)]
pub struct ProcessRequest {
    #[validate(length(min = 1))]
    pub asset_id: String,

    #[validate(length(min = 1))]
    pub source_ref: String,

    /// Source duration as reported by the uploader
    pub duration_secs: f64,

    /// Requested quality tiers
    #[validate(length(min = 1))]
    pub tiers: Vec<String>,

    /// Thumbnails to capture
    #[serde(default = "default_thumbnail_count")]
    #[validate(range(min = 1, max = 10))]
    pub thumbnail_count: u32,

    /// Chunked output instead of one file per tier
    #[serde(default)]
    pub segmented: bool,
}

fn default_thumbnail_count() -> u32 {
    DEFAULT_THUMBNAIL_COUNT
}

#[derive(Debug, Serialize)]
pub struct ProcessResponse {
    pub batch_id: String,
    pub asset_id: String,
    pub job_ids: Vec<String>,
}

/// POST /api/process
///
/// Creates the job records and starts the batch; returns as soon as
/// the batch is dispatched. Completion is observed by polling the job
/// and asset endpoints.
pub async fn start_processing(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> ApiResult<(StatusCode, Json<ProcessResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    info!(
        asset_id = %request.asset_id,
        tiers = request.tiers.len(),
        "processing request received"
    );

    let container_mode = if request.segmented {
        ContainerMode::Segmented
    } else {
        ContainerMode::SingleFile
    };

    let handle = state
        .transcode
        .start_batch(BatchRequest {
            asset_id: AssetId::from_string(request.asset_id.clone()),
            source_ref: request.source_ref,
            duration_secs: request.duration_secs,
            tiers: request.tiers.into_iter().map(QualityTier::from).collect(),
            thumbnail_count: request.thumbnail_count,
            container_mode,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ProcessResponse {
            batch_id: handle.batch_id,
            asset_id: request.asset_id,
            job_ids: handle.job_ids.iter().map(|id| id.to_string()).collect(),
        }),
    ))
}
