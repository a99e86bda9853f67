//! Job status polling.
//!
//! The polling fallback for callers awaiting batch completion: job
//! records expose status, progress and the terminal output or error.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use vodsync_models::JobId;

use crate::error::ApiResult;
use crate::state::AppState;

/// Job status response.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,
    pub kind: String,
    /// pending, processing, completed or failed
    pub status: String,
    /// Progress percentage (0-100)
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub retry_count: u32,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// GET /api/jobs/:job_id
pub async fn get_job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.jobs.get(&JobId::from_string(job_id)).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.id.to_string(),
        asset_id: job.asset_id.as_ref().map(|id| id.to_string()),
        kind: job.kind.to_string(),
        status: job.status.to_string(),
        progress: job.progress,
        output_ref: job.output_ref,
        error_message: job.error_message,
        retry_count: job.retry_count,
        created_at: job.created_at.to_rfc3339(),
        updated_at: job.updated_at.to_rfc3339(),
        completed_at: job.completed_at.map(|t| t.to_rfc3339()),
    }))
}
