//! Inbound billing webhook.
//!
//! The payment processor's notification is the sole input to the
//! subscription lifecycle.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use validator::Validate;

use vodsync_models::{BillingOutcome, SubscriberId};
use vodsync_pipeline::BillingEvent;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Payment-processor notification body.
#[derive(Debug, Deserialize, Validate)]
pub struct BillingWebhookRequest {
    #[validate(length(min = 1))]
    pub subscriber_id: String,
    pub outcome: BillingOutcome,
}

#[derive(Debug, Serialize)]
pub struct BillingWebhookResponse {
    pub subscription_status: String,
    pub payment_failure_count: u32,
    /// Present iff the event crossed the active boundary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_job_id: Option<String>,
}

/// POST /api/billing/webhook
pub async fn billing_webhook(
    State(state): State<AppState>,
    Json(request): Json<BillingWebhookRequest>,
) -> ApiResult<(StatusCode, Json<BillingWebhookResponse>)> {
    request
        .validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let update = state
        .lifecycle
        .handle_billing_event(&BillingEvent {
            subscriber_id: SubscriberId::from_string(request.subscriber_id),
            outcome: request.outcome,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(BillingWebhookResponse {
            subscription_status: update.state.status.to_string(),
            payment_failure_count: update.state.payment_failure_count,
            sync_job_id: update.sync_job.map(|j| j.id.to_string()),
        }),
    ))
}
