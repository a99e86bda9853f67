//! Asset status polling.

use std::collections::BTreeMap;

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use vodsync_models::AssetId;

use crate::error::ApiResult;
use crate::state::AppState;

/// Asset readiness response.
#[derive(Debug, Serialize)]
pub struct AssetStatusResponse {
    pub asset_id: String,
    /// draft, processing, ready or failed
    pub status: String,
    /// Output URL per quality tier; complete iff status is ready
    pub quality_outputs: BTreeMap<String, String>,
    pub thumbnail_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub updated_at: String,
}

/// GET /api/assets/:asset_id
pub async fn get_asset_status(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
) -> ApiResult<Json<AssetStatusResponse>> {
    let asset = state.assets.get(&AssetId::from_string(asset_id)).await?;

    Ok(Json(AssetStatusResponse {
        asset_id: asset.id.to_string(),
        status: asset.status.to_string(),
        quality_outputs: asset
            .quality_outputs
            .into_iter()
            .map(|(tier, url)| (tier.to_string(), url))
            .collect(),
        thumbnail_refs: asset.thumbnail_refs,
        error_message: asset.error_message,
        updated_at: asset.updated_at.to_rfc3339(),
    }))
}
