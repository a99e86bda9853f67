//! Content assets and their readiness state.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::encoding::QualityTier;

/// Unique identifier for an asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AssetId(pub String);

impl AssetId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Asset readiness state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    /// Uploaded, no batch started yet
    #[default]
    Draft,
    /// A transcode batch is running
    Processing,
    /// Every requested tier and the thumbnail set are available
    Ready,
    /// The last batch was abandoned
    Failed,
}

impl AssetStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Draft => "draft",
            AssetStatus::Processing => "processing",
            AssetStatus::Ready => "ready",
            AssetStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A content entity and its streamable outputs.
///
/// `Ready` implies `quality_outputs` holds an entry for every tier the
/// originating batch requested; outputs are written all-or-nothing by
/// the transcode orchestrator, never partially.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Asset {
    /// Unique asset ID
    pub id: AssetId,

    /// Location of the uploaded source media
    pub source_ref: String,

    /// Source duration as reported by the upload collaborator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,

    /// Readiness state
    #[serde(default)]
    pub status: AssetStatus,

    /// Output URL per quality tier
    #[serde(default)]
    pub quality_outputs: BTreeMap<QualityTier, String>,

    /// Thumbnail locations, in capture order
    #[serde(default)]
    pub thumbnail_refs: Vec<String>,

    /// Failure reason of the last abandoned batch
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    /// Create a draft asset for an uploaded source.
    pub fn new(id: AssetId, source_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            source_ref: source_ref.into(),
            duration_secs: None,
            status: AssetStatus::Draft,
            quality_outputs: BTreeMap::new(),
            thumbnail_refs: Vec::new(),
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the asset is visible to subscribers at all.
    pub fn is_published(&self) -> bool {
        self.status == AssetStatus::Ready
    }

    /// Mark the start of a transcode batch.
    pub fn begin_processing(&mut self) {
        self.status = AssetStatus::Processing;
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Record a fully successful batch.
    pub fn mark_ready(
        &mut self,
        quality_outputs: BTreeMap<QualityTier, String>,
        thumbnail_refs: Vec<String>,
    ) {
        self.status = AssetStatus::Ready;
        self.quality_outputs = quality_outputs;
        self.thumbnail_refs = thumbnail_refs;
        self.error_message = None;
        self.updated_at = Utc::now();
    }

    /// Record an abandoned batch. Outputs are dropped wholesale; a
    /// failed asset never carries a partial ladder.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = AssetStatus::Failed;
        self.quality_outputs = BTreeMap::new();
        self.thumbnail_refs = Vec::new();
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }
}
