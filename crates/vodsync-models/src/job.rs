//! Processing job records.
//!
//! A [`ProcessingJob`] is one unit of asynchronous work owned by an
//! orchestrator: a per-tier transcode, a thumbnail batch, or a
//! per-subscriber access sync. Records are never deleted; terminal
//! records are retained for audit.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::asset::AssetId;
use crate::encoding::{EncodingProfile, QualityTier};
use crate::subscriber::SubscriberId;
use crate::thumbnail::ThumbnailPlan;

/// Unique identifier for a processing job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of work a job represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Transcode the source into one quality tier
    Transcode,
    /// Generate the thumbnail set for an asset
    Thumbnail,
    /// Propagate a subscriber's playback access
    AccessSync,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::Transcode => "transcode",
            JobKind::Thumbnail => "thumbnail",
            JobKind::AccessSync => "access_sync",
        }
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Job lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Created, not yet submitted to a worker
    #[default]
    Pending,
    /// Submitted and running
    Processing,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// A terminal status is one a job does not spontaneously leave.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Kind-specific job parameters.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobParameters {
    /// Encoding parameters for one quality tier.
    Transcode {
        tier: QualityTier,
        profile: EncodingProfile,
    },
    /// Scheduled capture timestamps.
    Thumbnail { plan: ThumbnailPlan },
    /// The subscriber whose access is being propagated.
    AccessSync { subscriber_id: SubscriberId },
}

impl JobParameters {
    /// The quality tier, for transcode parameters.
    pub fn tier(&self) -> Option<&QualityTier> {
        match self {
            JobParameters::Transcode { tier, .. } => Some(tier),
            _ => None,
        }
    }

    /// The subscriber, for access-sync parameters.
    pub fn subscriber_id(&self) -> Option<&SubscriberId> {
        match self {
            JobParameters::AccessSync { subscriber_id } => Some(subscriber_id),
            _ => None,
        }
    }
}

/// One unit of asynchronous work tracked by the job record store.
///
/// Invariants: `output_ref` is set iff the job is `Completed`;
/// `error_message` is set iff the job is `Failed`; `progress` is
/// non-decreasing while `Processing` and meaningless once terminal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProcessingJob {
    /// Unique job ID
    pub id: JobId,

    /// The asset being processed. `None` for access-sync jobs, which
    /// span every published asset for one subscriber.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<AssetId>,

    /// Job kind
    pub kind: JobKind,

    /// Lifecycle state
    #[serde(default)]
    pub status: JobStatus,

    /// Progress (0-100)
    #[serde(default)]
    pub progress: u8,

    /// Kind-specific parameters
    pub parameters: JobParameters,

    /// Location of the produced artifact (completed jobs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_ref: Option<String>,

    /// Failure reason (failed jobs only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// Number of resubmissions by the retry sweeper
    #[serde(default)]
    pub retry_count: u32,

    /// Optimistic-concurrency token, bumped by the store on every write
    #[serde(default)]
    pub version: u64,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Completion timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl ProcessingJob {
    fn new(asset_id: Option<AssetId>, kind: JobKind, parameters: JobParameters) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            asset_id,
            kind,
            status: JobStatus::Pending,
            progress: 0,
            parameters,
            output_ref: None,
            error_message: None,
            retry_count: 0,
            version: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Create a pending transcode job for one quality tier.
    pub fn new_transcode(asset_id: AssetId, tier: QualityTier, profile: EncodingProfile) -> Self {
        Self::new(
            Some(asset_id),
            JobKind::Transcode,
            JobParameters::Transcode { tier, profile },
        )
    }

    /// Create a pending thumbnail job.
    pub fn new_thumbnail(asset_id: AssetId, plan: ThumbnailPlan) -> Self {
        Self::new(
            Some(asset_id),
            JobKind::Thumbnail,
            JobParameters::Thumbnail { plan },
        )
    }

    /// Create a pending access-sync job for one subscriber.
    pub fn new_access_sync(subscriber_id: SubscriberId) -> Self {
        Self::new(
            None,
            JobKind::AccessSync,
            JobParameters::AccessSync { subscriber_id },
        )
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Mark the job as submitted to a worker.
    pub fn start(&mut self) {
        self.status = JobStatus::Processing;
        self.updated_at = Utc::now();
    }

    /// Record a progress report.
    ///
    /// Progress only moves forward: reports lower than the current
    /// value, or reports against a terminal job, are ignored.
    pub fn record_progress(&mut self, progress: u8) {
        if self.is_terminal() {
            return;
        }
        let progress = progress.min(100);
        if progress > self.progress {
            self.progress = progress;
            self.updated_at = Utc::now();
        }
    }

    /// Mark the job as completed with the produced artifact location.
    ///
    /// Also used by the retry sweeper to recover a previously failed
    /// job: the error is cleared and `retry_count` is left unchanged.
    pub fn complete(&mut self, output_ref: impl Into<String>) {
        self.status = JobStatus::Completed;
        self.progress = 100;
        self.output_ref = Some(output_ref.into());
        self.error_message = None;
        let now = Utc::now();
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    /// Mark the job as failed.
    ///
    /// Does not touch `retry_count`: resubmission counting belongs to
    /// the retry sweeper, not to the orchestrator that observed the
    /// failure.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.output_ref = None;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Record a renewed failure after a sweeper resubmission: the retry
    /// count goes up, the error is overwritten, the status stays failed.
    pub fn record_retry_failure(&mut self, error: impl Into<String>) {
        self.retry_count += 1;
        self.fail(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::ContainerMode;

    fn transcode_job() -> ProcessingJob {
        let tier = QualityTier::from("720p");
        let profile = EncodingProfile::for_tier(&tier, ContainerMode::SingleFile);
        ProcessingJob::new_transcode(AssetId::from_string("asset-1"), tier, profile)
    }

    #[test]
    fn test_job_creation() {
        let job = transcode_job();
        assert_eq!(job.kind, JobKind::Transcode);
        assert_eq!(job.status, JobStatus::Pending);
        assert_eq!(job.progress, 0);
        assert_eq!(job.retry_count, 0);
        assert!(job.output_ref.is_none());
        assert!(job.error_message.is_none());
        assert_eq!(job.parameters.tier().unwrap().as_str(), "720p");
    }

    #[test]
    fn test_job_completion_invariants() {
        let mut job = transcode_job();
        job.start();
        assert_eq!(job.status, JobStatus::Processing);

        job.complete("s3://outputs/asset-1/720p.mp4");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.output_ref.is_some());
        assert!(job.error_message.is_none());
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn test_job_failure_invariants() {
        let mut job = transcode_job();
        job.start();
        job.fail("encoder exited with status 1");

        assert_eq!(job.status, JobStatus::Failed);
        assert!(job.output_ref.is_none());
        assert_eq!(
            job.error_message.as_deref(),
            Some("encoder exited with status 1")
        );
        // Failing is not a resubmission
        assert_eq!(job.retry_count, 0);
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = transcode_job();
        job.start();

        job.record_progress(40);
        assert_eq!(job.progress, 40);

        // Lower reports are ignored
        job.record_progress(10);
        assert_eq!(job.progress, 40);

        job.record_progress(200);
        assert_eq!(job.progress, 100);
    }

    #[test]
    fn test_progress_ignored_once_terminal() {
        let mut job = transcode_job();
        job.start();
        job.fail("boom");
        job.record_progress(99);
        assert_eq!(job.progress, 0);
    }

    #[test]
    fn test_sweeper_retry_bookkeeping() {
        let mut job =
            ProcessingJob::new_access_sync(SubscriberId::from_string("sub-1"));
        job.start();
        job.fail("host unreachable");

        job.record_retry_failure("host unreachable again");
        assert_eq!(job.retry_count, 1);
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.error_message.as_deref(),
            Some("host unreachable again")
        );

        // Recovery keeps the retry count from the last failed sweep
        job.complete("visibility:revoked");
        assert_eq!(job.retry_count, 1);
        assert!(job.error_message.is_none());
    }
}
