//! Transcode batch orchestration.
//!
//! One processing request becomes a batch: one transcode job per
//! requested quality tier plus one thumbnail job, all dispatched to the
//! worker adapter concurrently and polled to a terminal state. The
//! batch completes only if every sub-job completes; one failure, or the
//! batch deadline firing first, fails the whole batch and the asset
//! with it — `quality_outputs` is written all-or-nothing.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval, sleep_until, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use vodsync_hosting::{TranscodeBackend, WorkerPayload};
use vodsync_models::{
    Asset, AssetId, ContainerMode, EncodingProfile, JobId, JobParameters, ProcessingJob,
    QualityTier, ThumbnailPlan,
};
use vodsync_store::{AssetStore, JobStore, StoreResult};

use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::metrics;

/// Failure reason recorded when the batch deadline fires before every
/// sub-job reaches a terminal state.
pub const TIMEOUT_ERROR: &str = "processing timeout";

/// One asset processing request, as received from the upload
/// collaborator.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub asset_id: AssetId,
    pub source_ref: String,
    /// Source duration; input to the thumbnail schedule
    pub duration_secs: f64,
    pub tiers: Vec<QualityTier>,
    pub thumbnail_count: u32,
    pub container_mode: ContainerMode,
}

/// Terminal outcome of a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    Completed,
    Failed { error: String },
}

/// Handle returned to the submitter.
///
/// Completion is observed by subscription, not by blocking the
/// submitting call: the handle resolves when the supervisor publishes
/// the terminal outcome.
#[derive(Debug)]
pub struct BatchHandle {
    pub batch_id: String,
    pub asset_id: AssetId,
    /// Created job ids: one per tier in request order, thumbnail last
    pub job_ids: Vec<JobId>,
    completion: watch::Receiver<Option<BatchOutcome>>,
}

impl BatchHandle {
    /// Wait for the batch to reach a terminal outcome.
    pub async fn wait(&mut self) -> BatchOutcome {
        loop {
            if let Some(outcome) = self.completion.borrow_and_update().clone() {
                return outcome;
            }
            if self.completion.changed().await.is_err() {
                return BatchOutcome::Failed {
                    error: "batch supervisor stopped before completion".to_string(),
                };
            }
        }
    }
}

/// What one sub-job task reports back to the supervisor.
#[derive(Debug, Clone)]
enum JobOutcome {
    Completed { output_ref: String },
    Failed { error: String },
    TimedOut,
}

struct JobResult {
    job_id: JobId,
    outcome: JobOutcome,
}

/// Fans out, polls and joins transcode batches.
pub struct TranscodeOrchestrator {
    jobs: Arc<JobStore>,
    assets: Arc<AssetStore>,
    backend: Arc<dyn TranscodeBackend>,
    config: PipelineConfig,
}

impl TranscodeOrchestrator {
    pub fn new(
        jobs: Arc<JobStore>,
        assets: Arc<AssetStore>,
        backend: Arc<dyn TranscodeBackend>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            jobs,
            assets,
            backend,
            config,
        }
    }

    /// Start a transcode batch for one asset.
    ///
    /// Creates the job records, spawns the supervising task and
    /// returns immediately; batch completion is observed through the
    /// returned handle or by polling the job records. Re-running a
    /// request with the same inputs is safe — the ladder and the
    /// thumbnail schedule are pure, and batches for the same asset
    /// serialize on the per-asset lock.
    pub async fn start_batch(&self, request: BatchRequest) -> PipelineResult<BatchHandle> {
        if request.tiers.is_empty() {
            return Err(PipelineError::invalid_batch("no quality tiers requested"));
        }
        if request.thumbnail_count == 0 {
            return Err(PipelineError::invalid_batch(
                "thumbnail count must be at least 1",
            ));
        }
        if request.duration_secs <= 0.0 {
            return Err(PipelineError::invalid_batch(
                "source duration must be positive",
            ));
        }

        // Make sure the asset record exists and carries the duration
        // the thumbnail schedule was computed from.
        match self.assets.get(&request.asset_id).await {
            Ok(_) => {
                self.assets
                    .update(&request.asset_id, |a| {
                        a.source_ref = request.source_ref.clone();
                        a.duration_secs = Some(request.duration_secs);
                    })
                    .await?;
            }
            Err(_) => {
                let mut asset = Asset::new(request.asset_id.clone(), request.source_ref.clone());
                asset.duration_secs = Some(request.duration_secs);
                self.assets.upsert(asset).await;
            }
        }

        // One pending job per tier, thumbnail job last.
        let mut created = Vec::with_capacity(request.tiers.len() + 1);
        for tier in &request.tiers {
            let profile = EncodingProfile::for_tier(tier, request.container_mode);
            let job = ProcessingJob::new_transcode(request.asset_id.clone(), tier.clone(), profile);
            created.push(self.jobs.insert(job).await?);
        }
        let plan = ThumbnailPlan::evenly_spaced(request.thumbnail_count, request.duration_secs);
        created.push(
            self.jobs
                .insert(ProcessingJob::new_thumbnail(request.asset_id.clone(), plan))
                .await?,
        );

        let batch_id = Uuid::new_v4().to_string();
        let job_ids: Vec<JobId> = created.iter().map(|j| j.id.clone()).collect();

        info!(
            batch_id,
            asset_id = %request.asset_id,
            tiers = request.tiers.len(),
            "starting transcode batch"
        );

        let (outcome_tx, outcome_rx) = watch::channel(None);
        let supervisor = BatchSupervisor {
            jobs: Arc::clone(&self.jobs),
            assets: Arc::clone(&self.assets),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            batch_id: batch_id.clone(),
            request: request.clone(),
            created,
        };
        tokio::spawn(async move {
            let outcome = supervisor.run().await;
            let _ = outcome_tx.send(Some(outcome));
        });

        Ok(BatchHandle {
            batch_id,
            asset_id: request.asset_id,
            job_ids,
            completion: outcome_rx,
        })
    }
}

/// Owns one batch from fan-out to the asset's terminal write.
struct BatchSupervisor {
    jobs: Arc<JobStore>,
    assets: Arc<AssetStore>,
    backend: Arc<dyn TranscodeBackend>,
    config: PipelineConfig,
    batch_id: String,
    request: BatchRequest,
    created: Vec<ProcessingJob>,
}

impl BatchSupervisor {
    async fn run(self) -> BatchOutcome {
        // Serialize with any batch already running for this asset, so
        // two supervisors never interleave writes to quality_outputs.
        let _guard = self.assets.lock_for_batch(&self.request.asset_id).await;

        if let Err(e) = self
            .assets
            .update(&self.request.asset_id, |a| a.begin_processing())
            .await
        {
            error!(batch_id = %self.batch_id, "asset record disappeared: {e}");
            return BatchOutcome::Failed {
                error: e.to_string(),
            };
        }

        let deadline = Instant::now() + self.config.batch_timeout;
        let mut tasks = JoinSet::new();
        for job in &self.created {
            tasks.spawn(run_job(
                Arc::clone(&self.jobs),
                Arc::clone(&self.backend),
                self.request.source_ref.clone(),
                self.config.poll_interval,
                deadline,
                job.clone(),
            ));
        }

        let mut results: HashMap<JobId, JobOutcome> = HashMap::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => {
                    results.insert(result.job_id, result.outcome);
                }
                Err(e) => {
                    // A panicked sub-job task fails the batch below via
                    // the missing-result path.
                    error!(batch_id = %self.batch_id, "sub-job task aborted: {e}");
                }
            }
        }

        let outcome = self.evaluate(results).await;
        match &outcome {
            BatchOutcome::Completed => {
                info!(batch_id = %self.batch_id, asset_id = %self.request.asset_id, "batch completed");
                metrics::record_batch("completed");
            }
            BatchOutcome::Failed { error } => {
                warn!(
                    batch_id = %self.batch_id,
                    asset_id = %self.request.asset_id,
                    error,
                    "batch failed"
                );
                metrics::record_batch("failed");
            }
        }
        outcome
    }

    /// Join semantics: every sub-job completed, or the batch failed
    /// with the first failure reason in job-creation order (timeout
    /// only if no sub-job failed outright).
    async fn evaluate(&self, results: HashMap<JobId, JobOutcome>) -> BatchOutcome {
        let mut quality_outputs: BTreeMap<QualityTier, String> = BTreeMap::new();
        let mut thumbnail_refs: Vec<String> = Vec::new();
        let mut first_error: Option<String> = None;
        let mut timed_out = false;

        for job in &self.created {
            match results.get(&job.id) {
                Some(JobOutcome::Completed { output_ref }) => match &job.parameters {
                    JobParameters::Transcode { tier, .. } => {
                        quality_outputs.insert(tier.clone(), output_ref.clone());
                    }
                    JobParameters::Thumbnail { plan } => {
                        thumbnail_refs = plan.artifact_refs(output_ref);
                    }
                    JobParameters::AccessSync { .. } => {}
                },
                Some(JobOutcome::Failed { error }) => {
                    if first_error.is_none() {
                        first_error = Some(error.clone());
                    }
                }
                Some(JobOutcome::TimedOut) => timed_out = true,
                None => {
                    if first_error.is_none() {
                        first_error = Some("sub-job task failed unexpectedly".to_string());
                    }
                }
            }
        }

        if first_error.is_none() && !timed_out {
            let update = self
                .assets
                .update(&self.request.asset_id, |a| {
                    a.mark_ready(quality_outputs.clone(), thumbnail_refs.clone())
                })
                .await;
            if let Err(e) = update {
                return BatchOutcome::Failed {
                    error: e.to_string(),
                };
            }
            return BatchOutcome::Completed;
        }

        let error = first_error.unwrap_or_else(|| TIMEOUT_ERROR.to_string());
        let _ = self
            .assets
            .update(&self.request.asset_id, |a| a.mark_failed(error.clone()))
            .await;
        BatchOutcome::Failed { error }
    }
}

/// Submit one sub-job and poll it to a terminal state.
async fn run_job(
    jobs: Arc<JobStore>,
    backend: Arc<dyn TranscodeBackend>,
    source_ref: String,
    poll_interval: std::time::Duration,
    deadline: Instant,
    job: ProcessingJob,
) -> JobResult {
    let payload = match &job.parameters {
        JobParameters::Transcode { profile, .. } => WorkerPayload::Encode {
            profile: profile.clone(),
        },
        JobParameters::Thumbnail { plan } => WorkerPayload::Thumbnails { plan: plan.clone() },
        JobParameters::AccessSync { .. } => {
            let error = "access-sync job routed to the transcode batch".to_string();
            let _ = update_if_active(&jobs, &job.id, |j| j.fail(error.clone())).await;
            return JobResult {
                job_id: job.id,
                outcome: JobOutcome::Failed { error },
            };
        }
    };

    let external_id = match backend.submit(&source_ref, payload).await {
        Ok(id) => id,
        Err(e) => {
            let error = e.to_string();
            let _ = update_if_active(&jobs, &job.id, |j| j.fail(error.clone())).await;
            metrics::record_job(job.kind.as_str(), "failed");
            return JobResult {
                job_id: job.id,
                outcome: JobOutcome::Failed { error },
            };
        }
    };

    let _ = update_if_active(&jobs, &job.id, |j| j.start()).await;
    debug!(job_id = %job.id, external_id = %external_id, "sub-job submitted");

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let outcome = loop {
        tokio::select! {
            biased;

            _ = sleep_until(deadline) => {
                let _ = update_if_active(&jobs, &job.id, |j| j.fail(TIMEOUT_ERROR)).await;
                break JobOutcome::TimedOut;
            }

            _ = ticker.tick() => {
                match backend.poll(&external_id).await {
                    Ok(poll) => match poll.state {
                        vodsync_hosting::RemoteJobState::Completed => {
                            match poll.output_ref {
                                Some(output_ref) => {
                                    let _ = update_if_active(&jobs, &job.id, |j| {
                                        j.complete(output_ref.clone())
                                    })
                                    .await;
                                    break JobOutcome::Completed { output_ref };
                                }
                                None => {
                                    let error =
                                        "transcoder reported completion without an output"
                                            .to_string();
                                    let _ = update_if_active(&jobs, &job.id, |j| {
                                        j.fail(error.clone())
                                    })
                                    .await;
                                    break JobOutcome::Failed { error };
                                }
                            }
                        }
                        vodsync_hosting::RemoteJobState::Failed => {
                            let error = poll
                                .error_message
                                .unwrap_or_else(|| "transcoder reported failure".to_string());
                            let _ = update_if_active(&jobs, &job.id, |j| j.fail(error.clone()))
                                .await;
                            break JobOutcome::Failed { error };
                        }
                        vodsync_hosting::RemoteJobState::Pending
                        | vodsync_hosting::RemoteJobState::Running => {
                            let _ = update_if_active(&jobs, &job.id, |j| {
                                j.record_progress(poll.progress)
                            })
                            .await;
                        }
                    },
                    Err(e) => {
                        let error = e.to_string();
                        let _ = update_if_active(&jobs, &job.id, |j| j.fail(error.clone())).await;
                        break JobOutcome::Failed { error };
                    }
                }
            }
        }
    };

    match &outcome {
        JobOutcome::Completed { .. } => metrics::record_job(job.kind.as_str(), "completed"),
        JobOutcome::Failed { .. } | JobOutcome::TimedOut => {
            metrics::record_job(job.kind.as_str(), "failed")
        }
    }

    JobResult {
        job_id: job.id,
        outcome,
    }
}

/// Compare-and-set update that respects terminal states.
///
/// Re-reads on a lost version race; if the record turned terminal in
/// the meantime the update is dropped — the first terminal write wins,
/// which is what keeps two pollers from double-completing a job.
async fn update_if_active<F>(jobs: &JobStore, id: &JobId, mutate: F) -> StoreResult<ProcessingJob>
where
    F: Fn(&mut ProcessingJob) + Clone,
{
    loop {
        let current = jobs.get(id).await?;
        if current.is_terminal() {
            return Ok(current);
        }
        match jobs.update(id, current.version, mutate.clone()).await {
            Ok(updated) => return Ok(updated),
            Err(e) if e.is_version_conflict() => continue,
            Err(e) => return Err(e),
        }
    }
}
