//! Access-sync retry sweeper.
//!
//! Failed access syncs are not retried by the orchestrator that
//! observed the failure; this loop picks them up on a fixed period and
//! resubmits them until they converge. There is no retry cap — a
//! subscriber whose revocation keeps failing must not stay entitled
//! because a counter ran out — but chronic failures are surfaced at
//! warn level once `retry_alert_threshold` is passed.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use vodsync_store::JobStore;

use crate::access_sync::AccessSyncOrchestrator;
use crate::config::PipelineConfig;
use crate::metrics;

/// Outcome of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Failed jobs picked up this sweep
    pub scanned: usize,
    /// Jobs that completed on resubmission
    pub recovered: usize,
    /// Jobs that failed again and stay queued for the next sweep
    pub still_failing: usize,
}

/// Periodically resubmits failed access-sync jobs.
pub struct AccessSyncSweeper {
    jobs: Arc<JobStore>,
    sync: Arc<AccessSyncOrchestrator>,
    config: PipelineConfig,
}

impl AccessSyncSweeper {
    pub fn new(
        jobs: Arc<JobStore>,
        sync: Arc<AccessSyncOrchestrator>,
        config: PipelineConfig,
    ) -> Self {
        Self { jobs, sync, config }
    }

    /// Run the sweep loop until the shutdown signal flips.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.sweep_interval.as_secs(),
            batch_limit = self.config.sweep_batch_limit,
            "starting access-sync sweeper"
        );

        let mut ticker = interval(self.config.sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("access-sync sweeper stopping");
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let report = self.sweep_failed_jobs(self.config.sweep_batch_limit).await;
                    if report.scanned > 0 {
                        info!(
                            scanned = report.scanned,
                            recovered = report.recovered,
                            still_failing = report.still_failing,
                            "sweep finished"
                        );
                    }
                }
            }
        }
    }

    /// Resubmit up to `batch_limit` failed access-sync jobs, oldest
    /// first.
    pub async fn sweep_failed_jobs(&self, batch_limit: usize) -> SweepReport {
        let failed = self.jobs.list_failed_access_sync(batch_limit).await;
        let mut report = SweepReport::default();

        for job in failed {
            let Some(subscriber_id) = job.parameters.subscriber_id().cloned() else {
                warn!(job_id = %job.id, "failed access-sync job without subscriber parameters");
                continue;
            };
            report.scanned += 1;

            match self.sync.propagate_and_audit(&subscriber_id).await {
                Ok(change) => {
                    let update = self
                        .jobs
                        .update(&job.id, job.version, |j| {
                            j.complete(format!("visibility:{change}"))
                        })
                        .await;
                    match update {
                        Ok(_) => {
                            report.recovered += 1;
                            metrics::record_sweep_retry("recovered");
                        }
                        Err(e) if e.is_version_conflict() => {
                            // Another sweep already settled this job.
                            debug!(job_id = %job.id, "sweep lost the update race");
                        }
                        Err(e) => warn!(job_id = %job.id, "sweep update failed: {e}"),
                    }
                }
                Err(error) => {
                    let update = self
                        .jobs
                        .update(&job.id, job.version, |j| {
                            j.record_retry_failure(error.clone())
                        })
                        .await;
                    match update {
                        Ok(updated) => {
                            report.still_failing += 1;
                            metrics::record_sweep_retry("failed");
                            if updated.retry_count >= self.config.retry_alert_threshold {
                                warn!(
                                    job_id = %updated.id,
                                    subscriber_id = %subscriber_id,
                                    retry_count = updated.retry_count,
                                    error = updated.error_message.as_deref().unwrap_or_default(),
                                    "access sync keeps failing"
                                );
                            }
                        }
                        Err(e) if e.is_version_conflict() => {
                            debug!(job_id = %job.id, "sweep lost the update race");
                        }
                        Err(e) => warn!(job_id = %job.id, "sweep update failed: {e}"),
                    }
                }
            }
        }

        report
    }
}
