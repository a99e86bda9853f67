//! Access-sync orchestration.
//!
//! One sync job propagates one subscriber's current entitlement to
//! every published asset. Per-asset visibility calls run concurrently;
//! the job completes only if all of them succeed, and a failed sync
//! leaves already-synced assets in place — the sweeper converges the
//! rest without rolling anything back.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};

use vodsync_hosting::{VideoHost, Visibility};
use vodsync_models::{AccessChange, ProcessingJob, SubscriberId};
use vodsync_store::{AccessAuditLog, AssetStore, JobStore, SubscriberStore};

use crate::error::PipelineResult;
use crate::metrics;

/// Propagates subscriber entitlement to the video host.
pub struct AccessSyncOrchestrator {
    jobs: Arc<JobStore>,
    assets: Arc<AssetStore>,
    subscribers: Arc<SubscriberStore>,
    audit: Arc<AccessAuditLog>,
    host: Arc<dyn VideoHost>,
}

impl AccessSyncOrchestrator {
    pub fn new(
        jobs: Arc<JobStore>,
        assets: Arc<AssetStore>,
        subscribers: Arc<SubscriberStore>,
        audit: Arc<AccessAuditLog>,
        host: Arc<dyn VideoHost>,
    ) -> Self {
        Self {
            jobs,
            assets,
            subscribers,
            audit,
            host,
        }
    }

    /// Run one access sync for a subscriber.
    ///
    /// Creates the job record, runs the propagation and returns the
    /// terminal record. `retry_count` is untouched on failure: the
    /// sweeper owns resubmission counting.
    pub async fn sync_subscriber_access(
        &self,
        subscriber_id: &SubscriberId,
    ) -> PipelineResult<ProcessingJob> {
        let stored = self
            .jobs
            .insert(ProcessingJob::new_access_sync(subscriber_id.clone()))
            .await?;
        let started = self
            .jobs
            .update(&stored.id, stored.version, |j| j.start())
            .await?;

        let job = match self.propagate_and_audit(subscriber_id).await {
            Ok(change) => {
                metrics::record_job(started.kind.as_str(), "completed");
                self.jobs
                    .update(&started.id, started.version, |j| {
                        j.complete(format!("visibility:{change}"))
                    })
                    .await?
            }
            Err(error) => {
                warn!(subscriber_id = %subscriber_id, error, "access sync failed");
                metrics::record_job(started.kind.as_str(), "failed");
                self.jobs
                    .update(&started.id, started.version, |j| j.fail(error.clone()))
                    .await?
            }
        };

        Ok(job)
    }

    /// Propagate the subscriber's entitlement to every published asset
    /// and, when every call succeeds, append the audit entry.
    ///
    /// On failure the first error in asset order is returned; assets
    /// whose calls succeeded keep their updated visibility.
    pub(crate) async fn propagate_and_audit(
        &self,
        subscriber_id: &SubscriberId,
    ) -> Result<AccessChange, String> {
        let state = self.subscribers.get_or_default(subscriber_id).await;
        let entitled = state.has_access();
        let visibility = Visibility::from_entitled(entitled);

        let published = self.assets.list_ready().await;
        debug!(
            subscriber_id = %subscriber_id,
            visibility = %visibility,
            assets = published.len(),
            "propagating access"
        );

        let calls = published
            .iter()
            .map(|asset| self.host.set_visibility(&asset.id, subscriber_id, visibility));

        for result in join_all(calls).await {
            if let Err(e) = result {
                return Err(e.to_string());
            }
        }

        let change = AccessChange::from_visible(entitled);
        self.audit.append(subscriber_id.clone(), change).await;
        info!(subscriber_id = %subscriber_id, change = %change, "access sync propagated");
        Ok(change)
    }
}
