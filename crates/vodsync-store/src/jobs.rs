//! Job record store with optimistic concurrency.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use vodsync_models::{JobId, JobKind, JobStatus, ProcessingJob};

use crate::error::{StoreError, StoreResult};

/// Durable table of processing jobs.
///
/// Every write bumps the record's `version`; conditional updates check
/// the caller's expected version first and fail with
/// [`StoreError::VersionConflict`] on a lost race. Records are never
/// deleted.
#[derive(Default)]
pub struct JobStore {
    records: RwLock<HashMap<JobId, ProcessingJob>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly created job. The stored record starts at
    /// version 1; the returned copy is the authoritative one.
    pub async fn insert(&self, mut job: ProcessingJob) -> StoreResult<ProcessingJob> {
        let mut records = self.records.write().await;
        if records.contains_key(&job.id) {
            return Err(StoreError::already_exists(job.id.as_str()));
        }

        job.version = 1;
        records.insert(job.id.clone(), job.clone());
        debug!(job_id = %job.id, kind = %job.kind, "inserted job record");
        Ok(job)
    }

    /// Fetch a job by id.
    pub async fn get(&self, id: &JobId) -> StoreResult<ProcessingJob> {
        let records = self.records.read().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id.as_str()))
    }

    /// Conditionally update a job.
    ///
    /// The mutation is applied only if the stored version still matches
    /// `expected_version`; on success the version is bumped and the new
    /// record returned. On a conflict the record is left untouched —
    /// callers re-read and decide whether their update still applies.
    pub async fn update<F>(
        &self,
        id: &JobId,
        expected_version: u64,
        mutate: F,
    ) -> StoreResult<ProcessingJob>
    where
        F: FnOnce(&mut ProcessingJob),
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;

        if record.version != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                actual: record.version,
            });
        }

        mutate(record);
        record.version += 1;
        Ok(record.clone())
    }

    /// Failed access-sync jobs, oldest first, up to `limit`.
    ///
    /// Ordered by creation time so chronically failing jobs are not
    /// starved by newer failures.
    pub async fn list_failed_access_sync(&self, limit: usize) -> Vec<ProcessingJob> {
        let records = self.records.read().await;
        let mut failed: Vec<ProcessingJob> = records
            .values()
            .filter(|j| j.kind == JobKind::AccessSync && j.status == JobStatus::Failed)
            .cloned()
            .collect();

        failed.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        failed.truncate(limit);
        failed
    }

    /// Every job belonging to one asset, in creation order.
    pub async fn list_for_asset(
        &self,
        asset_id: &vodsync_models::AssetId,
    ) -> Vec<ProcessingJob> {
        let records = self.records.read().await;
        let mut jobs: Vec<ProcessingJob> = records
            .values()
            .filter(|j| j.asset_id.as_ref() == Some(asset_id))
            .cloned()
            .collect();

        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }

    /// Number of records, all states included.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Jobs of one kind, any status, in creation order. Used by tests
    /// and the status endpoints; the orchestration paths go through the
    /// targeted queries above.
    pub async fn list_by_kind(&self, kind: JobKind) -> Vec<ProcessingJob> {
        let records = self.records.read().await;
        let mut jobs: Vec<ProcessingJob> = records
            .values()
            .filter(|j| j.kind == kind)
            .cloned()
            .collect();

        jobs.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        jobs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vodsync_models::SubscriberId;

    fn sync_job(subscriber: &str) -> ProcessingJob {
        ProcessingJob::new_access_sync(SubscriberId::from_string(subscriber))
    }

    #[tokio::test]
    async fn test_insert_assigns_first_version() {
        let store = JobStore::new();
        let stored = store.insert(sync_job("sub-1")).await.unwrap();
        assert_eq!(stored.version, 1);

        let fetched = store.get(&stored.id).await.unwrap();
        assert_eq!(fetched.version, 1);
        assert_eq!(fetched.status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = JobStore::new();
        let job = store.insert(sync_job("sub-1")).await.unwrap();
        let err = store.insert(job).await.unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_conditional_update_bumps_version() {
        let store = JobStore::new();
        let stored = store.insert(sync_job("sub-1")).await.unwrap();

        let updated = store
            .update(&stored.id, stored.version, |j| j.start())
            .await
            .unwrap();
        assert_eq!(updated.status, JobStatus::Processing);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_stale_version_conflicts_and_leaves_record_unchanged() {
        let store = JobStore::new();
        let stored = store.insert(sync_job("sub-1")).await.unwrap();

        store
            .update(&stored.id, stored.version, |j| j.start())
            .await
            .unwrap();

        // A second writer holding the original version loses the race
        let err = store
            .update(&stored.id, stored.version, |j| j.fail("late poller"))
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());

        let current = store.get(&stored.id).await.unwrap();
        assert_eq!(current.status, JobStatus::Processing);
        assert!(current.error_message.is_none());
    }

    #[tokio::test]
    async fn test_failed_access_sync_listing_is_oldest_first_and_limited() {
        let store = JobStore::new();

        let mut ids = Vec::new();
        for i in 0..4i64 {
            let mut job = sync_job(&format!("sub-{i}"));
            // Pin distinct creation times so the ordering assertion
            // cannot race the clock resolution.
            job.created_at += chrono::Duration::seconds(i);
            let stored = store.insert(job).await.unwrap();
            ids.push(stored.id.clone());
            store
                .update(&stored.id, stored.version, |j| {
                    j.start();
                    j.fail("host unreachable");
                })
                .await
                .unwrap();
        }

        let failed = store.list_failed_access_sync(2).await;
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].id, ids[0]);
        assert_eq!(failed[1].id, ids[1]);
    }
}
