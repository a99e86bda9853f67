//! Asset record store.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::debug;

use vodsync_models::{Asset, AssetId, AssetStatus};

use crate::error::{StoreError, StoreResult};

/// Asset records plus the per-asset batch locks.
///
/// The asset record is mutated only by the orchestrator owning its
/// batch; the lock exists to serialize two batches for the same asset
/// (a retry submitted while a previous batch is still polling), so
/// interleaved writes to `quality_outputs` cannot happen.
#[derive(Default)]
pub struct AssetStore {
    records: RwLock<HashMap<AssetId, Asset>>,
    batch_locks: std::sync::Mutex<HashMap<AssetId, Arc<Mutex<()>>>>,
}

impl AssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an asset record.
    pub async fn upsert(&self, asset: Asset) {
        let mut records = self.records.write().await;
        debug!(asset_id = %asset.id, status = %asset.status, "upserted asset record");
        records.insert(asset.id.clone(), asset);
    }

    /// Fetch an asset by id.
    pub async fn get(&self, id: &AssetId) -> StoreResult<Asset> {
        let records = self.records.read().await;
        records
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(id.as_str()))
    }

    /// Mutate an asset record in place.
    pub async fn update<F>(&self, id: &AssetId, mutate: F) -> StoreResult<Asset>
    where
        F: FnOnce(&mut Asset),
    {
        let mut records = self.records.write().await;
        let record = records
            .get_mut(id)
            .ok_or_else(|| StoreError::not_found(id.as_str()))?;
        mutate(record);
        Ok(record.clone())
    }

    /// Every published (ready) asset.
    pub async fn list_ready(&self) -> Vec<Asset> {
        let records = self.records.read().await;
        let mut ready: Vec<Asset> = records
            .values()
            .filter(|a| a.status == AssetStatus::Ready)
            .cloned()
            .collect();

        ready.sort_by(|a, b| a.id.cmp(&b.id));
        ready
    }

    /// Acquire the batch lock for one asset.
    ///
    /// Held for the duration of a transcode batch; a second batch for
    /// the same asset parks here until the first one reaches a terminal
    /// outcome.
    pub async fn lock_for_batch(&self, id: &AssetId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.batch_locks.lock().expect("batch lock registry poisoned");
            Arc::clone(locks.entry(id.clone()).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(id: &str) -> Asset {
        Asset::new(AssetId::from_string(id), format!("s3://uploads/{id}.mkv"))
    }

    #[tokio::test]
    async fn test_upsert_and_get() {
        let store = AssetStore::new();
        store.upsert(asset("asset-1")).await;

        let fetched = store.get(&AssetId::from_string("asset-1")).await.unwrap();
        assert_eq!(fetched.status, AssetStatus::Draft);

        let missing = store.get(&AssetId::from_string("nope")).await;
        assert!(matches!(missing, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_ready_filters_published() {
        let store = AssetStore::new();
        store.upsert(asset("asset-1")).await;

        let mut published = asset("asset-2");
        published.mark_ready(Default::default(), vec![]);
        store.upsert(published).await;

        let ready = store.list_ready().await;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].id.as_str(), "asset-2");
    }

    #[tokio::test]
    async fn test_batch_lock_serializes_same_asset() {
        let store = Arc::new(AssetStore::new());
        let id = AssetId::from_string("asset-1");

        let guard = store.lock_for_batch(&id).await;

        let contender = {
            let store = Arc::clone(&store);
            let id = id.clone();
            tokio::spawn(async move {
                let _guard = store.lock_for_batch(&id).await;
            })
        };

        // The contender cannot make progress while the guard is held
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }
}
