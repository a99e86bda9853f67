//! Access propagation audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::info;

use vodsync_models::{AccessChange, SubscriberId};

/// One completed access propagation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessAuditEntry {
    /// Affected subscriber
    pub subscriber_id: SubscriberId,
    /// Whether access was granted or revoked
    pub change: AccessChange,
    /// When the propagation completed
    pub recorded_at: DateTime<Utc>,
}

/// Append-only log of completed access propagations. One entry per
/// completed sync job.
#[derive(Default)]
pub struct AccessAuditLog {
    entries: RwLock<Vec<AccessAuditEntry>>,
}

impl AccessAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed propagation.
    pub async fn append(&self, subscriber_id: SubscriberId, change: AccessChange) {
        info!(subscriber_id = %subscriber_id, change = %change, "access propagated");
        let mut entries = self.entries.write().await;
        entries.push(AccessAuditEntry {
            subscriber_id,
            change,
            recorded_at: Utc::now(),
        });
    }

    /// Entries for one subscriber, in append order.
    pub async fn entries_for(&self, subscriber_id: &SubscriberId) -> Vec<AccessAuditEntry> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .filter(|e| &e.subscriber_id == subscriber_id)
            .cloned()
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_append_order_is_kept() {
        let log = AccessAuditLog::new();
        let sub = SubscriberId::from_string("sub-1");

        log.append(sub.clone(), AccessChange::Revoked).await;
        log.append(sub.clone(), AccessChange::Granted).await;
        log.append(SubscriberId::from_string("sub-2"), AccessChange::Granted)
            .await;

        let entries = log.entries_for(&sub).await;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].change, AccessChange::Revoked);
        assert_eq!(entries[1].change, AccessChange::Granted);
        assert_eq!(log.len().await, 3);
    }
}
