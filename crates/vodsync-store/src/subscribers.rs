//! Subscriber access state store.

use std::collections::HashMap;

use tokio::sync::RwLock;

use vodsync_models::{SubscriberAccessState, SubscriberId};

/// Per-subscriber payment standing, keyed by subscriber id.
#[derive(Default)]
pub struct SubscriberStore {
    records: RwLock<HashMap<SubscriberId, SubscriberAccessState>>,
}

impl SubscriberStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a subscriber's state, creating the default (active, clean
    /// history) record for subscribers we have not seen a billing event
    /// for yet.
    pub async fn get_or_default(&self, id: &SubscriberId) -> SubscriberAccessState {
        {
            let records = self.records.read().await;
            if let Some(state) = records.get(id) {
                return state.clone();
            }
        }

        let mut records = self.records.write().await;
        records
            .entry(id.clone())
            .or_insert_with(|| SubscriberAccessState::new(id.clone()))
            .clone()
    }

    /// Persist a subscriber's state.
    pub async fn put(&self, state: SubscriberAccessState) {
        let mut records = self.records.write().await;
        records.insert(state.subscriber_id.clone(), state);
    }
}
