//! Billing events and the subscription lifecycle.
//!
//! The payment processor's webhook is the sole input; transitions
//! across the `Active` boundary are the sole trigger connecting
//! billing to visibility changes.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use vodsync_models::{BillingOutcome, ProcessingJob, SubscriberAccessState, SubscriberId};
use vodsync_store::SubscriberStore;

use crate::access_sync::AccessSyncOrchestrator;
use crate::error::PipelineResult;

/// One payment-processor notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingEvent {
    pub subscriber_id: SubscriberId,
    pub outcome: BillingOutcome,
}

/// Result of applying one billing event.
#[derive(Debug, Clone)]
pub struct BillingUpdate {
    /// The subscriber's state after the event
    pub state: SubscriberAccessState,
    /// The access-sync job, present iff the event crossed the
    /// `Active` boundary
    pub sync_job: Option<ProcessingJob>,
}

/// Applies billing events and bridges them to access syncs.
pub struct SubscriptionLifecycle {
    subscribers: Arc<SubscriberStore>,
    sync: Arc<AccessSyncOrchestrator>,
}

impl SubscriptionLifecycle {
    pub fn new(subscribers: Arc<SubscriberStore>, sync: Arc<AccessSyncOrchestrator>) -> Self {
        Self { subscribers, sync }
    }

    /// Apply one billing event.
    ///
    /// Exactly one access-sync job is issued when the event moves the
    /// subscriber into or out of `Active`; every other transition
    /// leaves visibility untouched.
    pub async fn handle_billing_event(&self, event: &BillingEvent) -> PipelineResult<BillingUpdate> {
        let mut state = self.subscribers.get_or_default(&event.subscriber_id).await;
        let transition = state.apply(event.outcome);
        self.subscribers.put(state.clone()).await;

        info!(
            subscriber_id = %event.subscriber_id,
            previous = %transition.previous,
            current = %transition.current,
            failures = state.payment_failure_count,
            "billing event applied"
        );

        let sync_job = if transition.crossed_active_boundary() {
            Some(self.sync.sync_subscriber_access(&event.subscriber_id).await?)
        } else {
            None
        };

        Ok(BillingUpdate { state, sync_job })
    }
}
