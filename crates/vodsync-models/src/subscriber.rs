//! Subscriber access state and billing-driven transitions.
//!
//! Billing events from the payment processor are the only input; the
//! access-sync orchestrator is the only consumer. Transitions across
//! the `Active` boundary are what trigger access propagation.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Consecutive payment failures before a subscription is deactivated.
pub const PAYMENT_FAILURE_SUSPEND_THRESHOLD: u32 = 3;

/// Unique identifier for a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct SubscriberId(pub String);

impl SubscriberId {
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Subscription standing derived from payment history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Paid up; entitled to playback
    #[default]
    Active,
    /// Recent payment failed, entitlement suspended pending recovery
    PastDue,
    /// Too many consecutive failures; requires a successful payment
    Inactive,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::PastDue => "past_due",
            SubscriptionStatus::Inactive => "inactive",
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SubscriptionStatus::Active)
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a payment attempt, as reported by the billing webhook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BillingOutcome {
    Success,
    Failure,
}

/// The visible effect of a completed access propagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AccessChange {
    Granted,
    Revoked,
}

impl AccessChange {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessChange::Granted => "granted",
            AccessChange::Revoked => "revoked",
        }
    }

    /// The change implied by a desired-visibility flag.
    pub fn from_visible(visible: bool) -> Self {
        if visible {
            AccessChange::Granted
        } else {
            AccessChange::Revoked
        }
    }
}

impl fmt::Display for AccessChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The before/after of one applied billing event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionTransition {
    pub previous: SubscriptionStatus,
    pub current: SubscriptionStatus,
}

impl SubscriptionTransition {
    /// True when the event moved the subscriber into or out of
    /// `Active` — the only transitions that require an access sync.
    pub fn crossed_active_boundary(&self) -> bool {
        self.previous.is_active() != self.current.is_active()
    }
}

/// Per-subscriber payment standing.
///
/// Invariant: `payment_failure_count >=
/// PAYMENT_FAILURE_SUSPEND_THRESHOLD` implies `Inactive`; a successful
/// payment resets the count to 0 and the status to `Active`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SubscriberAccessState {
    /// Subscriber this state belongs to
    pub subscriber_id: SubscriberId,

    /// Current standing
    #[serde(default)]
    pub status: SubscriptionStatus,

    /// Consecutive failed payment attempts
    #[serde(default)]
    pub payment_failure_count: u32,

    /// Last transition timestamp
    pub updated_at: DateTime<Utc>,
}

impl SubscriberAccessState {
    /// A fresh subscriber starts active with a clean payment history.
    pub fn new(subscriber_id: SubscriberId) -> Self {
        Self {
            subscriber_id,
            status: SubscriptionStatus::Active,
            payment_failure_count: 0,
            updated_at: Utc::now(),
        }
    }

    /// Whether published assets should be visible to this subscriber.
    pub fn has_access(&self) -> bool {
        self.status.is_active()
    }

    /// Apply one billing event and report the transition.
    pub fn apply(&mut self, outcome: BillingOutcome) -> SubscriptionTransition {
        let previous = self.status;

        match outcome {
            BillingOutcome::Success => {
                self.payment_failure_count = 0;
                self.status = SubscriptionStatus::Active;
            }
            BillingOutcome::Failure => {
                self.payment_failure_count += 1;
                self.status = if self.payment_failure_count >= PAYMENT_FAILURE_SUSPEND_THRESHOLD {
                    SubscriptionStatus::Inactive
                } else {
                    SubscriptionStatus::PastDue
                };
            }
        }

        self.updated_at = Utc::now();
        SubscriptionTransition {
            previous,
            current: self.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> SubscriberAccessState {
        SubscriberAccessState::new(SubscriberId::from_string("sub-1"))
    }

    #[test]
    fn test_failure_count_drives_status() {
        let mut s = state();

        let t = s.apply(BillingOutcome::Failure);
        assert_eq!(s.status, SubscriptionStatus::PastDue);
        assert_eq!(s.payment_failure_count, 1);
        assert!(t.crossed_active_boundary());

        s.apply(BillingOutcome::Failure);
        assert_eq!(s.status, SubscriptionStatus::PastDue);
        assert_eq!(s.payment_failure_count, 2);

        let t = s.apply(BillingOutcome::Failure);
        assert_eq!(s.status, SubscriptionStatus::Inactive);
        assert_eq!(s.payment_failure_count, 3);
        // past_due -> inactive does not cross the active boundary
        assert!(!t.crossed_active_boundary());
    }

    #[test]
    fn test_success_resets_at_any_count() {
        let mut s = state();
        for _ in 0..5 {
            s.apply(BillingOutcome::Failure);
        }
        assert_eq!(s.status, SubscriptionStatus::Inactive);

        let t = s.apply(BillingOutcome::Success);
        assert_eq!(s.status, SubscriptionStatus::Active);
        assert_eq!(s.payment_failure_count, 0);
        assert!(t.crossed_active_boundary());
    }

    #[test]
    fn test_success_while_active_is_not_a_transition() {
        let mut s = state();
        let t = s.apply(BillingOutcome::Success);
        assert_eq!(t.previous, SubscriptionStatus::Active);
        assert_eq!(t.current, SubscriptionStatus::Active);
        assert!(!t.crossed_active_boundary());
    }

    #[test]
    fn test_access_follows_active_only() {
        let mut s = state();
        assert!(s.has_access());

        s.apply(BillingOutcome::Failure);
        assert!(!s.has_access());

        s.apply(BillingOutcome::Success);
        assert!(s.has_access());
    }
}
