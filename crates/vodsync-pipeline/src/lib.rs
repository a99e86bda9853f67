//! Orchestration logic for the vodsync pipeline.
//!
//! This crate owns every state machine in the system:
//! - [`TranscodeOrchestrator`]: turns one processing request into a
//!   fan-out of per-tier transcode jobs plus a thumbnail job, polls
//!   them to a terminal state and aggregates the results into the
//!   asset's readiness record.
//! - [`AccessSyncOrchestrator`]: propagates one subscriber's
//!   entitlement to every published asset via the video host.
//! - [`AccessSyncSweeper`]: periodically resubmits failed access-sync
//!   jobs until they converge.
//! - [`SubscriptionLifecycle`]: applies billing events and bridges
//!   them to access syncs.

pub mod access_sync;
pub mod billing;
pub mod config;
pub mod error;
pub mod metrics;
pub mod sweeper;
pub mod transcode;

pub use access_sync::AccessSyncOrchestrator;
pub use billing::{BillingEvent, BillingUpdate, SubscriptionLifecycle};
pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult};
pub use sweeper::{AccessSyncSweeper, SweepReport};
pub use transcode::{BatchHandle, BatchOutcome, BatchRequest, TranscodeOrchestrator};
