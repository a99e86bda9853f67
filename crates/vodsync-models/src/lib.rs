//! Shared data models for the vodsync pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Processing jobs (transcode, thumbnail, access-sync) and their lifecycle
//! - Assets and their readiness state
//! - The quality ladder and encoding profiles
//! - Thumbnail scheduling
//! - Subscriber access state and billing-driven transitions
//!
//! Everything in here is pure data and policy; no I/O.

pub mod asset;
pub mod encoding;
pub mod job;
pub mod subscriber;
pub mod thumbnail;

// Re-export common types
pub use asset::{Asset, AssetId, AssetStatus};
pub use encoding::{segment_file_name, ContainerMode, EncodingProfile, QualityTier};
pub use job::{JobId, JobKind, JobParameters, JobStatus, ProcessingJob};
pub use subscriber::{
    AccessChange, BillingOutcome, SubscriberAccessState, SubscriberId, SubscriptionStatus,
    SubscriptionTransition,
};
pub use thumbnail::ThumbnailPlan;
