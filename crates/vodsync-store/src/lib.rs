//! Record stores for the vodsync pipeline.
//!
//! The job record store is the single source of truth for asynchronous
//! work: updates go through an explicit version check so two pollers
//! can never double-complete a job. Asset records additionally expose a
//! per-asset batch lock serializing concurrent batches for one asset.
//!
//! The stores are process-embedded maps behind a narrow API; a durable
//! backend slots in behind the same surface.

pub mod assets;
pub mod audit;
pub mod error;
pub mod jobs;
pub mod subscribers;

pub use assets::AssetStore;
pub use audit::{AccessAuditEntry, AccessAuditLog};
pub use error::{StoreError, StoreResult};
pub use jobs::JobStore;
pub use subscribers::SubscriberStore;
