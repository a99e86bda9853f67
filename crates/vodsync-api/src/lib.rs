//! HTTP boundary of the vodsync pipeline.
//!
//! Exposes the processing trigger called by the upload collaborator,
//! polling endpoints for job and asset status, the inbound billing
//! webhook, and health probes. All orchestration lives in
//! `vodsync-pipeline`; the handlers translate between HTTP and the
//! pipeline's types.

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
