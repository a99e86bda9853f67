//! Adapters for the pipeline's two external collaborators.
//!
//! - [`TranscodeBackend`]: the media transcoding capability. The
//!   adapter translates between the orchestrator's job model and the
//!   capability's native job representation; it performs no business
//!   logic.
//! - [`VideoHost`]: the hosting service that owns per-audience
//!   visibility of published assets.
//!
//! Both seams are object-safe traits so orchestrators take
//! `Arc<dyn …>` and tests inject scripted fakes.

pub mod error;
pub mod transcoder;
pub mod visibility;

pub use error::{HostingError, HostingResult};
pub use transcoder::{
    ExternalJobId, HttpTranscodeBackend, RemoteJobState, TranscodeBackend, TranscodePoll,
    TranscoderConfig, WorkerPayload,
};
pub use visibility::{HttpVideoHost, VideoHost, VideoHostConfig, Visibility};
