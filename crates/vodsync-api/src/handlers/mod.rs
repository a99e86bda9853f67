//! Request handlers.

pub mod assets;
pub mod billing;
pub mod health;
pub mod jobs;
pub mod process;

pub use assets::get_asset_status;
pub use billing::billing_webhook;
pub use health::health;
pub use jobs::get_job_status;
pub use process::start_processing;
