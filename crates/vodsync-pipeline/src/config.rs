//! Pipeline configuration.

use std::time::Duration;

/// Orchestration configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// How often a batch supervisor polls each sub-job
    pub poll_interval: Duration,
    /// Overall deadline for a transcode batch, from batch start
    pub batch_timeout: Duration,
    /// How often the retry sweeper scans for failed access syncs
    pub sweep_interval: Duration,
    /// Maximum failed jobs picked up per sweep
    pub sweep_batch_limit: usize,
    /// Retry count past which a chronically failing sync is logged at
    /// warn level
    pub retry_alert_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            batch_timeout: Duration::from_secs(3600), // 1 hour
            sweep_interval: Duration::from_secs(60),
            sweep_batch_limit: 10,
            retry_alert_threshold: 5,
        }
    }
}

impl PipelineConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("PIPELINE_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
            batch_timeout: Duration::from_secs(
                std::env::var("PIPELINE_BATCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(3600),
            ),
            sweep_interval: Duration::from_secs(
                std::env::var("PIPELINE_SWEEP_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(60),
            ),
            sweep_batch_limit: std::env::var("PIPELINE_SWEEP_BATCH_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            retry_alert_threshold: std::env::var("PIPELINE_RETRY_ALERT_THRESHOLD")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
        }
    }
}
