//! Pipeline metrics collection.

use metrics::counter;

/// Metric name constants for consistency.
pub mod names {
    /// Completed/failed transcode batches.
    pub const BATCHES_TOTAL: &str = "vodsync_batches_total";

    /// Terminal sub-job outcomes by kind.
    pub const JOBS_TOTAL: &str = "vodsync_jobs_total";

    /// Sweeper resubmission outcomes.
    pub const SWEEP_RETRIES_TOTAL: &str = "vodsync_sweep_retries_total";
}

/// Record a batch reaching a terminal outcome.
pub fn record_batch(outcome: &'static str) {
    counter!(names::BATCHES_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a job reaching a terminal state.
pub fn record_job(kind: &'static str, outcome: &'static str) {
    counter!(
        names::JOBS_TOTAL,
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// Record one sweeper resubmission.
pub fn record_sweep_retry(outcome: &'static str) {
    counter!(names::SWEEP_RETRIES_TOTAL, "outcome" => outcome).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names() {
        assert!(names::BATCHES_TOTAL.starts_with("vodsync_"));
        assert!(names::JOBS_TOTAL.starts_with("vodsync_"));
        assert!(names::SWEEP_RETRIES_TOTAL.starts_with("vodsync_"));
    }
}
