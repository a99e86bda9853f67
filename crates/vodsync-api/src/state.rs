//! Application state.

use std::sync::Arc;

use vodsync_hosting::{HttpTranscodeBackend, HttpVideoHost, TranscodeBackend, VideoHost};
use vodsync_pipeline::{
    AccessSyncOrchestrator, PipelineConfig, SubscriptionLifecycle, TranscodeOrchestrator,
};
use vodsync_store::{AccessAuditLog, AssetStore, JobStore, SubscriberStore};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<JobStore>,
    pub assets: Arc<AssetStore>,
    pub subscribers: Arc<SubscriberStore>,
    pub audit: Arc<AccessAuditLog>,
    pub transcode: Arc<TranscodeOrchestrator>,
    pub sync: Arc<AccessSyncOrchestrator>,
    pub lifecycle: Arc<SubscriptionLifecycle>,
}

impl AppState {
    /// Wire the stores and orchestrators around the given collaborator
    /// adapters.
    pub fn new(
        backend: Arc<dyn TranscodeBackend>,
        host: Arc<dyn VideoHost>,
        config: PipelineConfig,
    ) -> Self {
        let jobs = Arc::new(JobStore::new());
        let assets = Arc::new(AssetStore::new());
        let subscribers = Arc::new(SubscriberStore::new());
        let audit = Arc::new(AccessAuditLog::new());

        let transcode = Arc::new(TranscodeOrchestrator::new(
            Arc::clone(&jobs),
            Arc::clone(&assets),
            backend,
            config,
        ));
        let sync = Arc::new(AccessSyncOrchestrator::new(
            Arc::clone(&jobs),
            Arc::clone(&assets),
            Arc::clone(&subscribers),
            Arc::clone(&audit),
            host,
        ));
        let lifecycle = Arc::new(SubscriptionLifecycle::new(
            Arc::clone(&subscribers),
            Arc::clone(&sync),
        ));

        Self {
            jobs,
            assets,
            subscribers,
            audit,
            transcode,
            sync,
            lifecycle,
        }
    }

    /// Create state with the HTTP collaborator adapters configured
    /// from environment variables.
    pub fn from_env(config: PipelineConfig) -> anyhow::Result<Self> {
        let backend = Arc::new(HttpTranscodeBackend::from_env()?);
        let host = Arc::new(HttpVideoHost::from_env()?);
        Ok(Self::new(backend, host, config))
    }
}
