use crate::config::AnalyticsConfig;
use crate::dataset::source::{CachedSource, DatasetKind, Sourced};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub source: Arc<CachedSource>,
    pub analytics: AnalyticsConfig,
}

impl AppState {
    pub fn new(source: CachedSource, analytics: AnalyticsConfig) -> Self {
        Self {
            source: Arc::new(source),
            analytics,
        }
    }

    /// Load a dataset off the async runtime; sources do blocking I/O.
    pub async fn load(&self, kind: DatasetKind) -> anyhow::Result<Sourced> {
        let source = self.source.clone();
        tokio::task::spawn_blocking(move || source.load(kind)).await?
    }
}
