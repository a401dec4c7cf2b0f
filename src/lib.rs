//! towerscope -- cell-tower reliability and support-ticket analytics.
//!
//! This crate provides severity classification, correlation, anomaly
//! detection, trend forecasting, and regional aggregation over tower and
//! ticket datasets, plus the warehouse access, CLI and HTTP API around them.

pub mod analysis;
pub mod api;
pub mod config;
pub mod dataset;
pub mod detect;
pub mod storage;

use anyhow::Result;
use config::Config;
use dataset::source::{CachedSource, DataSource, FallbackSource, Offline};
use std::time::Duration;

/// Wire up the configured primary source behind the sample fallback and cache.
pub fn build_source(config: &Config) -> CachedSource {
    let primary: Box<dyn DataSource> = if config.warehouse.sample_only {
        tracing::info!("sample-only mode, warehouse disabled");
        Box::new(Offline)
    } else {
        match storage::WarehouseSource::open(
            &config.warehouse.database_path,
            config.warehouse.lookback_days,
        ) {
            Ok(source) => Box::new(source),
            Err(e) => {
                tracing::warn!(error = %e, "warehouse unavailable, serving sample data");
                Box::new(Offline)
            }
        }
    };

    CachedSource::new(
        FallbackSource::new(primary),
        Duration::from_secs(config.cache.ttl_secs),
    )
}

/// Start the HTTP API server.
pub async fn serve(config: &Config) -> Result<()> {
    let source = build_source(config);
    let state = api::state::AppState::new(source, config.analytics.clone());

    let addr: std::net::SocketAddr = config.api.bind.parse()?;
    let app = api::router(state);

    tracing::info!(%addr, "towerscope listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
