//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::Result;
use flarewatch_core::Config;
use flarewatch_processing::{AnalysisPipeline, CsvProjector, SubprocessAnalyzer, UploadValidator};
use flarewatch_storage::{LocalStorage, Storage};
use std::sync::Arc;

/// Initialize tracing, state and routes
pub fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.environment())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        data_dir = %config.data_dir.display(),
        output_dir = %config.output_dir.display(),
        "Configuration loaded and validated successfully"
    );

    let state = build_state(&config);
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

/// Wire storage, analyzer and pipeline from the configuration.
/// Directories are created lazily on first write.
pub fn build_state(config: &Config) -> Arc<AppState> {
    let workdir: Arc<dyn Storage> = Arc::new(LocalStorage::new(&config.data_dir));
    let results: Arc<dyn Storage> = Arc::new(LocalStorage::new(&config.output_dir));

    let pipeline = AnalysisPipeline::new(
        UploadValidator::new(
            config.max_upload_size_bytes,
            config.allowed_extensions.clone(),
        ),
        workdir,
        Arc::new(SubprocessAnalyzer::from_config(&config.analysis)),
        CsvProjector::new(results.clone()),
    );

    Arc::new(AppState { pipeline, results })
}
