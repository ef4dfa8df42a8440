//! Application state shared by all handlers

use flarewatch_processing::AnalysisPipeline;
use flarewatch_storage::Storage;
use std::sync::Arc;

pub struct AppState {
    pub pipeline: AnalysisPipeline,
    /// Output directory holding `result.csv` and `results/<id>.csv`
    pub results: Arc<dyn Storage>,
}
