//! CSV projection of the detection matrix
//!
//! One header line, then one line per detected event with the nine fields in
//! `FlareField` order. Numbers use fixed 8-decimal notation and text cells are
//! written as-is. A missing cell becomes an empty field so every data line has
//! exactly nine fields.

use flarewatch_core::{Cell, DetectedFlares, FlareField};
use flarewatch_storage::{Storage, StorageError};
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

pub const CSV_HEADER: &str =
    "flare_type,start,precise_start,start_rate,peak,peak_rate,background_level,decay,decay_rate";

/// Storage key of the most recent result
pub const LATEST_RESULT_KEY: &str = "result.csv";

/// Storage key of the result for one run
pub fn result_key(result_id: &Uuid) -> String {
    format!("results/{}.csv", result_id)
}

fn format_cell(cell: &Cell) -> String {
    match cell {
        Cell::Number(value) => value
            .as_f64()
            .map(|value| format!("{:.8}", value))
            .unwrap_or_else(|| value.to_string()),
        Cell::Text(text) => text.clone(),
    }
}

pub fn render_csv(flares: &DetectedFlares) -> String {
    let mut csv = String::with_capacity(CSV_HEADER.len() + 1 + flares.event_count() * 128);
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for event in 0..flares.event_count() {
        let line = FlareField::ALL
            .iter()
            .map(|field| flares.cell(*field, event).map(format_cell).unwrap_or_default())
            .collect::<Vec<_>>()
            .join(",");
        csv.push_str(&line);
        csv.push('\n');
    }

    csv
}

/// A result CSV that was written successfully
#[derive(Debug, Clone)]
pub struct CsvArtifact {
    pub result_id: Uuid,
    pub path: PathBuf,
    pub latest_path: PathBuf,
    pub size_bytes: usize,
    pub event_count: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum CsvError {
    /// Nothing was written for this run
    #[error("Failed to write result CSV")]
    Run(#[source] StorageError),

    /// The per-run CSV exists, but `result.csv` still holds an older result
    #[error("Result {result_id} was saved but the latest result was not replaced")]
    Latest {
        result_id: Uuid,
        #[source]
        source: StorageError,
    },
}

impl CsvError {
    /// Id of the per-run CSV, if it was written before the failure
    pub fn saved_result_id(&self) -> Option<Uuid> {
        match self {
            CsvError::Run(_) => None,
            CsvError::Latest { result_id, .. } => Some(*result_id),
        }
    }
}

/// Writes result CSVs into the output storage
#[derive(Clone)]
pub struct CsvProjector {
    storage: Arc<dyn Storage>,
}

impl CsvProjector {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Write the per-run artifact, then replace the latest result with the same bytes.
    pub async fn write(
        &self,
        result_id: Uuid,
        flares: &DetectedFlares,
    ) -> Result<CsvArtifact, CsvError> {
        let csv = render_csv(flares).into_bytes();
        let size_bytes = csv.len();

        let path = self
            .storage
            .put(&result_key(&result_id), csv.clone())
            .await
            .map_err(CsvError::Run)?;
        let latest_path = self
            .storage
            .put(LATEST_RESULT_KEY, csv)
            .await
            .map_err(|source| CsvError::Latest { result_id, source })?;

        Ok(CsvArtifact {
            result_id,
            path,
            latest_path,
            size_bytes,
            event_count: flares.event_count(),
        })
    }
}
