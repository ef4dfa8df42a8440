//! Upload-to-result pipeline
//!
//! One run validates the upload, stores it in the working directory, runs the
//! analysis program on it, parses the output and projects it to CSV. The
//! working file and `result.csv` are shared between requests, so the steps
//! from storing to writing the CSV run under a single lock.

use crate::analysis::{AnalysisError, Analyzer};
use crate::csv::{CsvArtifact, CsvError, CsvProjector};
use crate::result::{parse_analysis_output, ResultParseError};
use crate::validator::{canonical_filename, UploadValidator, ValidationError};
use bytes::Bytes;
use flarewatch_core::AnalysisOutput;
use flarewatch_storage::{Storage, StorageError};
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A file received from the client
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub data: Bytes,
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Parse(#[from] ResultParseError),
}

/// Result of a successful run.
///
/// A CSV failure does not fail the run: the parsed output is still returned
/// and `csv` carries the error.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub output: AnalysisOutput,
    pub csv: Result<CsvArtifact, CsvError>,
}

pub struct AnalysisPipeline {
    validator: UploadValidator,
    workdir: Arc<dyn Storage>,
    analyzer: Arc<dyn Analyzer>,
    projector: CsvProjector,
    lock: Mutex<()>,
}

impl AnalysisPipeline {
    pub fn new(
        validator: UploadValidator,
        workdir: Arc<dyn Storage>,
        analyzer: Arc<dyn Analyzer>,
        projector: CsvProjector,
    ) -> Self {
        Self {
            validator,
            workdir,
            analyzer,
            projector,
            lock: Mutex::new(()),
        }
    }

    #[tracing::instrument(
        skip(self, upload),
        fields(filename = %upload.filename, size_bytes = upload.data.len(), result_id = %result_id)
    )]
    pub async fn run(
        &self,
        upload: UploadedFile,
        result_id: Uuid,
    ) -> Result<PipelineOutcome, PipelineError> {
        let extension = self
            .validator
            .validate(&upload.filename, upload.data.len())?;
        let storage_key = canonical_filename(extension);

        let _guard = self.lock.lock().await;

        let stored_path = self.workdir.put(&storage_key, upload.data.to_vec()).await?;

        let stdout = self.analyzer.analyze(&stored_path).await?;
        let output = parse_analysis_output(&stdout)?;

        let csv = self
            .projector
            .write(result_id, &output.detected_flares)
            .await;

        match &csv {
            Ok(artifact) => tracing::info!(
                events = artifact.event_count,
                csv_path = %artifact.path.display(),
                "Analysis result saved"
            ),
            Err(e) => tracing::error!(error = %e, "Failed to save result to CSV"),
        }

        Ok(PipelineOutcome { output, csv })
    }

    pub fn analyzer(&self) -> &Arc<dyn Analyzer> {
        &self.analyzer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::csv::{CSV_HEADER, LATEST_RESULT_KEY};
    use async_trait::async_trait;
    use flarewatch_storage::LocalStorage;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    const SCENARIO: &str = r#"{"detected_flares":[["C"],[0.1],[0.15],[1.2],[0.5],[0.05],[0.01],[0.9],[0.02]],"lc_data":[]}"#;

    /// Replays a fixed stdout and records what it was asked to analyze
    struct CannedAnalyzer {
        stdout: Result<Vec<u8>, fn() -> AnalysisError>,
        inputs: std::sync::Mutex<Vec<PathBuf>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl CannedAnalyzer {
        fn ok(stdout: &str) -> Self {
            Self::with(Ok(stdout.as_bytes().to_vec()))
        }

        fn failing(err: fn() -> AnalysisError) -> Self {
            Self::with(Err(err))
        }

        fn with(stdout: Result<Vec<u8>, fn() -> AnalysisError>) -> Self {
            Self {
                stdout,
                inputs: std::sync::Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Analyzer for CannedAnalyzer {
        async fn analyze(&self, input: &Path) -> Result<Vec<u8>, AnalysisError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(input.to_path_buf());
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match &self.stdout {
                Ok(stdout) => Ok(stdout.clone()),
                Err(make) => Err(make()),
            }
        }

        fn describe(&self) -> String {
            "canned".to_string()
        }
    }

    struct Fixture {
        dir: TempDir,
        analyzer: Arc<CannedAnalyzer>,
        pipeline: AnalysisPipeline,
    }

    impl Fixture {
        fn new(analyzer: CannedAnalyzer) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let analyzer = Arc::new(analyzer);
            let pipeline = AnalysisPipeline::new(
                UploadValidator::new(
                    1024,
                    vec![".fits".to_string(), ".csv".to_string(), ".lc".to_string()],
                ),
                Arc::new(LocalStorage::new(dir.path().join("data"))),
                analyzer.clone(),
                CsvProjector::new(Arc::new(LocalStorage::new(dir.path().join("output")))),
            );
            Self {
                dir,
                analyzer,
                pipeline,
            }
        }

        fn latest_csv(&self) -> Option<String> {
            std::fs::read_to_string(self.dir.path().join("output").join(LATEST_RESULT_KEY)).ok()
        }
    }

    fn upload(filename: &str) -> UploadedFile {
        UploadedFile {
            filename: filename.to_string(),
            data: Bytes::from_static(b"TIME,RATE\n0.0,1.0\n"),
        }
    }

    #[tokio::test]
    async fn test_run_stores_analyzes_and_projects() {
        let fixture = Fixture::new(CannedAnalyzer::ok(SCENARIO));
        let id = Uuid::new_v4();

        let outcome = fixture.pipeline.run(upload("sample.lc"), id).await.unwrap();

        let stored = fixture.dir.path().join("data").join("file.lc");
        assert_eq!(*fixture.analyzer.inputs.lock().unwrap(), vec![stored.clone()]);
        assert_eq!(std::fs::read(&stored).unwrap(), b"TIME,RATE\n0.0,1.0\n");

        assert_eq!(outcome.output.detected_flares.event_count(), 1);
        let artifact = outcome.csv.unwrap();
        assert_eq!(artifact.result_id, id);
        assert_eq!(
            fixture.latest_csv().unwrap(),
            format!(
                "{}\nC,0.10000000,0.15000000,1.20000000,0.50000000,0.05000000,0.01000000,0.90000000,0.02000000\n",
                CSV_HEADER
            )
        );
    }

    #[tokio::test]
    async fn test_rejected_extension_writes_nothing() {
        let fixture = Fixture::new(CannedAnalyzer::ok(SCENARIO));

        let err = fixture
            .pipeline
            .run(upload("image.png"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            PipelineError::Validation(ValidationError::InvalidFileType { .. })
        ));
        assert!(!fixture.dir.path().join("data").exists());
        assert!(fixture.analyzer.inputs.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_analysis_failure_skips_csv() {
        let fixture = Fixture::new(CannedAnalyzer::failing(|| AnalysisError::Io {
            stage: crate::analysis::InvocationStage::Spawned,
            source: std::io::Error::other("boom"),
        }));

        let err = fixture
            .pipeline
            .run(upload("sample.fits"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Analysis(_)));
        assert!(fixture.latest_csv().is_none());
    }

    #[tokio::test]
    async fn test_malformed_output_keeps_prior_csv() {
        let fixture = Fixture::new(CannedAnalyzer::ok("{not json"));
        let output_dir = fixture.dir.path().join("output");
        std::fs::create_dir_all(&output_dir).unwrap();
        std::fs::write(output_dir.join(LATEST_RESULT_KEY), "previous\n").unwrap();

        let err = fixture
            .pipeline
            .run(upload("sample.csv"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Parse(_)));
        assert_eq!(fixture.latest_csv().unwrap(), "previous\n");
    }

    #[tokio::test]
    async fn test_csv_failure_still_returns_output() {
        let fixture = Fixture::new(CannedAnalyzer::ok(SCENARIO));
        std::fs::write(fixture.dir.path().join("output"), b"file in the way").unwrap();

        let outcome = fixture
            .pipeline
            .run(upload("sample.lc"), Uuid::new_v4())
            .await
            .unwrap();

        assert!(outcome.csv.is_err());
        assert_eq!(outcome.output.detected_flares.row_count(), 9);
    }

    #[tokio::test]
    async fn test_concurrent_runs_are_serialized() {
        let fixture = Arc::new(Fixture::new(CannedAnalyzer::ok(SCENARIO)));

        let runs: Vec<_> = (0..4)
            .map(|_| {
                let fixture = fixture.clone();
                tokio::spawn(async move {
                    fixture
                        .pipeline
                        .run(upload("sample.lc"), Uuid::new_v4())
                        .await
                })
            })
            .collect();

        for run in runs {
            assert!(run.await.unwrap().is_ok());
        }

        assert_eq!(fixture.analyzer.max_in_flight.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.analyzer.inputs.lock().unwrap().len(), 4);
    }
}
