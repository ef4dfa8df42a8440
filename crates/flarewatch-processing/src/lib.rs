//! Flarewatch Processing Library
//!
//! Everything between an accepted upload and a finished result: upload
//! validation, the external analysis program, output parsing, and the CSV
//! projection of detected flares.

pub mod analysis;
pub mod csv;
pub mod pipeline;
pub mod result;
pub mod validator;

pub use analysis::{AnalysisError, Analyzer, InvocationStage, SubprocessAnalyzer};
pub use csv::{
    render_csv, result_key, CsvArtifact, CsvError, CsvProjector, CSV_HEADER, LATEST_RESULT_KEY,
};
pub use pipeline::{AnalysisPipeline, PipelineError, PipelineOutcome, UploadedFile};
pub use result::{parse_analysis_output, ResultParseError};
pub use validator::{canonical_filename, file_extension, UploadValidator, ValidationError};
