use flarewatch_core::AnalysisOutput;

#[derive(Debug, thiserror::Error)]
pub enum ResultParseError {
    #[error("Analysis program produced no output")]
    Empty,

    #[error("Analysis output is not a valid result document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode the complete stdout of one analysis run.
///
/// The document must be a JSON object with exactly `detected_flares` and
/// `lc_data`. Anything else, including trailing data, is rejected as a whole.
pub fn parse_analysis_output(stdout: &[u8]) -> Result<AnalysisOutput, ResultParseError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Err(ResultParseError::Empty);
    }
    Ok(serde_json::from_slice(stdout)?)
}
