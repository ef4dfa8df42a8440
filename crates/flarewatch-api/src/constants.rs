//! Header names and fixed response texts

/// Id of the per-run CSV artifact, present when it was written
pub const RESULT_ID_HEADER: &str = "x-result-id";

/// `written` or `failed`
pub const RESULT_CSV_HEADER: &str = "x-result-csv";

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub const WELCOME_MESSAGE: &str = "Welcome to the Flarewatch solar flare detection backend";
