//! Flare detection result model
//!
//! The analysis program reports detections as a column-major matrix: each row
//! holds one field (flare class, start time, peak rate, ...) and each column
//! is one detected event.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One free-form light-curve sample as emitted by the analysis program
pub type LcRecord = serde_json::Map<String, serde_json::Value>;

/// A single matrix cell: either a numeric measurement or a text label.
///
/// Numbers keep their JSON representation, so an integer `3` is echoed back
/// as `3` rather than `3.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(serde_json::Number),
    Text(String),
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Number(value.into())
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

/// Positional meaning of each matrix row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlareField {
    FlareType,
    Start,
    PreciseStart,
    StartRate,
    Peak,
    PeakRate,
    BackgroundLevel,
    Decay,
    DecayRate,
}

impl FlareField {
    /// All fields in row order
    pub const ALL: [FlareField; 9] = [
        FlareField::FlareType,
        FlareField::Start,
        FlareField::PreciseStart,
        FlareField::StartRate,
        FlareField::Peak,
        FlareField::PeakRate,
        FlareField::BackgroundLevel,
        FlareField::Decay,
        FlareField::DecayRate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlareField::FlareType => "flare_type",
            FlareField::Start => "start",
            FlareField::PreciseStart => "precise_start",
            FlareField::StartRate => "start_rate",
            FlareField::Peak => "peak",
            FlareField::PeakRate => "peak_rate",
            FlareField::BackgroundLevel => "background_level",
            FlareField::Decay => "decay",
            FlareField::DecayRate => "decay_rate",
        }
    }

    /// Row index of this field in the detection matrix
    pub fn row_index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FlareField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Detection matrix, rows indexed by `FlareField`, columns by event.
///
/// The matrix may be ragged: fewer than nine rows, or rows shorter than the
/// first one. Lookups outside the populated area return `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DetectedFlares(pub Vec<Vec<Cell>>);

impl DetectedFlares {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self(rows)
    }

    /// Number of detected events, taken from the length of the first row
    pub fn event_count(&self) -> usize {
        self.0.first().map_or(0, Vec::len)
    }

    pub fn row_count(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_count() == 0
    }

    pub fn cell(&self, field: FlareField, event: usize) -> Option<&Cell> {
        self.0.get(field.row_index()).and_then(|row| row.get(event))
    }
}

/// Complete structured output of one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalysisOutput {
    pub detected_flares: DetectedFlares,
    pub lc_data: Vec<LcRecord>,
}
