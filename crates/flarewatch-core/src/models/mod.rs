//! Domain models

pub mod flare;

pub use flare::{AnalysisOutput, Cell, DetectedFlares, FlareField, LcRecord};
