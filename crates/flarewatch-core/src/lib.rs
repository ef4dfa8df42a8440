//! Flarewatch Core Library
//!
//! This crate provides the domain models, error types, and configuration
//! shared by the storage, processing, and API crates.

pub mod config;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use config::{command_line, AnalysisConfig, BaseConfig, Config};
pub use error::{AppError, BoxError, ErrorMetadata, LogLevel};
pub use models::{AnalysisOutput, Cell, DetectedFlares, FlareField, LcRecord};
