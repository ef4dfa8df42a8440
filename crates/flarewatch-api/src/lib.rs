//! Flarewatch API Library
//!
//! HTTP surface for uploading light curves and fetching flare detection
//! results: handlers, middleware, telemetry and application setup.

pub mod constants;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod setup;
pub mod state;
pub mod telemetry;
mod utils;

pub use error::HttpAppError;
pub use state::AppState;
