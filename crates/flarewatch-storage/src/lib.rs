//! Flarewatch Storage Library
//!
//! Storage abstraction for the working directory (uploaded light curves) and
//! the output directory (CSV results).
//!
//! # Storage key format
//!
//! Keys are relative paths inside the storage root, e.g. `file.lc` or
//! `results/<id>.csv`. Keys must not be empty, absolute, or contain `..`.

pub mod local;
pub mod traits;

pub use local::LocalStorage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
