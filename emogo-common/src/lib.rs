//! # EmoGo Common Library
//!
//! Shared code for the EmoGo export service:
//! - Persisted sample model (`Sample`, `StoredValue`)
//! - Database connection, schema and the `SampleRepository` seam
//! - Configuration loading
//! - Error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{Sample, StoredValue};
