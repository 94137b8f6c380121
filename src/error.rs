//! Error types for the bank-reviews library.
//!
//! This module provides custom error types using `thiserror` so each pipeline
//! stage can report the failure class it hit (database, file, taxonomy, ...).

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while running the review analysis pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Input file does not exist
    #[error("Input file not found at {}", .0.display())]
    InputNotFound(PathBuf),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading/writing errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid theme taxonomy
    #[error("Invalid theme taxonomy: {0}")]
    Taxonomy(String),

    /// Vectorizer could not build a vocabulary
    #[error("Vectorizer error: {0}")]
    Vectorizer(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization/deserialization errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// General error with context
    #[error("{0}")]
    Other(String),
}

impl PipelineError {
    /// True for errors raised by the relational store.
    #[must_use]
    pub const fn is_database(&self) -> bool {
        matches!(self, Self::Database(_))
    }
}

/// Convenience type alias for Result with `PipelineError`
pub type Result<T> = std::result::Result<T, PipelineError>;

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
