//! Error types for the food pipeline
//!
//! Every error carries enough context to tell which variant or which input
//! batch was at fault.

use crate::food::FoodVariant;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or ambiguous field metadata for a variant
    #[error("Schema error: {0}")]
    Schema(String),

    /// Empty or inconsistent input batch
    #[error("Data integrity error: {0}")]
    DataIntegrity(String),

    /// Prediction requested for a variant with no trained model
    #[error("Unknown variant: no model trained for {0}")]
    UnknownVariant(FoodVariant),

    /// Underlying fit/evaluate step failed
    #[error("Training failed for {variant}: {reason}")]
    TrainingFailure {
        /// Variant whose pass failed
        variant: FoodVariant,
        /// Human-readable cause
        reason: String,
    },

    /// Invalid pipeline configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Storage error (record files, Parquet snapshots)
    #[error("Storage error: {0}")]
    StorageError(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Build a [`Error::TrainingFailure`] for `variant`.
    pub fn training(variant: FoodVariant, reason: impl Into<String>) -> Self {
        Self::TrainingFailure {
            variant,
            reason: reason.into(),
        }
    }
}
