//! Error types for the fitbench-learning crate.
//!
//! This module defines [`LearningError`], the error type returned by the
//! model selection API. Preprocessing failures are wrapped unchanged so their
//! error codes survive up to the binary.
//!
//! # Example
//!
//! ```rust,ignore
//! use fitbench_learning::{LearningError, ModelSelectionConfig};
//!
//! fn configure() -> Result<(), LearningError> {
//!     let config = ModelSelectionConfig::builder()
//!         .dataset("data.csv")
//!         .split_test_size(0.25)
//!         .build()?;
//!     Ok(())
//! }
//! ```

use crate::config::ConfigValidationError;
use fitbench_processing::PreprocessingError;
use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for model selection.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LearningError {
    /// Invalid configuration provided to the model selection.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Data that cannot be turned into a feature matrix or target vector.
    ///
    /// Common causes:
    /// - nulls left in the target column
    /// - a dependent variable resolving to several columns
    /// - no rows left after deleting missing values
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// The dependent column was also selected as an independent column.
    #[error("Dependent variable column cannot be part of independent variables columns")]
    DependentColumnConflict,

    /// A row typed for prediction has the wrong number of values.
    #[error("Invalid independent variables set to predict : [{values}], expected {expected} elements")]
    InvalidPredictionArity { values: String, expected: usize },

    /// A row typed for prediction holds a value the fitted encoding rejects.
    #[error("Invalid value to predict : {0}")]
    InvalidPredictionValue(String),

    /// `predict_only` or `show_predictions_for` named an unknown model.
    #[error("Invalid {kind} code for prediction : '{code}', expected codes [{expected}]")]
    InvalidModelCode {
        kind: &'static str,
        code: String,
        expected: String,
    },

    /// `predict` was called before `fit`.
    #[error("Model is not fitted: {0}")]
    NotFitted(&'static str),

    /// An estimator could not be fitted.
    #[error("Training of {model} failed: {reason}")]
    TrainingFailed { model: String, reason: String },

    /// Error raised while preprocessing the dataset.
    #[error(transparent)]
    Preprocessing(#[from] PreprocessingError),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LearningError>,
    },
}

impl LearningError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LearningError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable output.
    ///
    /// Preprocessing errors keep their own code.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidData(_) => "INVALID_DATA",
            Self::DependentColumnConflict => "DEPENDENT_COLUMN_CONFLICT",
            Self::InvalidPredictionArity { .. } => "INVALID_PREDICTION_ARITY",
            Self::InvalidPredictionValue(_) => "INVALID_PREDICTION_VALUE",
            Self::InvalidModelCode { .. } => "INVALID_MODEL_CODE",
            Self::NotFitted(_) => "MODEL_NOT_FITTED",
            Self::TrainingFailed { .. } => "TRAINING_FAILED",
            Self::Preprocessing(e) => e.error_code(),
            Self::Polars(_) => "POLARS_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error comes from user input that can be corrected and retried.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::InvalidConfig(_)
            | Self::DependentColumnConflict
            | Self::InvalidPredictionArity { .. }
            | Self::InvalidPredictionValue(_)
            | Self::InvalidModelCode { .. } => true,
            Self::Preprocessing(e) => e.is_recoverable(),
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

impl From<ConfigValidationError> for LearningError {
    fn from(err: ConfigValidationError) -> Self {
        LearningError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for LearningError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("LearningError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for model selection operations.
pub type Result<T> = std::result::Result<T, LearningError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<LearningError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
