//! Custom error types for dataset preprocessing.
//!
//! This module provides the error hierarchy using `thiserror` for column
//! selection, strategy resolution, imputation and encoding.
//!
//! Errors are serializable as `{code, message}` so the binaries can emit them
//! in a machine-readable form.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for dataset preprocessing.
#[derive(Error, Debug)]
pub enum PreprocessingError {
    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A column token could not be resolved against the dataset headers.
    #[error(
        "Invalid columns interval definition : {token}, with the separator '{separator}', expected one inbound and one outbound inclusive intervals"
    )]
    InvalidColumnsInterval { token: String, separator: String },

    /// `*` was used where all-columns selection is forbidden.
    #[error("It's not allowed to select all the columns with '*'")]
    AllColumnsNotAllowed,

    /// An operation definition without the `->` leading symbol.
    #[error("Invalid operation definition {definition}. {examples}")]
    InvalidOperationDefinition { definition: String, examples: String },

    /// A strategy declaration carrying zero or several codes.
    #[error("Invalid code declaration : {0}. Expected only one code.")]
    InvalidCodeDeclaration(String),

    /// An unknown imputation or encoding code.
    #[error("Invalid code : {code}, expected one of these codes : {expected}")]
    InvalidStrategyCode { code: String, expected: String },

    /// The same column declared for several strategies.
    #[error("Duplicated columns : {0}.")]
    DuplicatedColumns(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No valid values found in a column for computation.
    #[error("No valid values found in column '{0}'")]
    NoValidValues(String),

    /// Imputation failed.
    #[error("Failed to impute missing values in column '{column}': {reason}")]
    ImputationFailed { column: String, reason: String },

    /// Encoding met a category it was not fitted on.
    #[error("Unknown category '{value}' in column '{column}'")]
    UnknownCategory { column: String, value: String },

    /// A cell operation could not be parsed.
    #[error("Invalid operation '{0}'")]
    InvalidOperation(String),

    /// A matrix does not have the number of features a transformer was fitted on.
    #[error("Expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An error wrapped under a description of the failed step.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PreprocessingError>,
    },
}

impl PreprocessingError {
    /// Wrap the error under a message describing what was being done.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PreprocessingError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine-readable output.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidColumnsInterval { .. } => "INVALID_COLUMNS_INTERVAL",
            Self::AllColumnsNotAllowed => "ALL_COLUMNS_NOT_ALLOWED",
            Self::InvalidOperationDefinition { .. } => "INVALID_OPERATION_DEFINITION",
            Self::InvalidCodeDeclaration(_) => "INVALID_CODE_DECLARATION",
            Self::InvalidStrategyCode { .. } => "INVALID_STRATEGY_CODE",
            Self::DuplicatedColumns(_) => "DUPLICATED_COLUMNS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::NoValidValues(_) => "NO_VALID_VALUES",
            Self::ImputationFailed { .. } => "IMPUTATION_FAILED",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::InvalidOperation(_) => "INVALID_OPERATION",
            Self::ShapeMismatch { .. } => "SHAPE_MISMATCH",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error comes from user input that can be corrected and retried.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::WithContext { source, .. } => source.is_recoverable(),
            Self::ColumnNotFound(_)
            | Self::InvalidColumnsInterval { .. }
            | Self::AllColumnsNotAllowed
            | Self::InvalidOperationDefinition { .. }
            | Self::InvalidCodeDeclaration(_)
            | Self::InvalidStrategyCode { .. }
            | Self::DuplicatedColumns(_)
            | Self::InvalidConfig(_)
            | Self::UnknownCategory { .. }
            | Self::InvalidOperation(_) => true,
            _ => false,
        }
    }
}

/// Serialized as `{"code": ..., "message": ...}`.
impl Serialize for PreprocessingError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PreprocessingError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

pub type Result<T> = std::result::Result<T, PreprocessingError>;

/// `.context(..)` on any result whose error converts into a [`PreprocessingError`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<PreprocessingError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}
