//! Configuration types for dataset preprocessing.
//!
//! This module provides [`PreprocessingConfig`] using the builder pattern.
//! Column specific strategies are kept as raw `"columns -> CODE"` definitions
//! because they can only be resolved once the dataset headers are known.

use crate::error::{PreprocessingError, Result};
use crate::strategies::{EncodingStrategy, ImputationStrategy, StrategyCode, codes_list};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default separator between the two ends of a columns interval.
pub const DEFAULT_COLUMNS_INTERVAL_SEPARATOR: &str = "-";

/// Configuration for missing data imputation and categorical encoding.
///
/// Use [`PreprocessingConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use fitbench_processing::{PreprocessingConfig, ImputationStrategy, EncodingStrategy};
///
/// let config = PreprocessingConfig::builder()
///     .default_numerical_imputation(ImputationStrategy::Knn)
///     .numerical_imputation("col1 col2 -> MEAN")
///     .default_encoding(EncodingStrategy::OneHot)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreprocessingConfig {
    /// Separator between the inbound and outbound columns of an interval.
    /// Default: "-"
    pub columns_interval_separator: String,

    /// Imputation applied to numerical columns without a specific strategy.
    /// Default: MEAN
    pub default_numerical_imputation: ImputationStrategy,

    /// Specific numerical imputations, e.g. `"col1 col2 -> MEAN"`.
    pub numerical_imputation: Vec<String>,

    /// Imputation applied to categorical columns without a specific strategy.
    /// Default: FREQUENT
    pub default_categorical_imputation: ImputationStrategy,

    /// Specific categorical imputations, e.g. `"0 2 -> FREQUENT"`.
    pub categorical_imputation: Vec<String>,

    /// Encoding applied to categorical columns without a specific strategy.
    /// Default: BINARY
    pub default_encoding: EncodingStrategy,

    /// Specific encodings, e.g. `"0 2 -> ONEHOT"`.
    pub categorical_encoding: Vec<String>,

    /// Whether to hide the imputation and encoding detail tables.
    /// Default: false
    pub skip_preprocessing_details: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            columns_interval_separator: DEFAULT_COLUMNS_INTERVAL_SEPARATOR.to_string(),
            default_numerical_imputation: ImputationStrategy::Mean,
            numerical_imputation: Vec::new(),
            default_categorical_imputation: ImputationStrategy::MostFrequent,
            categorical_imputation: Vec::new(),
            default_encoding: EncodingStrategy::default(),
            categorical_encoding: Vec::new(),
            skip_preprocessing_details: false,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PreprocessingConfigBuilder {
        PreprocessingConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config
            .validate()
            .map_err(|e| PreprocessingError::InvalidConfig(e.to_string()))?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        validate_separator(&self.columns_interval_separator)?;

        if !ImputationStrategy::NUMERICAL.contains(&self.default_numerical_imputation) {
            return Err(ConfigValidationError::InvalidStrategy {
                field: "default_numerical_imputation".to_string(),
                code: self.default_numerical_imputation.code().to_string(),
                expected: codes_list(ImputationStrategy::NUMERICAL),
            });
        }

        if !ImputationStrategy::CATEGORICAL.contains(&self.default_categorical_imputation) {
            return Err(ConfigValidationError::InvalidStrategy {
                field: "default_categorical_imputation".to_string(),
                code: self.default_categorical_imputation.code().to_string(),
                expected: codes_list(ImputationStrategy::CATEGORICAL),
            });
        }

        Ok(())
    }
}

/// Check a columns interval separator.
pub fn validate_separator(separator: &str) -> std::result::Result<(), ConfigValidationError> {
    if separator.is_empty()
        || separator.chars().any(char::is_whitespace)
        || separator.contains("->")
        || separator == "*"
    {
        return Err(ConfigValidationError::InvalidSeparator(separator.to_string()));
    }
    Ok(())
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid columns interval separator '{0}' (must be non-empty, without whitespace, '->' or '*')")]
    InvalidSeparator(String),

    #[error("Invalid strategy for '{field}': {code} (expected one of {expected})")]
    InvalidStrategy {
        field: String,
        code: String,
        expected: String,
    },
}

/// Builder for [`PreprocessingConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PreprocessingConfigBuilder {
    columns_interval_separator: Option<String>,
    default_numerical_imputation: Option<ImputationStrategy>,
    numerical_imputation: Vec<String>,
    default_categorical_imputation: Option<ImputationStrategy>,
    categorical_imputation: Vec<String>,
    default_encoding: Option<EncodingStrategy>,
    categorical_encoding: Vec<String>,
    skip_preprocessing_details: Option<bool>,
}

impl PreprocessingConfigBuilder {
    /// Set the columns interval separator.
    pub fn columns_interval_separator(mut self, separator: impl Into<String>) -> Self {
        self.columns_interval_separator = Some(separator.into());
        self
    }

    /// Set the default numerical imputation strategy.
    pub fn default_numerical_imputation(mut self, strategy: ImputationStrategy) -> Self {
        self.default_numerical_imputation = Some(strategy);
        self
    }

    /// Add a specific numerical imputation definition (`"cols -> CODE"`).
    pub fn numerical_imputation(mut self, definition: impl Into<String>) -> Self {
        self.numerical_imputation.push(definition.into());
        self
    }

    /// Set the default categorical imputation strategy.
    pub fn default_categorical_imputation(mut self, strategy: ImputationStrategy) -> Self {
        self.default_categorical_imputation = Some(strategy);
        self
    }

    /// Add a specific categorical imputation definition (`"cols -> CODE"`).
    pub fn categorical_imputation(mut self, definition: impl Into<String>) -> Self {
        self.categorical_imputation.push(definition.into());
        self
    }

    /// Set the default categorical encoding.
    pub fn default_encoding(mut self, strategy: EncodingStrategy) -> Self {
        self.default_encoding = Some(strategy);
        self
    }

    /// Add a specific encoding definition (`"cols -> CODE"`).
    pub fn categorical_encoding(mut self, definition: impl Into<String>) -> Self {
        self.categorical_encoding.push(definition.into());
        self
    }

    /// Hide or show the imputation and encoding detail tables.
    pub fn skip_preprocessing_details(mut self, skip: bool) -> Self {
        self.skip_preprocessing_details = Some(skip);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PreprocessingConfig` or an error if validation fails.
    pub fn build(self) -> std::result::Result<PreprocessingConfig, ConfigValidationError> {
        let defaults = PreprocessingConfig::default();
        let config = PreprocessingConfig {
            columns_interval_separator: self
                .columns_interval_separator
                .unwrap_or(defaults.columns_interval_separator),
            default_numerical_imputation: self
                .default_numerical_imputation
                .unwrap_or(defaults.default_numerical_imputation),
            numerical_imputation: self.numerical_imputation,
            default_categorical_imputation: self
                .default_categorical_imputation
                .unwrap_or(defaults.default_categorical_imputation),
            categorical_imputation: self.categorical_imputation,
            default_encoding: self.default_encoding.unwrap_or(defaults.default_encoding),
            categorical_encoding: self.categorical_encoding,
            skip_preprocessing_details: self.skip_preprocessing_details.unwrap_or(false),
        };

        config.validate()?;
        Ok(config)
    }
}
