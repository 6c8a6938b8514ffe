//! Configuration types for model selection.
//!
//! This module provides [`ModelSelectionConfig`] and its builder. Column
//! definitions are kept as raw tokens because they are resolved against the
//! dataset headers at load time.
//!
//! # Example
//!
//! ```
//! use fitbench_learning::ModelSelectionConfig;
//!
//! let config = ModelSelectionConfig::builder()
//!     .dataset("data.csv")
//!     .dependent_variable_column("Purchased")
//!     .split_test_size(0.25)
//!     .build()
//!     .expect("valid config");
//! assert_eq!(config.split_random_state, 0);
//! ```

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default dependent column token: the last column.
pub const DEFAULT_DEPENDENT_VARIABLE_COLUMN: &str = "-1";

/// Configuration of a classification or regression model selection.
///
/// Use [`ModelSelectionConfig::builder()`] to construct a configuration.
///
/// # Validation
///
/// [`build()`](ModelSelectionConfigBuilder::build) checks that:
/// - `split_test_size` lies in `(0.0, 1.0)` (exclusive)
/// - `dependent_variable_column` is a single non-empty token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelectionConfig {
    /// Path to the CSV dataset.
    pub dataset: PathBuf,

    /// Column token of the dependent variable (default: `-1`).
    pub dependent_variable_column: String,

    /// Column tokens of the independent variables.
    ///
    /// Empty means every column except the last one.
    pub independent_variables_columns: Vec<String>,

    /// Fraction of rows held out for scoring (default: 0.2).
    pub split_test_size: f64,

    /// Seed of the train/test shuffle and of the random forests (default: 0).
    pub split_random_state: u64,

    /// Standard-scale the target of the support vector regressor (default: false).
    pub feature_scale_dependent_variables: bool,

    /// Rows of independent values to predict with the fitted models.
    pub predict: Vec<Vec<String>>,

    /// Model codes whose predictions are printed. `None` means every model.
    pub predict_only: Option<Vec<String>>,

    /// Model codes whose test set predictions are compared to the real values.
    pub show_predictions_for: Option<Vec<String>>,

    /// Number of test rows shown in a comparison table (default: 10).
    pub nb_prediction_lines_to_show: usize,
}

impl Default for ModelSelectionConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::new(),
            dependent_variable_column: DEFAULT_DEPENDENT_VARIABLE_COLUMN.to_string(),
            independent_variables_columns: Vec::new(),
            split_test_size: 0.2,
            split_random_state: 0,
            feature_scale_dependent_variables: false,
            predict: Vec::new(),
            predict_only: None,
            show_predictions_for: None,
            nb_prediction_lines_to_show: 10,
        }
    }
}

impl ModelSelectionConfig {
    /// Create a new builder for `ModelSelectionConfig`.
    pub fn builder() -> ModelSelectionConfigBuilder {
        ModelSelectionConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails [`validate()`](Self::validate).
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] when a value is out of range.
    pub fn validate(&self) -> std::result::Result<(), ConfigValidationError> {
        if !(self.split_test_size > 0.0 && self.split_test_size < 1.0) {
            return Err(ConfigValidationError::InvalidTestSize(self.split_test_size));
        }

        let dependent = self.dependent_variable_column.trim();
        if dependent.is_empty() || dependent.split_whitespace().count() > 1 {
            return Err(ConfigValidationError::InvalidDependentColumn(
                self.dependent_variable_column.clone(),
            ));
        }

        if self.predict.iter().any(Vec::is_empty) {
            return Err(ConfigValidationError::EmptyPredictionRow);
        }

        Ok(())
    }

    /// Whether test set predictions are compared for at least one model.
    pub fn shows_comparisons(&self) -> bool {
        self.show_predictions_for
            .as_ref()
            .is_some_and(|codes| !codes.is_empty())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("split_test_size must be between 0 and 1 (exclusive), got {0}")]
    InvalidTestSize(f64),

    #[error("dependent_variable_column must be a single column token, got '{0}'")]
    InvalidDependentColumn(String),

    #[error("prediction rows cannot be empty")]
    EmptyPredictionRow,
}

/// Builder for [`ModelSelectionConfig`].
#[derive(Debug, Default)]
pub struct ModelSelectionConfigBuilder {
    dataset: Option<PathBuf>,
    dependent_variable_column: Option<String>,
    independent_variables_columns: Vec<String>,
    split_test_size: Option<f64>,
    split_random_state: Option<u64>,
    feature_scale_dependent_variables: Option<bool>,
    predict: Vec<Vec<String>>,
    predict_only: Option<Vec<String>>,
    show_predictions_for: Option<Vec<String>>,
    nb_prediction_lines_to_show: Option<usize>,
}

impl ModelSelectionConfigBuilder {
    /// Set the dataset path.
    #[must_use]
    pub fn dataset(mut self, path: impl Into<PathBuf>) -> Self {
        self.dataset = Some(path.into());
        self
    }

    /// Set the dependent column token.
    #[must_use]
    pub fn dependent_variable_column(mut self, token: impl Into<String>) -> Self {
        self.dependent_variable_column = Some(token.into());
        self
    }

    /// Add independent column tokens.
    #[must_use]
    pub fn independent_variables_columns<S: Into<String>>(
        mut self,
        tokens: impl IntoIterator<Item = S>,
    ) -> Self {
        self.independent_variables_columns
            .extend(tokens.into_iter().map(Into::into));
        self
    }

    /// Set the test set fraction.
    #[must_use]
    pub fn split_test_size(mut self, size: f64) -> Self {
        self.split_test_size = Some(size);
        self
    }

    /// Set the shuffle seed.
    #[must_use]
    pub fn split_random_state(mut self, seed: u64) -> Self {
        self.split_random_state = Some(seed);
        self
    }

    /// Standard-scale the support vector regressor target.
    #[must_use]
    pub fn feature_scale_dependent_variables(mut self, scale: bool) -> Self {
        self.feature_scale_dependent_variables = Some(scale);
        self
    }

    /// Add a row of independent values to predict.
    #[must_use]
    pub fn predict<S: Into<String>>(mut self, row: impl IntoIterator<Item = S>) -> Self {
        self.predict.push(row.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict printed predictions to these model codes.
    #[must_use]
    pub fn predict_only<S: Into<String>>(mut self, codes: impl IntoIterator<Item = S>) -> Self {
        self.predict_only = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Compare test set predictions of these model codes.
    #[must_use]
    pub fn show_predictions_for<S: Into<String>>(
        mut self,
        codes: impl IntoIterator<Item = S>,
    ) -> Self {
        self.show_predictions_for = Some(codes.into_iter().map(Into::into).collect());
        self
    }

    /// Set the number of rows in comparison tables.
    #[must_use]
    pub fn nb_prediction_lines_to_show(mut self, lines: usize) -> Self {
        self.nb_prediction_lines_to_show = Some(lines);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigValidationError`] if validation fails.
    pub fn build(self) -> std::result::Result<ModelSelectionConfig, ConfigValidationError> {
        let defaults = ModelSelectionConfig::default();
        let config = ModelSelectionConfig {
            dataset: self.dataset.unwrap_or(defaults.dataset),
            dependent_variable_column: self
                .dependent_variable_column
                .unwrap_or(defaults.dependent_variable_column),
            independent_variables_columns: self.independent_variables_columns,
            split_test_size: self.split_test_size.unwrap_or(defaults.split_test_size),
            split_random_state: self
                .split_random_state
                .unwrap_or(defaults.split_random_state),
            feature_scale_dependent_variables: self
                .feature_scale_dependent_variables
                .unwrap_or(defaults.feature_scale_dependent_variables),
            predict: self.predict,
            predict_only: self.predict_only,
            show_predictions_for: self.show_predictions_for,
            nb_prediction_lines_to_show: self
                .nb_prediction_lines_to_show
                .unwrap_or(defaults.nb_prediction_lines_to_show),
        };

        config.validate()?;
        Ok(config)
    }
}
