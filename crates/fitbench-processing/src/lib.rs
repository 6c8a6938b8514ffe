//! Dataset Preprocessing Library
//!
//! Loads tabular datasets with Polars and prepares them for model selection.
//!
//! # Overview
//!
//! - **Column selection**: indexes, negative indexes, names, inclusive
//!   intervals such as `col1-col3`, and `*`
//! - **Missing data imputation**: row deletion, mean, most frequent, k-NN and
//!   MICE, dispatched per column with `cols -> CODE` definitions
//! - **Categorical encoding**: label, one-hot, binary and backward difference
//! - **Cell operations**: `cols -> * 2 -> fillna 0` style transformations
//! - **Model inputs**: standard scaling and a seeded train/test split
//! - **Console tables**: bordered, centred text tables
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fitbench_processing::{
//!     CategoricalDataPreprocessor, Dataset, ImputationStrategy, MissingDataPreprocessor,
//!     PreprocessingConfig,
//! };
//!
//! let mut dataset = Dataset::from_csv("data.csv")?;
//!
//! let config = PreprocessingConfig::builder()
//!     .default_numerical_imputation(ImputationStrategy::Knn)
//!     .categorical_imputation("country -> DEL")
//!     .build()?;
//!
//! MissingDataPreprocessor::new(config.clone()).handle_data(&mut dataset)?;
//! CategoricalDataPreprocessor::new(config).handle_data(&mut dataset)?;
//! ```
//!
//! # Column Definitions
//!
//! Column tokens are separated by whitespace. With the default `-` interval
//! separator, `0 2-4 -1 price` selects the first column, the third to fifth
//! columns, the last column and the column named `price`.

pub mod columns;
pub mod config;
pub mod dataset;
pub mod error;
pub mod imputers;
pub mod linalg;
pub mod operations;
pub mod preprocessors;
pub mod scaling;
pub mod split;
pub mod strategies;
pub mod table;
pub mod utils;

// Re-exports for convenient access
pub use columns::ColumnSelector;
pub use config::{
    ConfigValidationError, DEFAULT_COLUMNS_INTERVAL_SEPARATOR, PreprocessingConfig,
    PreprocessingConfigBuilder,
};
pub use dataset::Dataset;
pub use error::{PreprocessingError, Result as PreprocessingResult, ResultExt};
pub use imputers::{KnnImputer, MiceImputer, StatisticalImputer};
pub use operations::{Operation, apply_definition, apply_operations};
pub use preprocessors::{
    CategoricalDataPreprocessor, ColumnEncoding, ColumnsByStrategy, FittedEncoding,
    INTERCEPT_COLUMN, ImputationSummary, MissingDataPreprocessor, label_encode_target,
};
pub use scaling::{StandardScaler, VectorScaler};
pub use split::train_test_split;
pub use strategies::{EncodingStrategy, ImputationStrategy, StrategyCode};
pub use table::{TextTable, fill_empty, horizontal_rule};
pub use utils::{ScalarValue, format_any_value, format_float, is_categorical_dtype, is_numeric_dtype};
