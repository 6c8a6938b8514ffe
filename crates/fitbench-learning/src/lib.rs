//! Model Selection Library
//!
//! Fits a battery of classifiers or regressors on the same train/test split
//! of a CSV dataset and ranks them by score.
//!
//! # Overview
//!
//! - **Dataset preparation**: dependent and independent column selection,
//!   missing data imputation, categorical encoding and a seeded split, all
//!   delegated to `fitbench_processing`
//! - **Estimators**: decision trees, random forests, k-NN, Gaussian naive
//!   Bayes, logistic and linear regression, polynomial regression and
//!   support vector machines, implemented natively on `ndarray`
//! - **Ranking**: accuracy and confusion matrix for classifiers, R² for
//!   regressors, sorted from the best model to the worst
//! - **Predictions**: rows typed by the user and test set comparisons,
//!   decoded back to the target labels
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fitbench_learning::{
//!     Classifier, ModelSelection, ModelSelectionConfig, ModelSelectionDataset, print_report,
//! };
//! use fitbench_processing::PreprocessingConfig;
//!
//! let config = ModelSelectionConfig::builder()
//!     .dataset("Social_Network_Ads.csv")
//!     .predict(["Male", "30", "87000"])
//!     .build()?;
//! let preprocessing = PreprocessingConfig::default();
//!
//! let dataset = ModelSelectionDataset::load(&config, &preprocessing)?;
//! let selection = ModelSelection::<Classifier>::evaluate(&dataset, &config)?;
//! print_report(&selection, &dataset, &config)?;
//! ```
//!
//! # Model Codes
//!
//! | Classifiers | Regressors |
//! |-------------|------------|
//! | DTC, KNNC, KSVMC, LRC, NBC, RFC, SVMC | MLR, POLY, SVR, DTR, RFR |

pub mod config;
pub mod dataset_manager;
pub mod error;
pub mod metrics;
pub mod models;
pub mod report;
pub mod selection;

// Re-exports for convenient access
pub use config::{ConfigValidationError, ModelSelectionConfig, ModelSelectionConfigBuilder};
pub use dataset_manager::{ComparisonRows, ModelSelectionDataset, PREDICTED_HEADER_PREFIX};
pub use error::{LearningError, Result, ResultExt};
pub use metrics::{ConfusionMatrix, accuracy_score, r2_score};
pub use models::{Classifier, Estimator, ModelCode, Regressor, Task};
pub use report::{format_elapsed, print_report};
pub use selection::{Evaluation, FittedModel, ModelSelection, select_models};
