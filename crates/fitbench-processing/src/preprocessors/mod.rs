//! Strategy driven preprocessors.
//!
//! - [`MissingDataPreprocessor`] imputes or drops missing values
//! - [`CategoricalDataPreprocessor`] encodes categorical columns
//!
//! Both resolve `cols -> CODE` definitions with the helpers of [`common`].

pub mod common;
mod categorical;
mod missing;

pub use categorical::{
    CategoricalDataPreprocessor, ColumnEncoding, FittedEncoding, INTERCEPT_COLUMN,
    label_encode_target,
};
pub use common::ColumnsByStrategy;
pub use missing::{ImputationSummary, MissingDataPreprocessor};
