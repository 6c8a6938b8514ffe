//! Imputation and encoding strategy codes.
//!
//! Every strategy is addressed on the command line by a short upper-case code
//! (`MEAN`, `ONEHOT`, ...) and carries a human readable description used in
//! help texts and in the preprocessing detail tables.

use crate::error::{PreprocessingError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A strategy addressed by a short code.
pub trait StrategyCode: Copy + Eq + Hash + fmt::Debug + 'static {
    /// Upper-case code, e.g. `MEAN`.
    fn code(&self) -> &'static str;

    /// Description shown next to the code.
    fn description(&self) -> &'static str;

    /// `CODE (description)`.
    fn with_description(&self) -> String {
        format!("{} ({})", self.code(), self.description())
    }
}

/// Strategy for filling missing values.
///
/// `Delete` is shared by numerical and categorical columns, the other
/// strategies only apply to one kind. See [`ImputationStrategy::NUMERICAL`]
/// and [`ImputationStrategy::CATEGORICAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImputationStrategy {
    /// Remove the rows holding a missing value.
    #[serde(rename = "DEL")]
    Delete,
    /// Column mean.
    #[serde(rename = "MEAN")]
    Mean,
    /// Inverse-distance weighted k nearest neighbours.
    #[serde(rename = "KNN")]
    Knn,
    /// Multivariate imputation by chained equations.
    #[serde(rename = "MICE")]
    Mice,
    /// Most frequent value.
    #[serde(rename = "FREQUENT")]
    MostFrequent,
}

impl ImputationStrategy {
    /// Strategies accepted for numerical columns, in help order.
    pub const NUMERICAL: &'static [ImputationStrategy] = &[
        ImputationStrategy::Delete,
        ImputationStrategy::Mean,
        ImputationStrategy::Knn,
        ImputationStrategy::Mice,
    ];

    /// Strategies accepted for categorical columns, in help order.
    pub const CATEGORICAL: &'static [ImputationStrategy] = &[
        ImputationStrategy::Delete,
        ImputationStrategy::MostFrequent,
    ];
}

impl StrategyCode for ImputationStrategy {
    fn code(&self) -> &'static str {
        match self {
            Self::Delete => "DEL",
            Self::Mean => "MEAN",
            Self::Knn => "KNN",
            Self::Mice => "MICE",
            Self::MostFrequent => "FREQUENT",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Delete => "delete missing values rows",
            Self::Mean => "Mean or Median imputation strategy on numerical missing values",
            Self::Knn => "K nearest neighbours algorithm",
            Self::Mice => "Multivariate Imputation by Chained Equation algorithm",
            Self::MostFrequent => "Most Frequent imputation strategy on categorical missing values",
        }
    }
}

/// Strategy for turning a categorical column into numeric columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EncodingStrategy {
    /// Category code in sorted category order.
    #[serde(rename = "LABEL")]
    Label,
    /// One indicator column per category.
    #[serde(rename = "ONEHOT")]
    OneHot,
    /// Ordinal code spread over binary digit columns.
    #[default]
    #[serde(rename = "BINARY")]
    Binary,
    /// Backward difference contrasts.
    #[serde(rename = "BACKWARD")]
    Backward,
}

impl EncodingStrategy {
    /// Every encoding, in help order.
    pub const ALL: &'static [EncodingStrategy] = &[
        EncodingStrategy::Label,
        EncodingStrategy::OneHot,
        EncodingStrategy::Binary,
        EncodingStrategy::Backward,
    ];
}

impl StrategyCode for EncodingStrategy {
    fn code(&self) -> &'static str {
        match self {
            Self::Label => "LABEL",
            Self::OneHot => "ONEHOT",
            Self::Binary => "BINARY",
            Self::Backward => "BACKWARD",
        }
    }

    fn description(&self) -> &'static str {
        match self {
            Self::Label => "Label encoding",
            Self::OneHot => "One-Hot encoding",
            Self::Binary => "Binary encoding",
            Self::Backward => "Backward Difference encoding",
        }
    }
}

impl fmt::Display for ImputationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl fmt::Display for EncodingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parse a code (case insensitive) restricted to `allowed`.
pub fn parse_code<S: StrategyCode>(raw: &str, allowed: &[S]) -> Result<S> {
    let code = raw.trim().to_uppercase();
    allowed
        .iter()
        .copied()
        .find(|strategy| strategy.code() == code)
        .ok_or_else(|| PreprocessingError::InvalidStrategyCode {
            code,
            expected: codes_list(allowed),
        })
}

/// `A, B, C`
pub fn codes_list<S: StrategyCode>(allowed: &[S]) -> String {
    allowed
        .iter()
        .map(|strategy| strategy.code())
        .collect::<Vec<_>>()
        .join(", ")
}

/// `A (desc), B (desc)`, used in CLI help texts.
pub fn codes_with_descriptions<S: StrategyCode>(allowed: &[S]) -> String {
    allowed
        .iter()
        .map(|strategy| strategy.with_description())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_code_case_insensitive() {
        let strategy = parse_code(" knn ", ImputationStrategy::NUMERICAL).unwrap();
        assert_eq!(strategy, ImputationStrategy::Knn);

        let encoding = parse_code("OneHot", EncodingStrategy::ALL).unwrap();
        assert_eq!(encoding, EncodingStrategy::OneHot);
    }

    #[test]
    fn test_parse_code_rejects_code_of_other_kind() {
        let err = parse_code("FREQUENT", ImputationStrategy::NUMERICAL).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid code : FREQUENT, expected one of these codes : DEL, MEAN, KNN, MICE"
        );
    }

    #[test]
    fn test_with_description() {
        assert_eq!(
            ImputationStrategy::Delete.with_description(),
            "DEL (delete missing values rows)"
        );
        assert_eq!(
            EncodingStrategy::Backward.with_description(),
            "BACKWARD (Backward Difference encoding)"
        );
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&ImputationStrategy::MostFrequent).unwrap();
        assert_eq!(json, "\"FREQUENT\"");
        let encoding: EncodingStrategy = serde_json::from_str("\"LABEL\"").unwrap();
        assert_eq!(encoding, EncodingStrategy::Label);
    }

    #[test]
    fn test_default_encoding_is_binary() {
        assert_eq!(EncodingStrategy::default(), EncodingStrategy::Binary);
    }
}
