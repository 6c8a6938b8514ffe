//! Categorical columns encoding driven by encoding strategy codes.
//!
//! Encoding is split in two steps. [`CategoricalDataPreprocessor::fit`] learns
//! the sorted categories of every categorical column and returns a
//! [`FittedEncoding`], which can then transform the training data as well as
//! rows typed later for prediction.

use super::common::{
    ColumnsByStrategy, check_for_duplicate_columns, columns_by_strategy_code, strategy_for,
};
use crate::config::PreprocessingConfig;
use crate::dataset::Dataset;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::strategies::{EncodingStrategy, StrategyCode};
use crate::table::{TextTable, fill_empty};
use crate::utils::series_to_strings;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Name of the constant column added by backward difference encoding.
pub const INTERCEPT_COLUMN: &str = "intercept";

/// Encodes categorical columns and keeps a report of what was encoded.
#[derive(Debug, Clone)]
pub struct CategoricalDataPreprocessor {
    config: PreprocessingConfig,
    encoded_columns: Vec<(EncodingStrategy, Vec<String>)>,
}

impl CategoricalDataPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self {
            config,
            encoded_columns: Vec::new(),
        }
    }

    /// Encoding of every categorical column, grouped by strategy.
    pub fn categorical_columns_by_encoding(
        &self,
        dataset: &Dataset,
    ) -> Result<ColumnsByStrategy<EncodingStrategy>> {
        let specific = columns_by_strategy_code(
            dataset,
            &self.config.columns_interval_separator,
            &self.config.categorical_encoding,
            EncodingStrategy::ALL,
        )
        .context("Invalid categorical columns encoding")?;
        check_for_duplicate_columns(dataset, &[&specific])?;

        let mut result = ColumnsByStrategy::new();
        for column in dataset.categorical_column_indexes() {
            result.add(
                strategy_for(column, self.config.default_encoding, &specific),
                [column],
            );
        }
        Ok(result)
    }

    /// Learn the categories of every categorical column.
    pub fn fit(&mut self, dataset: &Dataset) -> Result<FittedEncoding> {
        let groups = self.categorical_columns_by_encoding(dataset)?;
        let headers = dataset.headers();
        let mut columns = Vec::new();

        for (strategy, indexes) in groups.iter() {
            for index in indexes {
                let name = headers[index].clone();
                let categories: BTreeSet<String> = series_to_strings(dataset.series(index)?)?
                    .into_iter()
                    .flatten()
                    .collect();
                debug!(
                    "Column '{}' encoded with {} over {} categories",
                    name,
                    strategy.code(),
                    categories.len()
                );
                self.record(strategy, &name);
                columns.push(ColumnEncoding {
                    column: name,
                    strategy,
                    categories: categories.into_iter().collect(),
                });
            }
        }

        info!(columns = columns.len(), "Categorical encoding fitted");
        Ok(FittedEncoding { columns })
    }

    /// Fit on `dataset` and encode it in place.
    pub fn handle_data(&mut self, dataset: &mut Dataset) -> Result<FittedEncoding> {
        let fitted = self.fit(dataset)?;
        fitted.transform(dataset)?;
        Ok(fitted)
    }

    fn record(&mut self, strategy: EncodingStrategy, column: &str) {
        let quoted = format!("'{}'", column);
        match self.encoded_columns.iter_mut().find(|(s, _)| *s == strategy) {
            Some((_, columns)) => {
                if !columns.contains(&quoted) {
                    columns.push(quoted);
                }
            }
            None => self.encoded_columns.push((strategy, vec![quoted])),
        }
    }

    /// `Encoding Code applied | Columns updated` over every fit so far.
    pub fn encoding_table(&self) -> TextTable {
        let mut rows: Vec<Vec<String>> = self
            .encoded_columns
            .iter()
            .map(|(strategy, columns)| vec![strategy.with_description(), columns.join(", ")])
            .collect();
        fill_empty(&mut rows, 2);

        let mut table = TextTable::new(["Encoding Code applied", "Columns updated"]);
        table.add_rows(rows);
        table
    }

    /// Print the accumulated encoding report unless details are skipped.
    pub fn print_accumulated_encoding_results(&self) {
        if !self.config.skip_preprocessing_details {
            println!("{}\n", self.encoding_table().draw());
        }
    }
}

/// Learned encoding of one categorical column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnEncoding {
    pub column: String,
    pub strategy: EncodingStrategy,
    /// Sorted distinct values seen during fit.
    pub categories: Vec<String>,
}

impl ColumnEncoding {
    /// Position of `value` among the fitted categories.
    fn code_of(&self, value: &str) -> Result<usize> {
        self.categories
            .binary_search_by(|category| category.as_str().cmp(value))
            .map_err(|_| PreprocessingError::UnknownCategory {
                column: self.column.clone(),
                value: value.to_string(),
            })
    }

    /// Encoded columns for the given values.
    fn encode(&self, values: &[Option<String>]) -> Result<Vec<Series>> {
        let codes = values
            .iter()
            .map(|value| value.as_deref().map(|v| self.code_of(v)).transpose())
            .collect::<Result<Vec<Option<usize>>>>()?;
        let k = self.categories.len();

        let series = match self.strategy {
            EncodingStrategy::Label => {
                let labels: Vec<i64> = codes
                    .iter()
                    .map(|code| code.map(|c| c as i64).unwrap_or(-1))
                    .collect();
                vec![Series::new(self.column.as_str().into(), labels)]
            }
            EncodingStrategy::OneHot => self
                .categories
                .iter()
                .enumerate()
                .map(|(category_idx, category)| {
                    let indicator: Vec<f64> = codes
                        .iter()
                        .map(|code| if *code == Some(category_idx) { 1.0 } else { 0.0 })
                        .collect();
                    Series::new(format!("{}_{}", self.column, category).into(), indicator)
                })
                .collect(),
            EncodingStrategy::Binary => {
                let n_bits = binary_digits(k);
                (0..n_bits)
                    .map(|bit| {
                        let shift = n_bits - 1 - bit;
                        let digits: Vec<f64> = codes
                            .iter()
                            .map(|code| match code {
                                Some(c) => (((c + 1) >> shift) & 1) as f64,
                                None => 0.0,
                            })
                            .collect();
                        Series::new(format!("{}_{}", self.column, bit).into(), digits)
                    })
                    .collect()
            }
            EncodingStrategy::Backward => (0..k.saturating_sub(1))
                .map(|j| {
                    let contrasts: Vec<f64> = codes
                        .iter()
                        .map(|code| code.map(|i| backward_contrast(i, j, k)).unwrap_or(0.0))
                        .collect();
                    Series::new(format!("{}_{}", self.column, j).into(), contrasts)
                })
                .collect(),
        };

        Ok(series)
    }
}

/// Number of binary digits needed to write ordinals `1..=k`.
fn binary_digits(k: usize) -> usize {
    let mut digits = 1;
    while (1usize << digits) <= k {
        digits += 1;
    }
    digits
}

/// Backward difference contrast of level `i` in column `j` over `k` levels.
fn backward_contrast(i: usize, j: usize, k: usize) -> f64 {
    let k_f = k as f64;
    if i <= j {
        (j as f64 + 1.0 - k_f) / k_f
    } else {
        (j as f64 + 1.0) / k_f
    }
}

/// Categories learned by [`CategoricalDataPreprocessor::fit`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FittedEncoding {
    columns: Vec<ColumnEncoding>,
}

impl FittedEncoding {
    pub fn columns(&self) -> &[ColumnEncoding] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Replace each encoded column by its encoding, appended at the end.
    pub fn transform(&self, dataset: &mut Dataset) -> Result<()> {
        for encoding in &self.columns {
            let frame = dataset.frame_mut();
            let values = series_to_strings(frame.column(&encoding.column)?.as_materialized_series())?;
            let encoded = encoding.encode(&values)?;

            let mut new_columns: Vec<Column> = Vec::new();
            if encoding.strategy == EncodingStrategy::Backward
                && frame.get_column_index(INTERCEPT_COLUMN).is_none()
            {
                let ones = vec![1.0; frame.height()];
                new_columns.push(Series::new(INTERCEPT_COLUMN.into(), ones).into_column());
            }
            new_columns.extend(encoded.into_iter().map(Series::into_column));

            let mut updated = frame.drop(&encoding.column)?;
            updated.hstack_mut(&new_columns)?;
            *frame = updated;
        }
        Ok(())
    }
}

static_assertions::assert_impl_all!(FittedEncoding: Send, Sync);

/// Encode target labels as their position among the sorted distinct labels.
///
/// Returns the codes and the labels indexed by code.
pub fn label_encode_target(values: &[String]) -> (Vec<f64>, Vec<String>) {
    let labels: Vec<String> = values
        .iter()
        .cloned()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    let codes = values
        .iter()
        .map(|value| {
            labels
                .binary_search(value)
                .map(|code| code as f64)
                .unwrap_or(f64::NAN)
        })
        .collect();
    (codes, labels)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::series_to_f64;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        Dataset::from_frame(
            df![
                "Country" => ["France", "Spain", "Germany", "Spain"],
                "Age" => [44.0, 27.0, 30.0, 38.0],
                "Size" => ["S", "M", "L", "S"],
            ]
            .unwrap(),
        )
    }

    fn encoder(config: PreprocessingConfig) -> CategoricalDataPreprocessor {
        CategoricalDataPreprocessor::new(config)
    }

    fn column(dataset: &Dataset, name: &str) -> Vec<Option<f64>> {
        let index = dataset.column_index(name).unwrap();
        series_to_f64(dataset.series(index).unwrap()).unwrap()
    }

    // ========================================================================
    // strategy resolution
    // ========================================================================

    #[test]
    fn test_default_and_specific_encoding() {
        let config = PreprocessingConfig::builder()
            .categorical_encoding("Size -> onehot")
            .build()
            .unwrap();

        let groups: Vec<_> = encoder(config)
            .categorical_columns_by_encoding(&dataset())
            .unwrap()
            .iter()
            .collect();
        assert_eq!(
            groups,
            vec![
                (EncodingStrategy::Binary, vec![0]),
                (EncodingStrategy::OneHot, vec![2]),
            ]
        );
    }

    #[test]
    fn test_invalid_encoding_code() {
        let config = PreprocessingConfig::builder()
            .categorical_encoding("0 -> MEAN")
            .build()
            .unwrap();
        let err = encoder(config)
            .categorical_columns_by_encoding(&dataset())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_STRATEGY_CODE");
    }

    // ========================================================================
    // encodings
    // ========================================================================

    #[test]
    fn test_label_encoding() {
        let config = PreprocessingConfig::builder()
            .default_encoding(EncodingStrategy::Label)
            .build()
            .unwrap();
        let mut dataset = dataset();

        encoder(config).handle_data(&mut dataset).unwrap();

        assert_eq!(dataset.headers(), vec!["Age", "Country", "Size"]);
        assert_eq!(
            column(&dataset, "Country"),
            vec![Some(0.0), Some(2.0), Some(1.0), Some(2.0)]
        );
        // L < M < S
        assert_eq!(
            column(&dataset, "Size"),
            vec![Some(2.0), Some(1.0), Some(0.0), Some(2.0)]
        );
    }

    #[test]
    fn test_one_hot_encoding() {
        let config = PreprocessingConfig::builder()
            .default_encoding(EncodingStrategy::OneHot)
            .categorical_encoding("Size -> LABEL")
            .build()
            .unwrap();
        let mut dataset = dataset();

        encoder(config).handle_data(&mut dataset).unwrap();

        assert_eq!(
            dataset.headers(),
            vec![
                "Age",
                "Country_France",
                "Country_Germany",
                "Country_Spain",
                "Size"
            ]
        );
        assert_eq!(
            column(&dataset, "Country_Spain"),
            vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0)]
        );
    }

    #[test]
    fn test_binary_encoding() {
        let mut dataset = Dataset::from_frame(df!["c" => ["a", "b", "c", "d"]].unwrap());

        encoder(PreprocessingConfig::default())
            .handle_data(&mut dataset)
            .unwrap();

        // ordinals 1..4 over 3 digits, most significant first
        assert_eq!(dataset.headers(), vec!["c_0", "c_1", "c_2"]);
        assert_eq!(column(&dataset, "c_0"), vec![Some(0.0), Some(0.0), Some(0.0), Some(1.0)]);
        assert_eq!(column(&dataset, "c_1"), vec![Some(0.0), Some(1.0), Some(1.0), Some(0.0)]);
        assert_eq!(column(&dataset, "c_2"), vec![Some(1.0), Some(0.0), Some(1.0), Some(0.0)]);
    }

    #[test]
    fn test_backward_difference_encoding() {
        let config = PreprocessingConfig::builder()
            .default_encoding(EncodingStrategy::Backward)
            .build()
            .unwrap();
        let mut dataset = dataset();

        encoder(config).handle_data(&mut dataset).unwrap();

        assert_eq!(
            dataset.headers(),
            vec!["Age", "intercept", "Country_0", "Country_1", "Size_0", "Size_1"]
        );
        let third = 1.0 / 3.0;
        // France, Spain, Germany, Spain -> levels 0, 2, 1, 2
        assert_eq!(
            column(&dataset, "Country_0"),
            vec![Some(-2.0 * third), Some(third), Some(third), Some(third)]
        );
        assert_eq!(
            column(&dataset, "Country_1"),
            vec![Some(-third), Some(2.0 * third), Some(-third), Some(2.0 * third)]
        );
        assert_eq!(column(&dataset, "intercept"), vec![Some(1.0); 4]);
    }

    #[test]
    fn test_binary_digits() {
        assert_eq!(binary_digits(1), 1);
        assert_eq!(binary_digits(2), 2);
        assert_eq!(binary_digits(3), 2);
        assert_eq!(binary_digits(4), 3);
        assert_eq!(binary_digits(7), 3);
        assert_eq!(binary_digits(8), 4);
    }

    // ========================================================================
    // fitted transform
    // ========================================================================

    #[test]
    fn test_fitted_encoding_transforms_new_rows() {
        let mut preprocessor = encoder(
            PreprocessingConfig::builder()
                .default_encoding(EncodingStrategy::OneHot)
                .build()
                .unwrap(),
        );
        let fitted = preprocessor.fit(&dataset()).unwrap();

        let mut rows = Dataset::from_frame(
            df![
                "Country" => ["Germany"],
                "Age" => [50.0],
                "Size" => ["M"],
            ]
            .unwrap(),
        );
        fitted.transform(&mut rows).unwrap();

        assert_eq!(rows.width(), 7);
        assert_eq!(column(&rows, "Country_Germany"), vec![Some(1.0)]);
        assert_eq!(column(&rows, "Size_M"), vec![Some(1.0)]);
    }

    #[test]
    fn test_unknown_category_is_an_error() {
        let mut preprocessor = encoder(PreprocessingConfig::default());
        let fitted = preprocessor.fit(&dataset()).unwrap();

        let mut rows = Dataset::from_frame(
            df![
                "Country" => ["Italy"],
                "Age" => [50.0],
                "Size" => ["M"],
            ]
            .unwrap(),
        );
        let err = fitted.transform(&mut rows).unwrap_err();
        assert_eq!(err.to_string(), "Unknown category 'Italy' in column 'Country'");
    }

    // ========================================================================
    // report and target
    // ========================================================================

    #[test]
    fn test_encoding_table_accumulates() {
        let mut preprocessor = encoder(
            PreprocessingConfig::builder()
                .categorical_encoding("2 -> LABEL")
                .build()
                .unwrap(),
        );
        preprocessor.fit(&dataset()).unwrap();
        preprocessor.fit(&dataset()).unwrap();

        let drawn = preprocessor.encoding_table().draw();
        assert!(drawn.contains("BINARY (Binary encoding)"));
        assert!(drawn.contains("LABEL (Label encoding)"));
        assert_eq!(drawn.matches("'Country'").count(), 1);
    }

    #[test]
    fn test_encoding_table_empty() {
        let drawn = encoder(PreprocessingConfig::default()).encoding_table().draw();
        assert_eq!(drawn.matches("N / A").count(), 2);
    }

    #[test]
    fn test_label_encode_target() {
        let values: Vec<String> = ["Yes", "No", "No", "Maybe"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let (codes, labels) = label_encode_target(&values);
        assert_eq!(labels, vec!["Maybe", "No", "Yes"]);
        assert_eq!(codes, vec![2.0, 1.0, 1.0, 0.0]);
    }
}
