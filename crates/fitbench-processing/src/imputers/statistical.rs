//! Statistical imputation methods.
//!
//! Provides row deletion, mean and most frequent value imputation.

use crate::error::{PreprocessingError, Result};
use crate::utils::{fill_string_nulls, is_numeric_dtype, series_to_f64, string_mode};
use polars::prelude::*;
use tracing::debug;

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Drop every row holding a null in one of `columns`.
    ///
    /// Returns the mask of kept rows so that aligned data (e.g. a target
    /// column) can be filtered the same way.
    pub fn delete_missing_rows(df: &mut DataFrame, columns: &[String]) -> Result<BooleanChunked> {
        let mut keep = BooleanChunked::full("keep".into(), true, df.height());
        for col_name in columns {
            let series = df.column(col_name)?.as_materialized_series();
            keep = &keep & &series.is_not_null();
        }

        let before = df.height();
        *df = df.filter(&keep)?;
        debug!(
            "Deleted {} rows with missing values in {:?}",
            before - df.height(),
            columns
        );
        Ok(keep)
    }

    /// Replace nulls with the column mean.
    pub fn mean(df: &mut DataFrame, columns: &[String]) -> Result<()> {
        for col_name in columns {
            let series = df.column(col_name)?.as_materialized_series().clone();
            let mean_val = series
                .mean()
                .ok_or_else(|| PreprocessingError::NoValidValues(col_name.clone()))?;
            Self::fill_with_value(df, col_name, mean_val, &series)?;
            debug!("Filled '{}' with mean: {:.4}", col_name, mean_val);
        }
        Ok(())
    }

    /// Replace nulls with the most frequent value.
    ///
    /// Ties are resolved towards the lexicographically smallest value.
    pub fn most_frequent(df: &mut DataFrame, columns: &[String]) -> Result<()> {
        for col_name in columns {
            let series = df.column(col_name)?.as_materialized_series().clone();
            let mode_val = string_mode(&series)
                .ok_or_else(|| PreprocessingError::NoValidValues(col_name.clone()))?;

            if is_numeric_dtype(series.dtype()) {
                let fill_value = mode_val.parse::<f64>().map_err(|e| {
                    PreprocessingError::ImputationFailed {
                        column: col_name.clone(),
                        reason: e.to_string(),
                    }
                })?;
                Self::fill_with_value(df, col_name, fill_value, &series)?;
            } else {
                let filled = fill_string_nulls(&series, &mode_val)?;
                df.replace(col_name, filled)?;
            }
            debug!("Filled '{}' with mode: '{}'", col_name, mode_val);
        }
        Ok(())
    }

    /// Fill numeric column nulls with a specific value.
    fn fill_with_value(
        df: &mut DataFrame,
        col_name: &str,
        fill_value: f64,
        series: &Series,
    ) -> Result<()> {
        let values: Vec<f64> = series_to_f64(series)?
            .into_iter()
            .map(|value| value.unwrap_or(fill_value))
            .collect();
        df.replace(col_name, Series::new(col_name.into(), values))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f64_values(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        series_to_f64(df.column(name).unwrap().as_materialized_series()).unwrap()
    }

    // ========================================================================
    // delete_missing_rows() tests
    // ========================================================================

    #[test]
    fn test_delete_missing_rows() {
        let mut df = df![
            "a" => [Some(1.0), None, Some(3.0), Some(4.0)],
            "b" => [Some("x"), Some("y"), None, Some("z")],
            "c" => [Some(1), Some(2), Some(3), None],
        ]
        .unwrap();

        let keep =
            StatisticalImputer::delete_missing_rows(&mut df, &["a".into(), "b".into()]).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(f64_values(&df, "a"), vec![Some(1.0), Some(4.0)]);
        let mask: Vec<_> = keep.into_iter().collect();
        assert_eq!(mask, vec![Some(true), Some(false), Some(false), Some(true)]);
    }

    // ========================================================================
    // mean() tests
    // ========================================================================

    #[test]
    fn test_mean_imputation() {
        let mut df = df![
            "values" => [Some(1.0), None, Some(3.0), None, Some(5.0)],
        ]
        .unwrap();

        StatisticalImputer::mean(&mut df, &["values".into()]).unwrap();

        assert_eq!(
            f64_values(&df, "values"),
            vec![Some(1.0), Some(3.0), Some(3.0), Some(3.0), Some(5.0)]
        );
    }

    #[test]
    fn test_mean_imputation_integer_column() {
        let mut df = df!["values" => [Some(1i64), None, Some(2)]].unwrap();
        StatisticalImputer::mean(&mut df, &["values".into()]).unwrap();
        assert_eq!(f64_values(&df, "values"), vec![Some(1.0), Some(1.5), Some(2.0)]);
    }

    #[test]
    fn test_mean_imputation_all_null() {
        let mut df = df!["values" => [None::<f64>, None]].unwrap();
        let err = StatisticalImputer::mean(&mut df, &["values".into()]).unwrap_err();
        assert_eq!(err.error_code(), "NO_VALID_VALUES");
    }

    // ========================================================================
    // most_frequent() tests
    // ========================================================================

    #[test]
    fn test_most_frequent_strings() {
        let mut df = df![
            "country" => [Some("Spain"), None, Some("France"), Some("Spain"), None],
        ]
        .unwrap();

        StatisticalImputer::most_frequent(&mut df, &["country".into()]).unwrap();

        let values: Vec<_> = df
            .column("country")
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.map(str::to_string))
            .collect();
        assert_eq!(
            values,
            vec![
                Some("Spain".to_string()),
                Some("Spain".to_string()),
                Some("France".to_string()),
                Some("Spain".to_string()),
                Some("Spain".to_string()),
            ]
        );
    }

    #[test]
    fn test_most_frequent_tie_breaks_to_smallest() {
        let mut df = df!["c" => [Some("b"), Some("a"), None]].unwrap();
        StatisticalImputer::most_frequent(&mut df, &["c".into()]).unwrap();
        let filled = df.column("c").unwrap().str().unwrap().get(2).map(str::to_string);
        assert_eq!(filled, Some("a".to_string()));
    }
}
