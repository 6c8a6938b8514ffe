//! Multivariate Imputation by Chained Equations.

use super::{column_mean, create_data_matrix, numeric_column_names};
use crate::error::{PreprocessingError, Result};
use crate::linalg::{solve_least_squares, with_intercept_column};
use ndarray::{Array2, Axis};
use polars::prelude::*;
use tracing::debug;

/// Maximum number of imputation rounds.
const MAX_ROUNDS: usize = 10;

/// Rounds stop once the largest change of a round drops below this value.
const TOLERANCE: f64 = 1e-3;

/// Chained equations imputer.
///
/// Missing entries are first replaced by their column mean. Each round then
/// regresses every imputed column on all other numeric columns, using the
/// rows where it was observed, and overwrites its missing entries with the
/// predictions.
#[derive(Debug, Clone, Default)]
pub struct MiceImputer;

impl MiceImputer {
    pub fn new() -> Self {
        Self
    }

    /// Fill the nulls of `columns` in place.
    pub fn fit_transform(&self, df: &mut DataFrame, columns: &[String]) -> Result<()> {
        let context_columns = numeric_column_names(df);
        let matrix = create_data_matrix(df, &context_columns)?;
        let n_rows = matrix.len();
        let n_cols = context_columns.len();

        let targets: Vec<usize> = columns
            .iter()
            .filter_map(|name| context_columns.iter().position(|c| c == name))
            .filter(|&col| matrix.iter().any(|row| row[col].is_none()))
            .collect();
        if targets.is_empty() {
            return Ok(());
        }

        // Mean initialisation of every context column
        let mut data = Array2::<f64>::zeros((n_rows, n_cols));
        for col in 0..n_cols {
            let mean = match column_mean(&matrix, col) {
                Some(mean) => mean,
                None if targets.contains(&col) => {
                    return Err(PreprocessingError::NoValidValues(context_columns[col].clone()));
                }
                None => 0.0,
            };
            for row in 0..n_rows {
                data[[row, col]] = matrix[row][col].unwrap_or(mean);
            }
        }

        for iteration in 0..MAX_ROUNDS {
            let mut max_change: f64 = 0.0;

            for &target in &targets {
                let observed: Vec<usize> =
                    (0..n_rows).filter(|&r| matrix[r][target].is_some()).collect();
                let missing: Vec<usize> =
                    (0..n_rows).filter(|&r| matrix[r][target].is_none()).collect();
                let predictors: Vec<usize> = (0..n_cols).filter(|&c| c != target).collect();

                let x_obs = with_intercept_column(
                    &data.select(Axis(0), &observed).select(Axis(1), &predictors),
                );
                let y_obs = data.column(target).select(Axis(0), &observed);

                let Some(weights) = solve_least_squares(&x_obs, &y_obs) else {
                    debug!("MICE regression for column {} is singular, keeping values", target);
                    continue;
                };

                let x_mis = with_intercept_column(
                    &data.select(Axis(0), &missing).select(Axis(1), &predictors),
                );
                let predictions = x_mis.dot(&weights);

                for (&row, &prediction) in missing.iter().zip(predictions.iter()) {
                    if prediction.is_finite() {
                        max_change = max_change.max((data[[row, target]] - prediction).abs());
                        data[[row, target]] = prediction;
                    }
                }
            }

            debug!("MICE round {} largest change {:.6}", iteration + 1, max_change);
            if max_change < TOLERANCE {
                break;
            }
        }

        for &target in &targets {
            let name = context_columns[target].as_str();
            let values: Vec<f64> = data.column(target).to_vec();
            df.replace(name, Series::new(name.into(), values))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn values(df: &DataFrame, name: &str) -> Vec<f64> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_no_null_iter()
            .collect()
    }

    #[test]
    fn test_recovers_linear_relation() {
        // b = 2a + 1
        let mut df = df![
            "a" => [1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            "b" => [Some(3.0), Some(5.0), None, Some(9.0), Some(11.0), None],
        ]
        .unwrap();

        MiceImputer::new().fit_transform(&mut df, &["b".to_string()]).unwrap();

        let b = values(&df, "b");
        assert!((b[2] - 7.0).abs() < 1e-6);
        assert!((b[5] - 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_single_column_is_mean_imputed() {
        let mut df = df!["a" => [Some(1.0), None, Some(5.0)]].unwrap();

        MiceImputer::new().fit_transform(&mut df, &["a".to_string()]).unwrap();

        assert!((values(&df, "a")[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_missing_values_is_noop() {
        let mut df = df!["a" => [1.0, 2.0], "b" => [3.0, 4.0]].unwrap();
        let before = df.clone();

        MiceImputer::new().fit_transform(&mut df, &["a".to_string()]).unwrap();

        assert!(df.equals(&before));
    }

    #[test]
    fn test_all_null_column_is_an_error() {
        let mut df = df!["a" => [None::<f64>, None], "b" => [1.0, 2.0]].unwrap();
        let err = MiceImputer::new()
            .fit_transform(&mut df, &["a".to_string()])
            .unwrap_err();
        assert_eq!(err.error_code(), "NO_VALID_VALUES");
    }
}
