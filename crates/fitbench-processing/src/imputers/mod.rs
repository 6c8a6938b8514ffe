//! Imputation module for handling missing values.
//!
//! This module provides the imputation strategies:
//! - Row deletion, mean and most frequent value imputation
//! - KNN imputation
//! - MICE imputation

mod knn;
mod mice;
mod statistical;

pub use knn::KnnImputer;
pub use mice::MiceImputer;
pub use statistical::StatisticalImputer;

use crate::utils::is_numeric_dtype;
use polars::prelude::*;

/// Names of the numeric columns of a frame, used as distance or regression context.
pub(crate) fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|column| is_numeric_dtype(column.dtype()))
        .map(|column| column.name().to_string())
        .collect()
}

/// Dense row-major matrix of optional values for the given columns.
pub(crate) fn create_data_matrix(
    df: &DataFrame,
    columns: &[String],
) -> PolarsResult<Vec<Vec<Option<f64>>>> {
    let n_rows = df.height();
    let mut matrix = vec![vec![None; columns.len()]; n_rows];

    for (col_idx, col_name) in columns.iter().enumerate() {
        let series = df.column(col_name)?.as_materialized_series();
        let float_series = series.cast(&DataType::Float64)?;
        let f64_series = float_series.f64()?;

        for (row_idx, row) in matrix.iter_mut().enumerate() {
            row[col_idx] = f64_series.get(row_idx);
        }
    }

    Ok(matrix)
}

/// Mean of the non-null values of one matrix column.
pub(crate) fn column_mean(matrix: &[Vec<Option<f64>>], col: usize) -> Option<f64> {
    let (sum, count) = matrix
        .iter()
        .filter_map(|row| row[col])
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}
