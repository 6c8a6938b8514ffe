use super::{column_mean, create_data_matrix, numeric_column_names};
use crate::error::{PreprocessingError, Result};
use crate::utils::is_numeric_dtype;
use polars::prelude::*;
use tracing::debug;

/// Inverse-distance weighted k nearest neighbours imputer.
///
/// Candidate neighbours are the rows complete on every numeric column of the
/// frame. Distances skip the features the imputed row is missing. Without any
/// complete row the column mean is used.
pub struct KnnImputer {
    n_neighbors: usize,
}

impl KnnImputer {
    /// Create a new KNN imputer with specified number of neighbors
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
        }
    }

    /// Imputer with `k = floor(sqrt(n_rows))`.
    pub fn for_rows(n_rows: usize) -> Self {
        Self::new((n_rows as f64).sqrt() as usize)
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Fill the nulls of `columns` in place.
    pub fn fit_transform(&self, df: &mut DataFrame, columns: &[String]) -> Result<()> {
        let columns_to_impute: Vec<&String> = columns
            .iter()
            .filter(|col| {
                df.column(col)
                    .map(|series| series.null_count() > 0 && is_numeric_dtype(series.dtype()))
                    .unwrap_or(false)
            })
            .collect();

        if columns_to_impute.is_empty() {
            return Ok(());
        }

        debug!(
            "KNN imputing {} columns with k={}",
            columns_to_impute.len(),
            self.n_neighbors
        );

        let context_columns = numeric_column_names(df);
        let data_matrix = create_data_matrix(df, &context_columns)?;
        let complete_rows: Vec<usize> = data_matrix
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().all(Option::is_some))
            .map(|(index, _)| index)
            .collect();

        let mut imputed_columns = Vec::with_capacity(columns_to_impute.len());
        for col_name in columns_to_impute {
            let col_idx = context_columns
                .iter()
                .position(|c| c == col_name)
                .ok_or_else(|| PreprocessingError::ColumnNotFound(col_name.clone()))?;

            let values = (0..data_matrix.len())
                .map(|row_idx| match data_matrix[row_idx][col_idx] {
                    Some(value) => Ok(value),
                    None => self.impute_value(&data_matrix, &complete_rows, row_idx, col_idx, col_name),
                })
                .collect::<Result<Vec<f64>>>()?;

            imputed_columns.push(Series::new(col_name.as_str().into(), values));
        }

        for series in imputed_columns {
            let name = series.name().to_string();
            df.replace(&name, series)?;
        }

        Ok(())
    }

    /// Impute a single missing value.
    fn impute_value(
        &self,
        data_matrix: &[Vec<Option<f64>>],
        complete_rows: &[usize],
        target_row: usize,
        target_col: usize,
        col_name: &str,
    ) -> Result<f64> {
        let mean = column_mean(data_matrix, target_col)
            .ok_or_else(|| PreprocessingError::NoValidValues(col_name.to_string()))?;

        let mut distances: Vec<(f64, f64)> = complete_rows
            .iter()
            .filter_map(|&row| {
                let candidate = &data_matrix[row];
                candidate[target_col].map(|value| {
                    let distance =
                        calculate_distance(&data_matrix[target_row], candidate, target_col);
                    (distance, value)
                })
            })
            .collect();

        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        for &(distance, value) in distances.iter().take(self.n_neighbors) {
            let weight = if distance < 1e-10 { 1e10 } else { 1.0 / distance };
            weighted_sum += value * weight;
            weight_sum += weight;
        }

        if weight_sum > 0.0 && weight_sum.is_finite() {
            Ok(weighted_sum / weight_sum)
        } else {
            Ok(mean)
        }
    }
}

/// Euclidean distance between two rows over their shared non-null features,
/// normalised by the number of features used. The imputed column is skipped.
fn calculate_distance(row1: &[Option<f64>], row2: &[Option<f64>], skip_col: usize) -> f64 {
    let mut sum_squared_diff = 0.0;
    let mut count = 0;

    for (col_idx, (a, b)) in row1.iter().zip(row2).enumerate() {
        if col_idx == skip_col {
            continue;
        }
        if let (Some(a), Some(b)) = (a, b) {
            let diff = a - b;
            sum_squared_diff += diff * diff;
            count += 1;
        }
    }

    if count > 0 {
        (sum_squared_diff / count as f64).sqrt()
    } else {
        f64::INFINITY
    }
}
