//! Training and test sets built from one dataset for model selection.
//!
//! [`ModelSelectionDataset::load`] runs the whole preparation: column
//! resolution, missing data handling on the features, target label encoding,
//! categorical encoding, dense conversion and the seeded split. The fitted
//! encoding is kept so rows typed for prediction go through the same
//! transformation as the training rows.

use crate::config::ModelSelectionConfig;
use crate::error::{LearningError, Result, ResultExt};
use fitbench_processing::utils::{series_to_f64, series_to_strings};
use fitbench_processing::{
    CategoricalDataPreprocessor, ColumnSelector, Dataset, FittedEncoding, MissingDataPreprocessor,
    PreprocessingConfig, ScalarValue, format_any_value, format_float, is_categorical_dtype,
    label_encode_target, train_test_split,
};
use ndarray::{Array1, Array2, Axis};
use polars::prelude::*;
use tracing::{debug, info};

/// Prefix of the predicted dependent variable header.
pub const PREDICTED_HEADER_PREFIX: &str = "Predicted ";

/// Original test rows shown next to the predictions of a model.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonRows {
    /// Feature values after imputation, before encoding.
    pub features: Vec<Vec<String>>,
    /// Target values as read from the dataset.
    pub targets: Vec<String>,
}

impl ComparisonRows {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Encoded training and test sets plus what is needed to encode new rows
/// and decode predictions.
#[derive(Debug, Clone)]
pub struct ModelSelectionDataset {
    independent_headers: Vec<String>,
    dependent_header: String,
    feature_dtypes: Vec<DataType>,
    encoding: FittedEncoding,
    labels: Option<Vec<String>>,
    integer_target: bool,
    n_samples: usize,
    x_train: Array2<f64>,
    x_test: Array2<f64>,
    y_train: Array1<f64>,
    y_test: Array1<f64>,
    comparison: Option<ComparisonRows>,
}

impl ModelSelectionDataset {
    /// Load the dataset named by `config` and prepare the training and test sets.
    pub fn load(config: &ModelSelectionConfig, preprocessing: &PreprocessingConfig) -> Result<Self> {
        let dataset = Dataset::from_csv(&config.dataset)
            .context(format!("Failed to load dataset '{}'", config.dataset.display()))?;
        Self::from_dataset(&dataset, config, preprocessing)
    }

    /// Prepare the training and test sets from an already loaded dataset.
    pub fn from_dataset(
        dataset: &Dataset,
        config: &ModelSelectionConfig,
        preprocessing: &PreprocessingConfig,
    ) -> Result<Self> {
        let selector = ColumnSelector::new(&preprocessing.columns_interval_separator);
        let dependent_index = dependent_column_index(&selector, dataset, config)?;
        let independent_indexes = independent_columns_indexes(&selector, dataset, config)?;
        if independent_indexes.contains(&dependent_index) {
            return Err(LearningError::DependentColumnConflict);
        }

        let mut features = dataset.select(&independent_indexes)?;
        let independent_headers = features.headers();
        let dependent_header = dataset.column_name(dependent_index)?;
        debug!(
            dependent = %dependent_header,
            independent = ?independent_headers,
            "Variables resolved"
        );

        let summary = MissingDataPreprocessor::new(preprocessing.clone()).handle_data(&mut features)?;
        let mut target = dataset.series(dependent_index)?.clone();
        if let Some(retained_rows) = &summary.retained_rows {
            target = target.filter(retained_rows)?;
        }
        if features.height() == 0 {
            return Err(LearningError::InvalidData(
                "No rows left once missing data is handled".to_string(),
            ));
        }
        if target.null_count() > 0 {
            return Err(LearningError::InvalidData(format!(
                "The dependent variable column '{}' holds {} missing values",
                dependent_header,
                target.null_count()
            )));
        }

        let (y, labels) = encode_target(&target)?;
        let integer_target = labels.is_none() && target.dtype().is_integer();
        let feature_dtypes = features.frame().dtypes();
        let original_features = config.shows_comparisons().then(|| features.clone());

        let mut encoder = CategoricalDataPreprocessor::new(preprocessing.clone());
        let encoding = encoder.fit(&features)?;
        encoding.transform(&mut features)?;
        let x = to_matrix(&features)?;

        let n_samples = x.nrows();
        let (train_indexes, test_indexes) =
            train_test_split(n_samples, config.split_test_size, config.split_random_state);
        if train_indexes.is_empty() {
            return Err(LearningError::InvalidData(format!(
                "Not enough rows ({}) to keep a training set with a test size of {}",
                n_samples, config.split_test_size
            )));
        }

        let comparison = match original_features {
            Some(original) => Some(comparison_rows(
                &original,
                &target,
                &test_indexes,
                config.nb_prediction_lines_to_show,
            )?),
            None => None,
        };

        encoder.print_accumulated_encoding_results();

        let x_train = x.select(Axis(0), &train_indexes);
        let x_test = x.select(Axis(0), &test_indexes);
        let y_train = y.select(Axis(0), &train_indexes);
        let y_test = y.select(Axis(0), &test_indexes);
        info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            features = x.ncols(),
            "Dataset split"
        );

        Ok(Self {
            independent_headers,
            dependent_header,
            feature_dtypes,
            encoding,
            labels,
            integer_target,
            n_samples,
            x_train,
            x_test,
            y_train,
            y_test,
            comparison,
        })
    }

    pub fn x_train(&self) -> &Array2<f64> {
        &self.x_train
    }

    pub fn x_test(&self) -> &Array2<f64> {
        &self.x_test
    }

    pub fn y_train(&self) -> &Array1<f64> {
        &self.y_train
    }

    pub fn y_test(&self) -> &Array1<f64> {
        &self.y_test
    }

    /// Number of rows used for training and testing.
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Number of independent variables, before encoding.
    pub fn n_independent_variables(&self) -> usize {
        self.independent_headers.len()
    }

    pub fn independent_headers(&self) -> &[String] {
        &self.independent_headers
    }

    /// Dependent variable header, with an optional prefix such as
    /// [`PREDICTED_HEADER_PREFIX`].
    pub fn dependent_header(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.dependent_header)
    }

    /// Target labels indexed by code, for a categorical target.
    pub fn labels(&self) -> Option<&[String]> {
        self.labels.as_deref()
    }

    /// Original test rows, when predictions comparisons were requested.
    pub fn comparison(&self) -> Option<&ComparisonRows> {
        self.comparison.as_ref()
    }

    /// Render a predicted value the way the target is written in the dataset.
    pub fn decode(&self, value: f64) -> String {
        if let Some(labels) = &self.labels {
            let code = value.round();
            if code >= 0.0 {
                if let Some(label) = labels.get(code as usize) {
                    return label.clone();
                }
            }
        }
        if self.integer_target && value.fract() == 0.0 {
            return format!("{}", value as i64);
        }
        format_float(value)
    }

    /// Encode rows typed for prediction with the fitted encoding.
    ///
    /// Each row must hold one value per independent variable.
    pub fn user_rows_for_prediction(&self, rows: &[Vec<String>]) -> Result<Array2<f64>> {
        let expected = self.n_independent_variables();
        if let Some(row) = rows.iter().find(|row| row.len() != expected) {
            return Err(LearningError::InvalidPredictionArity {
                values: row
                    .iter()
                    .map(|value| format!("'{}'", value))
                    .collect::<Vec<_>>()
                    .join(", "),
                expected,
            });
        }

        let columns = self
            .independent_headers
            .iter()
            .zip(&self.feature_dtypes)
            .enumerate()
            .map(|(j, (header, dtype))| user_column(header, dtype, rows.iter().map(|row| row[j].as_str())))
            .collect::<Result<Vec<_>>>()?;

        let mut dataset = Dataset::from_frame(DataFrame::new(columns)?);
        self.encoding
            .transform(&mut dataset)
            .map_err(|e| LearningError::InvalidPredictionValue(e.to_string()))?;
        to_matrix(&dataset)
    }
}

static_assertions::assert_impl_all!(ModelSelectionDataset: Send, Sync);

fn dependent_column_index(
    selector: &ColumnSelector,
    dataset: &Dataset,
    config: &ModelSelectionConfig,
) -> Result<usize> {
    let columns = selector.selected_columns(dataset, &[config.dependent_variable_column.as_str()], false)?;
    match columns.as_slice() {
        [index] => Ok(*index),
        _ => Err(LearningError::InvalidData(format!(
            "The dependent variable definition '{}' must select exactly one column, got {}",
            config.dependent_variable_column,
            columns.len()
        ))),
    }
}

fn independent_columns_indexes(
    selector: &ColumnSelector,
    dataset: &Dataset,
    config: &ModelSelectionConfig,
) -> Result<Vec<usize>> {
    let columns = if config.independent_variables_columns.is_empty() {
        (0..dataset.width().saturating_sub(1)).collect()
    } else {
        selector.selected_columns(dataset, &config.independent_variables_columns, false)?
    };
    if columns.is_empty() {
        return Err(LearningError::InvalidData(
            "At least one independent variable column is required".to_string(),
        ));
    }
    Ok(columns)
}

/// Numeric target values, label encoded when the target is categorical.
fn encode_target(target: &Series) -> Result<(Array1<f64>, Option<Vec<String>>)> {
    if is_categorical_dtype(target.dtype()) {
        let values: Vec<String> = series_to_strings(target)?.into_iter().flatten().collect();
        let (codes, labels) = label_encode_target(&values);
        debug!(labels = ?labels, "Dependent variable label encoded");
        return Ok((Array1::from(codes), Some(labels)));
    }

    let values = series_to_f64(target)?
        .into_iter()
        .map(|value| {
            value.ok_or_else(|| {
                LearningError::InvalidData(format!(
                    "The dependent variable column '{}' holds non-numeric values",
                    target.name()
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok((Array1::from(values), None))
}

/// Dense matrix of a fully numeric dataset.
fn to_matrix(dataset: &Dataset) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((dataset.height(), dataset.width()));
    for (j, mut column) in matrix.columns_mut().into_iter().enumerate() {
        let series = dataset.series(j)?;
        for (cell, value) in column.iter_mut().zip(series_to_f64(series)?) {
            *cell = value.ok_or_else(|| {
                LearningError::InvalidData(format!(
                    "Column '{}' still holds missing or non-numeric values",
                    series.name()
                ))
            })?;
        }
    }
    Ok(matrix)
}

fn comparison_rows(
    features: &Dataset,
    target: &Series,
    test_indexes: &[usize],
    nb_rows: usize,
) -> Result<ComparisonRows> {
    let mut rows = ComparisonRows::default();
    for &row in test_indexes.iter().take(nb_rows) {
        let values = (0..features.width())
            .map(|j| Ok(format_any_value(&features.series(j)?.get(row)?)))
            .collect::<Result<Vec<_>>>()?;
        rows.features.push(values);
        rows.targets.push(format_any_value(&target.get(row)?));
    }
    Ok(rows)
}

/// One column of typed values, numeric when the training column was numeric.
fn user_column<'a>(
    header: &str,
    dtype: &DataType,
    values: impl Iterator<Item = &'a str>,
) -> Result<Column> {
    if is_categorical_dtype(dtype) {
        let values: Vec<String> = values.map(|value| value.trim().to_string()).collect();
        return Ok(Series::new(header.into(), values).into_column());
    }

    let values = values
        .map(|value| {
            ScalarValue::parse(value).as_f64().ok_or_else(|| {
                LearningError::InvalidPredictionValue(format!(
                    "'{}' is not a number, column '{}' is numeric",
                    value, header
                ))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Series::new(header.into(), values).into_column())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dataset() -> Dataset {
        Dataset::from_frame(
            df![
                "Country" => ["France", "Spain", "Germany", "Spain", "Germany", "France", "Spain", "France", "Germany", "France"],
                "Age" => [Some(44.0), Some(27.0), Some(30.0), Some(38.0), Some(40.0), Some(35.0), None, Some(48.0), Some(50.0), Some(37.0)],
                "Salary" => [72000.0, 48000.0, 54000.0, 61000.0, 63000.0, 58000.0, 52000.0, 79000.0, 83000.0, 67000.0],
                "Purchased" => ["No", "Yes", "No", "No", "Yes", "Yes", "No", "Yes", "No", "Yes"],
            ]
            .unwrap(),
        )
    }

    fn config() -> ModelSelectionConfig {
        ModelSelectionConfig::builder().dataset("unused.csv").build().unwrap()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn test_default_columns_and_label_encoded_target() {
        let prepared =
            ModelSelectionDataset::from_dataset(&dataset(), &config(), &PreprocessingConfig::default()).unwrap();

        assert_eq!(prepared.independent_headers(), ["Country", "Age", "Salary"]);
        assert_eq!(prepared.dependent_header(""), "Purchased");
        assert_eq!(prepared.dependent_header(PREDICTED_HEADER_PREFIX), "Predicted Purchased");
        assert_eq!(prepared.labels().unwrap(), ["No", "Yes"]);

        assert_eq!(prepared.n_samples(), 10);
        assert_eq!(prepared.x_test().nrows(), 2);
        assert_eq!(prepared.x_train().nrows(), 8);
        assert_eq!(prepared.y_train().len(), 8);
        // age, salary and two binary digits for the three countries
        assert_eq!(prepared.x_train().ncols(), 4);
        assert!(prepared.x_train().iter().all(|v| v.is_finite()));
        assert!(prepared.comparison().is_none());
    }

    #[test]
    fn test_dependent_column_conflict() {
        let config = ModelSelectionConfig::builder()
            .dataset("unused.csv")
            .independent_variables_columns(["Age-Purchased"])
            .build()
            .unwrap();
        let err = ModelSelectionDataset::from_dataset(&dataset(), &config, &PreprocessingConfig::default())
            .unwrap_err();
        assert!(matches!(err, LearningError::DependentColumnConflict));
    }

    #[test]
    fn test_dependent_column_must_be_unique() {
        let config = ModelSelectionConfig::builder()
            .dataset("unused.csv")
            .dependent_variable_column("Age-Salary")
            .independent_variables_columns(["0"])
            .build()
            .unwrap();
        let err = ModelSelectionDataset::from_dataset(&dataset(), &config, &PreprocessingConfig::default())
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_DATA");
    }

    #[test]
    fn test_deleted_rows_are_removed_from_target() {
        let preprocessing = PreprocessingConfig::builder()
            .numerical_imputation("Age -> DEL")
            .build()
            .unwrap();
        let prepared = ModelSelectionDataset::from_dataset(&dataset(), &config(), &preprocessing).unwrap();

        assert_eq!(prepared.n_samples(), 9);
        assert_eq!(prepared.y_train().len() + prepared.y_test().len(), 9);
    }

    #[test]
    fn test_numeric_target_and_comparison_rows() {
        let config = ModelSelectionConfig::builder()
            .dataset("unused.csv")
            .dependent_variable_column("Salary")
            .independent_variables_columns(["Age"])
            .show_predictions_for(["MLR"])
            .nb_prediction_lines_to_show(1)
            .build()
            .unwrap();
        let prepared =
            ModelSelectionDataset::from_dataset(&dataset(), &config, &PreprocessingConfig::default()).unwrap();

        assert!(prepared.labels().is_none());
        let comparison = prepared.comparison().unwrap();
        assert_eq!(comparison.len(), 1);
        assert_eq!(comparison.features[0].len(), 1);
        assert!(comparison.targets[0].ends_with(".0"));
    }

    // =========================================================================
    // Prediction rows and decoding
    // =========================================================================

    #[test]
    fn test_user_rows_for_prediction() {
        let prepared =
            ModelSelectionDataset::from_dataset(&dataset(), &config(), &PreprocessingConfig::default()).unwrap();

        let rows = vec![
            vec!["Spain".to_string(), "33".to_string(), "50000".to_string()],
            vec!["France".to_string(), "41.5".to_string(), "70000".to_string()],
        ];
        let x = prepared.user_rows_for_prediction(&rows).unwrap();

        assert_eq!(x.dim(), (2, 4));
        assert_eq!(x[[0, 0]], 33.0);
        assert_eq!(x[[1, 1]], 70000.0);
    }

    #[test]
    fn test_user_rows_arity_and_values() {
        let prepared =
            ModelSelectionDataset::from_dataset(&dataset(), &config(), &PreprocessingConfig::default()).unwrap();

        let err = prepared
            .user_rows_for_prediction(&[vec!["Spain".to_string(), "33".to_string()]])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid independent variables set to predict : ['Spain', '33'], expected 3 elements"
        );

        let err = prepared
            .user_rows_for_prediction(&[vec!["Spain".to_string(), "old".to_string(), "1".to_string()]])
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PREDICTION_VALUE");

        let err = prepared
            .user_rows_for_prediction(&[vec!["Italy".to_string(), "33".to_string(), "1".to_string()]])
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PREDICTION_VALUE");
    }

    #[test]
    fn test_decode() {
        let prepared =
            ModelSelectionDataset::from_dataset(&dataset(), &config(), &PreprocessingConfig::default()).unwrap();
        assert_eq!(prepared.decode(0.0), "No");
        assert_eq!(prepared.decode(1.0), "Yes");
        assert_eq!(prepared.decode(7.0), "7.0");

        let config = ModelSelectionConfig::builder()
            .dataset("unused.csv")
            .dependent_variable_column("Salary")
            .build()
            .unwrap();
        let preprocessing = PreprocessingConfig::default();
        let frame = dataset()
            .frame()
            .clone()
            .lazy()
            .with_column(col("Salary").cast(DataType::Int64))
            .collect()
            .unwrap();
        let prepared = ModelSelectionDataset::from_dataset(
            &Dataset::from_frame(frame).select(&[0, 1, 3, 2]).unwrap(),
            &config,
            &preprocessing,
        )
        .unwrap();
        assert_eq!(prepared.decode(52000.0), "52000");
        assert_eq!(prepared.decode(52000.5), "52000.5");
    }
}
