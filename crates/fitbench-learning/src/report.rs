//! Console report of a model selection: the ranking table, the predictions
//! of the rows given on the command line and the test set comparisons.

use crate::config::ModelSelectionConfig;
use crate::dataset_manager::{ComparisonRows, ModelSelectionDataset, PREDICTED_HEADER_PREFIX};
use crate::error::{LearningError, Result};
use crate::models::{ModelCode, Task};
use crate::selection::{Evaluation, FittedModel, ModelSelection, select_models};
use chrono::TimeDelta;
use fitbench_processing::{ScalarValue, TextTable};
use ndarray::Array1;

const CLASSIFICATION_HEADER: [&str; 8] = [
    "Classification Model",
    "Accuracy Score",
    "Number of True Positives",
    "Number of False Positives",
    "Number of True Negatives",
    "Number of False Negatives",
    "Number of True Predictions",
    "Number of False Predictions",
];

const REGRESSION_HEADER: [&str; 2] = ["Regression Model", "R2 Score"];

/// Scores are printed with 20 decimals.
pub fn format_score(score: f64) -> String {
    format!("{:.20}", score)
}

/// `H:MM:SS` followed by `.micros` when the microseconds are not zero.
pub fn format_elapsed(elapsed: TimeDelta) -> String {
    let total_micros = elapsed.num_microseconds().unwrap_or(i64::MAX).max(0);
    let micros = total_micros % 1_000_000;
    let seconds = total_micros / 1_000_000;
    let (hours, minutes, seconds) = (seconds / 3600, seconds / 60 % 60, seconds % 60);

    if micros == 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}:{:02}.{:06}", hours, minutes, seconds, micros)
    }
}

/// Ranking table, one row per evaluation in the given order.
pub fn evaluations_table<M: ModelCode>(evaluations: &[Evaluation<M>]) -> TextTable {
    match M::TASK {
        Task::Classification => {
            let mut table = TextTable::new(CLASSIFICATION_HEADER);
            for evaluation in evaluations {
                let mut row = vec![
                    evaluation.model.display_name().to_string(),
                    format_score(evaluation.score),
                ];
                if let Some(cm) = &evaluation.confusion_matrix {
                    row.extend(
                        [
                            cm.true_positives(),
                            cm.false_positives(),
                            cm.true_negatives(),
                            cm.false_negatives(),
                            cm.true_predictions(),
                            cm.false_predictions(),
                        ]
                        .map(|count| count.to_string()),
                    );
                }
                table.add_row(row);
            }
            table
        }
        Task::Regression => {
            let mut table = TextTable::new(REGRESSION_HEADER);
            for evaluation in evaluations {
                table.add_row([
                    evaluation.model.display_name().to_string(),
                    format_score(evaluation.score),
                ]);
            }
            table
        }
    }
}

/// Rows typed for prediction followed by the decoded prediction.
pub fn predictions_table(
    dataset: &ModelSelectionDataset,
    rows: &[Vec<String>],
    predictions: &Array1<f64>,
) -> TextTable {
    let mut header = dataset.independent_headers().to_vec();
    header.push(dataset.dependent_header(PREDICTED_HEADER_PREFIX));

    let mut table = TextTable::new(header);
    for (row, &prediction) in rows.iter().zip(predictions.iter()) {
        let mut cells: Vec<String> = row.iter().map(|value| ScalarValue::parse(value).to_string()).collect();
        cells.push(dataset.decode(prediction));
        table.add_row(cells);
    }
    table
}

/// Original test rows with their real and predicted target.
pub fn comparison_table(
    dataset: &ModelSelectionDataset,
    comparison: &ComparisonRows,
    predictions: &Array1<f64>,
) -> TextTable {
    let mut header = dataset.independent_headers().to_vec();
    header.push(dataset.dependent_header(""));
    header.push(dataset.dependent_header(PREDICTED_HEADER_PREFIX));

    let mut table = TextTable::new(header);
    for ((features, target), &prediction) in comparison
        .features
        .iter()
        .zip(&comparison.targets)
        .zip(predictions.iter())
    {
        let mut cells = features.clone();
        cells.push(target.clone());
        cells.push(dataset.decode(prediction));
        table.add_row(cells);
    }
    table
}

/// Print the ranking, then the requested predictions and comparisons.
///
/// # Errors
///
/// Fails on an unknown model code or a row that cannot be encoded. Codes are
/// checked before anything is printed.
pub fn print_report<M: ModelCode>(
    selection: &ModelSelection<M>,
    dataset: &ModelSelectionDataset,
    config: &ModelSelectionConfig,
) -> Result<()> {
    let predicting = select_models::<M>(config.predict_only.as_deref())?;
    let comparing = match config.show_predictions_for.as_deref() {
        Some(codes) => select_models::<M>(Some(codes))?,
        None => Vec::new(),
    };

    println!("{}\n", evaluations_table(selection.evaluations()).draw());

    if !config.predict.is_empty() {
        let x = dataset.user_rows_for_prediction(&config.predict)?;
        for model in predicting {
            let predictions = fitted_model(selection, model)?.predict(&x)?;
            println!("\n{} predictions", model.display_name());
            println!("{}\n", predictions_table(dataset, &config.predict, &predictions).draw());
        }
    }

    if let Some(comparison) = dataset.comparison() {
        for model in comparing {
            let predictions = fitted_model(selection, model)?.test_predictions();
            println!("\n{} predictions comparison", model.display_name());
            println!("{}\n", comparison_table(dataset, comparison, predictions).draw());
        }
    }

    Ok(())
}

fn fitted_model<M: ModelCode>(
    selection: &ModelSelection<M>,
    model: M,
) -> Result<&FittedModel<M>> {
    selection
        .fitted(model)
        .ok_or(LearningError::NotFitted(model.display_name()))
}
