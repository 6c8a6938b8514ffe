//! Missing data handling driven by imputation strategy codes.

use super::common::{
    ColumnsByStrategy, check_for_duplicate_columns, columns_by_strategy_code, columns_label,
    split_numerical_categorical, strategy_for,
};
use crate::config::PreprocessingConfig;
use crate::dataset::Dataset;
use crate::error::{PreprocessingError, Result, ResultExt};
use crate::imputers::{KnnImputer, MiceImputer, StatisticalImputer};
use crate::strategies::{ImputationStrategy, StrategyCode, codes_list};
use crate::table::{TextTable, fill_empty};
use polars::prelude::BooleanChunked;
use tracing::{debug, info};

/// Outcome of [`MissingDataPreprocessor::handle_data`].
#[derive(Debug, Clone)]
pub struct ImputationSummary {
    /// Columns imputed per strategy, in order of first column.
    pub groups: ColumnsByStrategy<ImputationStrategy>,
    /// Rows kept by `DEL`, relative to the dataset before imputation.
    pub retained_rows: Option<BooleanChunked>,
}

/// Fills or drops the missing values of a dataset.
///
/// Column indexes in the specific definitions are relative to the dataset
/// handed to [`handle_data`](Self::handle_data).
#[derive(Debug, Clone)]
pub struct MissingDataPreprocessor {
    config: PreprocessingConfig,
}

impl MissingDataPreprocessor {
    pub fn new(config: PreprocessingConfig) -> Self {
        Self { config }
    }

    /// Impute every column holding nulls and print the detail table.
    pub fn handle_data(&self, dataset: &mut Dataset) -> Result<ImputationSummary> {
        let groups = self.missing_data_columns_by_strategy(dataset)?;
        let headers = dataset.headers();

        if !self.config.skip_preprocessing_details {
            println!(
                "{}\n",
                self.imputation_table(&groups, &dataset.categorical_column_indexes(), &headers)
                    .draw()
            );
        }

        let mut retained_rows = None;
        for (strategy, columns) in groups.iter() {
            let names: Vec<String> = columns.iter().map(|&c| headers[c].clone()).collect();
            debug!("Applying {} to {:?}", strategy.code(), names);
            let frame = dataset.frame_mut();

            match strategy {
                ImputationStrategy::Delete => {
                    retained_rows = Some(StatisticalImputer::delete_missing_rows(frame, &names)?);
                }
                ImputationStrategy::Mean => StatisticalImputer::mean(frame, &names)?,
                ImputationStrategy::MostFrequent => {
                    StatisticalImputer::most_frequent(frame, &names)?
                }
                ImputationStrategy::Knn => {
                    KnnImputer::for_rows(frame.height()).fit_transform(frame, &names)?
                }
                ImputationStrategy::Mice => MiceImputer::new().fit_transform(frame, &names)?,
            }
        }

        info!(
            rows = dataset.height(),
            strategies = groups.iter().count(),
            "Missing data handled"
        );

        Ok(ImputationSummary {
            groups,
            retained_rows,
        })
    }

    /// Strategy of each column holding nulls, grouped by strategy.
    pub fn missing_data_columns_by_strategy(
        &self,
        dataset: &Dataset,
    ) -> Result<ColumnsByStrategy<ImputationStrategy>> {
        let config = &self.config;
        check_default(
            config.default_numerical_imputation,
            ImputationStrategy::NUMERICAL,
        )?;
        check_default(
            config.default_categorical_imputation,
            ImputationStrategy::CATEGORICAL,
        )?;

        let numerical = columns_by_strategy_code(
            dataset,
            &config.columns_interval_separator,
            &config.numerical_imputation,
            ImputationStrategy::NUMERICAL,
        )
        .context("Invalid numerical imputation strategy")?;
        let categorical = columns_by_strategy_code(
            dataset,
            &config.columns_interval_separator,
            &config.categorical_imputation,
            ImputationStrategy::CATEGORICAL,
        )
        .context("Invalid categorical imputation strategy")?;
        check_for_duplicate_columns(dataset, &[&numerical, &categorical])?;

        let categorical_indexes = dataset.categorical_column_indexes();
        let all_columns: Vec<usize> = (0..dataset.width()).collect();

        let mut result = ColumnsByStrategy::new();
        for (column, _) in dataset.count_null_values(&all_columns) {
            let strategy = if categorical_indexes.contains(&column) {
                strategy_for(column, config.default_categorical_imputation, &categorical)
            } else {
                strategy_for(column, config.default_numerical_imputation, &numerical)
            };
            result.add(strategy, [column]);
        }

        Ok(result)
    }

    /// `Imputation Code applied | Numerical Columns updated | Categorical Columns updated`
    pub fn imputation_table(
        &self,
        groups: &ColumnsByStrategy<ImputationStrategy>,
        categorical_indexes: &[usize],
        headers: &[String],
    ) -> TextTable {
        let mut rows: Vec<Vec<String>> = groups
            .iter()
            .map(|(strategy, columns)| {
                let (numerical, categorical) =
                    split_numerical_categorical(&columns, categorical_indexes);
                vec![
                    strategy.with_description(),
                    columns_label(&numerical, headers),
                    columns_label(&categorical, headers),
                ]
            })
            .collect();
        fill_empty(&mut rows, 3);

        let mut table = TextTable::new([
            "Imputation Code applied",
            "Numerical Columns updated",
            "Categorical Columns updated",
        ]);
        table.add_rows(rows);
        table
    }
}

fn check_default(strategy: ImputationStrategy, allowed: &[ImputationStrategy]) -> Result<()> {
    if allowed.contains(&strategy) {
        Ok(())
    } else {
        Err(PreprocessingError::InvalidStrategyCode {
            code: strategy.code().to_string(),
            expected: codes_list(allowed),
        })
    }
}
