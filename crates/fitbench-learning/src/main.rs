//! CLI entry point for model selection.
//!
//! `fitbench classify` and `fitbench regress` fit every classifier or
//! regressor on the same split of a CSV dataset and print their ranking.

use anyhow::{Context, Result, bail};
use chrono::Local;
use clap::{ArgAction, Args, Parser, Subcommand};
use fitbench_learning::{
    Classifier, ModelCode, ModelSelection, ModelSelectionConfig, ModelSelectionDataset, Regressor,
    format_elapsed, print_report, select_models,
};
use fitbench_processing::strategies::{codes_with_descriptions, parse_code};
use fitbench_processing::{EncodingStrategy, ImputationStrategy, PreprocessingConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(
    name = "fitbench",
    version,
    about = "Fit every classifier or regressor on a CSV dataset and rank them",
    long_about = "Fit every classifier or regressor on a CSV dataset and rank them.\n\n\
                  EXAMPLES:\n  \
                  # Rank the classifiers, the last column being the target\n  \
                  fitbench classify Social_Network_Ads.csv\n\n  \
                  # Rank the regressors and predict two rows with the linear models\n  \
                  fitbench regress salaries.csv --predict 5.5 --predict 12 --predict-only MLR POLY\n\n  \
                  # Predict one row of several values, the target being the first column\n  \
                  fitbench classify data.csv --dependent-variable-column 0 --independent-variables-columns 1-3 --predict \"Male 30 87000\"\n\n  \
                  # Compare the real and predicted values of the test set\n  \
                  fitbench classify data.csv --show-predictions-for DTC RFC --nb-prediction-lines-to-show 5"
)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Show debug logs
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Rank the classifiers by accuracy
    #[command(after_help = codes_help::<Classifier>("Classifier codes"))]
    Classify(SelectionArgs),

    /// Rank the regressors by R2 score
    #[command(after_help = codes_help::<Regressor>("Regressor codes"))]
    Regress(SelectionArgs),
}

#[derive(Args, Debug)]
struct SelectionArgs {
    /// Path to the CSV dataset
    dataset: Option<PathBuf>,

    /// Separator between the two ends of a columns interval
    #[arg(long)]
    columns_interval_separator: Option<String>,

    /// Dependent variable column: index, negative index or name (default: -1)
    #[arg(long, allow_negative_numbers = true)]
    dependent_variable_column: Option<String>,

    /// Independent variables columns (default: every column but the last)
    #[arg(long, num_args = 1.., action = ArgAction::Append, allow_negative_numbers = true)]
    independent_variables_columns: Vec<String>,

    /// Fraction of the rows kept for the test set (default: 0.2)
    #[arg(long)]
    split_test_size: Option<f64>,

    /// Seed of the train/test split and of the random forests (default: 0)
    #[arg(long)]
    split_random_state: Option<u64>,

    /// Standard-scale the target of the support vector regressor
    #[arg(long)]
    feature_scale_dependent_variables: bool,

    /// Whitespace separated independent values of one row to predict, e.g.
    /// "Male 30 87000"; repeat for several rows
    #[arg(long, action = ArgAction::Append, allow_hyphen_values = true)]
    predict: Vec<String>,

    /// Only print the predictions of these model codes
    #[arg(long, num_args = 1..)]
    predict_only: Option<Vec<String>>,

    /// Compare real and predicted test values for these model codes
    #[arg(long, num_args = 1..)]
    show_predictions_for: Option<Vec<String>>,

    /// Number of test rows in each comparison table (default: 10)
    #[arg(long)]
    nb_prediction_lines_to_show: Option<usize>,

    /// Imputation of numerical columns without a specific strategy
    #[arg(long)]
    default_numerical_imputation_strategy: Option<String>,

    /// Specific numerical imputations, e.g. "0 2 -> KNN"
    #[arg(long, num_args = 1.., action = ArgAction::Append)]
    numerical_imputation_strategy: Vec<String>,

    /// Imputation of categorical columns without a specific strategy
    #[arg(long)]
    default_categorical_imputation_strategy: Option<String>,

    /// Specific categorical imputations, e.g. "country -> DEL"
    #[arg(long, num_args = 1.., action = ArgAction::Append)]
    categorical_imputation_strategy: Vec<String>,

    /// Encoding of categorical columns without a specific strategy
    #[arg(long)]
    default_categorical_columns_encoding: Option<String>,

    /// Specific encodings, e.g. "0 -> ONEHOT"
    #[arg(long, num_args = 1.., action = ArgAction::Append)]
    categorical_columns_encoding: Vec<String>,

    /// Do not print the imputation and encoding tables
    #[arg(long)]
    skip_preprocessing_details: bool,

    /// JSON file with "model_selection" and "preprocessing" sections;
    /// explicit flags override its values
    #[arg(long)]
    config: Option<PathBuf>,
}

/// Layout of the `--config` file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    model_selection: ModelSelectionConfig,
    preprocessing: PreprocessingConfig,
}

impl ConfigFile {
    fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }
}

impl SelectionArgs {
    /// File values, or defaults, overridden by the flags given explicitly.
    fn resolve(&self) -> Result<(ModelSelectionConfig, PreprocessingConfig)> {
        let ConfigFile {
            model_selection: mut config,
            mut preprocessing,
        } = match &self.config {
            Some(path) => ConfigFile::from_json_file(path)?,
            None => ConfigFile::default(),
        };

        if let Some(dataset) = &self.dataset {
            config.dataset = dataset.clone();
        }
        if let Some(column) = &self.dependent_variable_column {
            config.dependent_variable_column = column.clone();
        }
        if !self.independent_variables_columns.is_empty() {
            config.independent_variables_columns = self.independent_variables_columns.clone();
        }
        if let Some(size) = self.split_test_size {
            config.split_test_size = size;
        }
        if let Some(seed) = self.split_random_state {
            config.split_random_state = seed;
        }
        config.feature_scale_dependent_variables |= self.feature_scale_dependent_variables;
        if !self.predict.is_empty() {
            config.predict = self
                .predict
                .iter()
                .map(|row| row.split_whitespace().map(str::to_string).collect())
                .collect();
        }
        if self.predict_only.is_some() {
            config.predict_only = self.predict_only.clone();
        }
        if self.show_predictions_for.is_some() {
            config.show_predictions_for = self.show_predictions_for.clone();
        }
        if let Some(lines) = self.nb_prediction_lines_to_show {
            config.nb_prediction_lines_to_show = lines;
        }

        if let Some(separator) = &self.columns_interval_separator {
            preprocessing.columns_interval_separator = separator.clone();
        }
        if let Some(code) = &self.default_numerical_imputation_strategy {
            preprocessing.default_numerical_imputation = parse_code(code, ImputationStrategy::NUMERICAL)?;
        }
        if !self.numerical_imputation_strategy.is_empty() {
            preprocessing.numerical_imputation = self.numerical_imputation_strategy.clone();
        }
        if let Some(code) = &self.default_categorical_imputation_strategy {
            preprocessing.default_categorical_imputation = parse_code(code, ImputationStrategy::CATEGORICAL)?;
        }
        if !self.categorical_imputation_strategy.is_empty() {
            preprocessing.categorical_imputation = self.categorical_imputation_strategy.clone();
        }
        if let Some(code) = &self.default_categorical_columns_encoding {
            preprocessing.default_encoding = parse_code(code, EncodingStrategy::ALL)?;
        }
        if !self.categorical_columns_encoding.is_empty() {
            preprocessing.categorical_encoding = self.categorical_columns_encoding.clone();
        }
        preprocessing.skip_preprocessing_details |= self.skip_preprocessing_details;

        if config.dataset.as_os_str().is_empty() {
            bail!("No dataset given: pass a dataset path or set model_selection.dataset in --config");
        }
        config.validate()?;
        preprocessing.validate()?;
        Ok((config, preprocessing))
    }
}

/// Model codes and preprocessing strategies listed after the options.
fn codes_help<M: ModelCode>(title: &str) -> String {
    format!(
        "{}:\n{}\n\nNumerical imputation strategies: {}\nCategorical imputation strategies: {}\nEncoding strategies: {}",
        title,
        M::codes_with_descriptions()
            .lines()
            .map(|line| format!("  {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        codes_with_descriptions(ImputationStrategy::NUMERICAL),
        codes_with_descriptions(ImputationStrategy::CATEGORICAL),
        codes_with_descriptions(EncodingStrategy::ALL),
    )
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
fn init_logging(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let start = Local::now();
    match &cli.command {
        Commands::Classify(args) => run::<Classifier>(args)?,
        Commands::Regress(args) => run::<Regressor>(args)?,
    }
    println!("\nProcessed in {}\n", format_elapsed(Local::now() - start));

    Ok(())
}

fn run<M: ModelCode>(args: &SelectionArgs) -> Result<()> {
    let (config, preprocessing) = args.resolve()?;
    debug!(?config, "Model selection configuration");

    // unknown codes fail before the models are fitted
    select_models::<M>(config.predict_only.as_deref())?;
    select_models::<M>(config.show_predictions_for.as_deref())?;

    if !config.dataset.exists() {
        bail!("Dataset file not found: {}", config.dataset.display());
    }

    let dataset = ModelSelectionDataset::load(&config, &preprocessing)?;
    info!("Evaluating {} {} models", M::all().len(), M::KIND);
    let selection = ModelSelection::<M>::evaluate(&dataset, &config)?;
    print_report(&selection, &dataset, &config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(args: &[&str]) -> SelectionArgs {
        let cli = Cli::try_parse_from(std::iter::once("fitbench").chain(args.iter().copied())).unwrap();
        match cli.command {
            Commands::Classify(args) | Commands::Regress(args) => args,
        }
    }

    fn rows(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|row| row.iter().map(|value| value.to_string()).collect())
            .collect()
    }

    // =========================================================================
    // Parsing
    // =========================================================================

    #[test]
    fn test_help_examples_parse() {
        let args = parse(&[
            "regress",
            "salaries.csv",
            "--predict",
            "5.5",
            "--predict",
            "12",
            "--predict-only",
            "MLR",
            "POLY",
        ]);
        assert_eq!(args.predict, ["5.5", "12"]);
        assert_eq!(args.predict_only, Some(vec!["MLR".to_string(), "POLY".to_string()]));

        let (config, _) = args.resolve().unwrap();
        assert_eq!(config.predict, rows(&[&["5.5"], &["12"]]));

        let args = parse(&[
            "classify",
            "data.csv",
            "--show-predictions-for",
            "DTC",
            "RFC",
            "--nb-prediction-lines-to-show",
            "5",
        ]);
        assert_eq!(args.show_predictions_for, Some(vec!["DTC".to_string(), "RFC".to_string()]));
        assert_eq!(args.nb_prediction_lines_to_show, Some(5));
    }

    #[test]
    fn test_negative_indexes_do_not_swallow_flags() {
        let args = parse(&[
            "classify",
            "data.csv",
            "--independent-variables-columns",
            "0",
            "1",
            "--dependent-variable-column",
            "-1",
            "--split-test-size",
            "0.25",
        ]);
        assert_eq!(args.independent_variables_columns, ["0", "1"]);
        assert_eq!(args.dependent_variable_column.as_deref(), Some("-1"));
        assert_eq!(args.split_test_size, Some(0.25));

        let args = parse(&["classify", "data.csv", "--independent-variables-columns", "-3", "-2", "-v"]);
        assert_eq!(args.independent_variables_columns, ["-3", "-2"]);
    }

    #[test]
    fn test_each_predict_occurrence_is_one_row() {
        let args = parse(&[
            "classify",
            "data.csv",
            "--predict",
            "Male 30 87000",
            "--predict",
            "-1.5  2 Female",
            "--skip-preprocessing-details",
        ]);
        assert!(args.skip_preprocessing_details);

        let (config, _) = args.resolve().unwrap();
        assert_eq!(
            config.predict,
            rows(&[&["Male", "30", "87000"], &["-1.5", "2", "Female"]])
        );
    }

    #[test]
    fn test_empty_predict_row_is_rejected() {
        let args = parse(&["classify", "data.csv", "--predict", " "]);
        assert!(args.resolve().is_err());
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn test_flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            br#"{
                "model_selection": {"dataset": "from_file.csv", "split_test_size": 0.3, "dependent_variable_column": "0"},
                "preprocessing": {"columns_interval_separator": ":", "default_numerical_imputation": "MICE"}
            }"#,
        )
        .unwrap();
        let path = file.path().to_str().unwrap();

        let (config, preprocessing) = parse(&["classify", "--config", path]).resolve().unwrap();
        assert_eq!(config.dataset, PathBuf::from("from_file.csv"));
        assert_eq!(config.split_test_size, 0.3);
        assert_eq!(preprocessing.default_numerical_imputation, ImputationStrategy::Mice);

        let (config, preprocessing) = parse(&[
            "classify",
            "data.csv",
            "--config",
            path,
            "--split-test-size",
            "0.25",
            "--default-numerical-imputation-strategy",
            "KNN",
        ])
        .resolve()
        .unwrap();
        assert_eq!(config.dataset, PathBuf::from("data.csv"));
        assert_eq!(config.split_test_size, 0.25);
        assert_eq!(config.dependent_variable_column, "0");
        assert_eq!(preprocessing.columns_interval_separator, ":");
        assert_eq!(preprocessing.default_numerical_imputation, ImputationStrategy::Knn);
    }

    #[test]
    fn test_missing_dataset_is_rejected() {
        let err = parse(&["regress"]).resolve().unwrap_err();
        assert!(err.to_string().starts_with("No dataset given"));
    }

    #[test]
    fn test_invalid_strategy_code_is_rejected() {
        let args = parse(&["regress", "data.csv", "--default-categorical-columns-encoding", "XYZ"]);
        assert!(args.resolve().is_err());
    }
}
