//! CLI entry point for the dataset manager.
//!
//! Prints information about a CSV dataset, selects and transforms columns and
//! optionally saves the result.

use anyhow::{Result, anyhow};
use clap::{ArgAction, Parser};
use fitbench_processing::{
    ColumnSelector, Dataset, PreprocessingConfig, TextTable, apply_definition, config,
    fill_empty, horizontal_rule,
};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Number of rows shown for the dataset head.
const HEAD_ROWS: usize = 5;

#[derive(Parser, Debug)]
#[command(
    name = "fitbench-dataset",
    version,
    about = "Inspect, select and transform the columns of a CSV dataset",
    long_about = "Inspect, select and transform the columns of a CSV dataset.\n\n\
                  EXAMPLES:\n  \
                  # Dataset information\n  \
                  fitbench-dataset data.csv\n\n  \
                  # Keep the first three columns and the last one, then double the second\n  \
                  fitbench-dataset data.csv --select 0-2 -1 --apply \"1 -> * 2\"\n\n  \
                  # Fill the gaps of two named columns and save the result\n  \
                  fitbench-dataset data.csv --select '*' --apply \"age salary -> fillna 0\" --save-to out.csv"
)]
struct Args {
    /// Path to the CSV dataset
    dataset: PathBuf,

    /// Separator between the two ends of a columns interval
    #[arg(long)]
    columns_interval_separator: Option<String>,

    /// Do not print the initial dataset information
    #[arg(long)]
    hide_info: bool,

    /// Columns to keep: indexes, negative indexes, names, intervals or '*'
    #[arg(long, num_args = 1.., action = ArgAction::Append, allow_negative_numbers = true)]
    select: Vec<String>,

    /// Operations applied to the selected dataset, e.g. "1 2 -> * 2 -> + 1"
    ///
    /// Operations: '+ n', '- n', '* n', '/ n', '** n', '= v', 'fillna v',
    /// 'strip', 'upper', 'lower'.
    #[arg(long, action = ArgAction::Append, allow_hyphen_values = true)]
    apply: Vec<String>,

    /// Write the selected dataset to this CSV file
    #[arg(long)]
    save_to: Option<PathBuf>,

    /// JSON preprocessing configuration; explicit flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Show debug logs
    #[arg(short, long)]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
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
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    let separator = resolve_separator(&args)?;
    let selector = ColumnSelector::new(separator);

    if !args.dataset.exists() {
        return Err(anyhow!("Dataset file not found: {}", args.dataset.display()));
    }
    let dataset = Dataset::from_csv(&args.dataset)?;

    if !args.hide_info {
        print_dataset_info(&dataset)?;
    }

    let mut selected = if args.select.is_empty() {
        dataset
    } else {
        let columns = selector.selected_columns(&dataset, &args.select, true)?;
        debug!("Selected columns: {:?}", columns);
        dataset.select(&columns)?
    };

    for definition in &args.apply {
        info!("Applying '{}'", definition);
        apply_definition(&mut selected, &selector, definition)?;
    }

    if !args.select.is_empty() || !args.apply.is_empty() {
        print!("{}", horizontal_rule(Some("Selected dataset")));
        println!("{}", selected.frame());
    }

    if let Some(path) = &args.save_to {
        save_dataset(&selected, path)?;
    }

    Ok(())
}

/// Separator from the flag, else from `--config`, else the default.
fn resolve_separator(args: &Args) -> Result<String> {
    let separator = match (&args.columns_interval_separator, &args.config) {
        (Some(separator), _) => separator.clone(),
        (None, Some(path)) => PreprocessingConfig::from_json_file(path)?.columns_interval_separator,
        (None, None) => config::DEFAULT_COLUMNS_INTERVAL_SEPARATOR.to_string(),
    };
    config::validate_separator(&separator)?;
    Ok(separator)
}

fn print_dataset_info(dataset: &Dataset) -> Result<()> {
    print!("{}", horizontal_rule(Some("Initial dataset")));
    println!("{}", dataset.head(HEAD_ROWS));

    println!("{}", info_table(dataset)?.draw());
    println!("{}", null_values_table(dataset)?.draw());

    let mut categorical: Vec<Vec<String>> = dataset
        .categorical_column_names()
        .into_iter()
        .map(|name| vec![name])
        .collect();
    fill_empty(&mut categorical, 1);
    let mut table = TextTable::new(["Categorical Features columns name"]);
    table.add_rows(categorical);
    println!("{}", table.draw());
    Ok(())
}

/// Per column dtype and non-null count.
fn info_table(dataset: &Dataset) -> Result<TextTable> {
    let mut table = TextTable::new(["#", "Column", "Non-Null Count", "Dtype"]);
    for index in 0..dataset.width() {
        let series = dataset.series(index)?;
        table.add_row([
            index.to_string(),
            series.name().to_string(),
            format!("{} non-null", series.len() - series.null_count()),
            series.dtype().to_string(),
        ]);
    }
    Ok(table)
}

/// Columns holding nulls, the most incomplete first.
fn null_values_table(dataset: &Dataset) -> Result<TextTable> {
    let all_columns: Vec<usize> = (0..dataset.width()).collect();
    let mut counts = dataset.count_null_values(&all_columns);
    counts.sort_by(|a, b| b.1.cmp(&a.1));

    let mut rows = Vec::with_capacity(counts.len());
    for (index, count) in counts {
        rows.push(vec![dataset.column_name(index)?, count.to_string()]);
    }
    fill_empty(&mut rows, 2);

    let mut table = TextTable::new(["Column Name", "Number of Null values"]);
    table.add_rows(rows);
    Ok(table)
}

fn save_dataset(dataset: &Dataset, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    dataset.write_csv(path)?;
    print!(
        "{}",
        horizontal_rule(Some(&format!("Dataset saved to {}", path.display())))
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("fitbench-dataset").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_help_examples_parse() {
        let args = parse(&["data.csv", "--select", "0-2", "-1", "--apply", "1 -> * 2"]);
        assert_eq!(args.select, ["0-2", "-1"]);
        assert_eq!(args.apply, ["1 -> * 2"]);

        let args = parse(&[
            "data.csv",
            "--select",
            "*",
            "--apply",
            "age salary -> fillna 0",
            "--save-to",
            "out.csv",
        ]);
        assert_eq!(args.select, ["*"]);
        assert_eq!(args.save_to, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_negative_indexes_and_following_flags() {
        let args = parse(&["data.csv", "--apply", "-1 -> upper", "--select", "-2", "-1", "--hide-info"]);
        assert_eq!(args.apply, ["-1 -> upper"]);
        assert_eq!(args.select, ["-2", "-1"]);
        assert!(args.hide_info);
    }

    #[test]
    fn test_repeated_flags_are_appended() {
        let args = parse(&["data.csv", "--apply", "0 -> upper", "--apply", "1 -> + 1", "-q"]);
        assert_eq!(args.apply, ["0 -> upper", "1 -> + 1"]);
        assert!(args.quiet);
    }

    #[test]
    fn test_unknown_flag_is_rejected() {
        assert!(Args::try_parse_from(["fitbench-dataset", "data.csv", "--select", "0", "-x"]).is_err());
    }

    #[test]
    fn test_separator_precedence() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(br#"{"columns_interval_separator": ":"}"#).unwrap();
        let config = file.path().to_str().unwrap();

        let args = parse(&["data.csv"]);
        assert_eq!(resolve_separator(&args).unwrap(), config::DEFAULT_COLUMNS_INTERVAL_SEPARATOR);

        let args = parse(&["data.csv", "--config", config]);
        assert_eq!(resolve_separator(&args).unwrap(), ":");

        let args = parse(&["data.csv", "--config", config, "--columns-interval-separator", ";"]);
        assert_eq!(resolve_separator(&args).unwrap(), ";");
    }
}
