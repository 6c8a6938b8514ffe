//! Loaded tabular dataset.
//!
//! [`Dataset`] wraps a polars [`DataFrame`] and exposes the column level
//! queries used by the column parser and the preprocessors. String columns are
//! considered categorical, every other column is numerical.

use crate::error::{PreprocessingError, Result, ResultExt};
use crate::utils::{is_categorical_dtype, is_float};
use polars::prelude::*;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows sampled after the first line when sniffing for a header.
const HEADER_SNIFF_SAMPLE_ROWS: usize = 20;

/// Rows used by polars to infer the schema.
const SCHEMA_INFERENCE_ROWS: usize = 100;

/// A loaded table with string headers.
#[derive(Debug, Clone)]
pub struct Dataset {
    data: DataFrame,
}

impl Dataset {
    /// Load a CSV file, detecting whether its first line is a header.
    ///
    /// Files without a header get their columns named `"0".."n-1"`.
    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let has_header = sniff_header(path)?;
        debug!(path = %path.display(), has_header, "Loading dataset");

        let mut data = CsvReadOptions::default()
            .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
            .with_has_header(has_header)
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .context(format!("Failed to open dataset '{}'", path.display()))?
            .finish()
            .context(format!("Failed to parse dataset '{}'", path.display()))?;

        if !has_header {
            let names: Vec<String> = (0..data.width()).map(|i| i.to_string()).collect();
            data.set_column_names(names)?;
        }

        info!(
            rows = data.height(),
            columns = data.width(),
            "Dataset loaded from {}",
            path.display()
        );

        Ok(Self { data })
    }

    /// Wrap an existing frame.
    pub fn from_frame(data: DataFrame) -> Self {
        Self { data }
    }

    pub fn frame(&self) -> &DataFrame {
        &self.data
    }

    pub fn frame_mut(&mut self) -> &mut DataFrame {
        &mut self.data
    }

    /// Column names in order.
    pub fn headers(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.data.width()
    }

    /// Number of rows.
    pub fn height(&self) -> usize {
        self.data.height()
    }

    /// Index of a column by name.
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.data
            .get_column_index(name)
            .ok_or_else(|| PreprocessingError::ColumnNotFound(name.to_string()))
    }

    /// Name of the column at `index`.
    pub fn column_name(&self, index: usize) -> Result<String> {
        self.data
            .get_column_names()
            .get(index)
            .map(|name| name.to_string())
            .ok_or_else(|| PreprocessingError::ColumnNotFound(index.to_string()))
    }

    /// Series at `index`.
    pub fn series(&self, index: usize) -> Result<&Series> {
        self.data
            .get_columns()
            .get(index)
            .map(|column| column.as_materialized_series())
            .ok_or_else(|| PreprocessingError::ColumnNotFound(index.to_string()))
    }

    /// Whether the column at `index` holds categorical values.
    pub fn is_categorical(&self, index: usize) -> bool {
        self.data
            .get_columns()
            .get(index)
            .is_some_and(|column| is_categorical_dtype(column.dtype()))
    }

    /// Names of the categorical (string) columns, in column order.
    pub fn categorical_column_names(&self) -> Vec<String> {
        self.data
            .get_columns()
            .iter()
            .filter(|column| is_categorical_dtype(column.dtype()))
            .map(|column| column.name().to_string())
            .collect()
    }

    /// Indexes of the categorical (string) columns.
    pub fn categorical_column_indexes(&self) -> Vec<usize> {
        (0..self.width())
            .filter(|&index| self.is_categorical(index))
            .collect()
    }

    /// `(index, null count)` of the given columns holding at least one null.
    pub fn count_null_values(&self, indexes: &[usize]) -> Vec<(usize, usize)> {
        indexes
            .iter()
            .filter_map(|&index| {
                let column = self.data.get_columns().get(index)?;
                let nulls = column.null_count();
                (nulls > 0).then_some((index, nulls))
            })
            .collect()
    }

    /// A new dataset made of the given columns in order.
    pub fn select(&self, indexes: &[usize]) -> Result<Dataset> {
        let names = indexes
            .iter()
            .map(|&index| self.column_name(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Dataset::from_frame(self.data.select(names)?))
    }

    /// First `n` rows.
    pub fn head(&self, n: usize) -> DataFrame {
        self.data.head(Some(n))
    }

    /// Write the dataset to a CSV file with a header line.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let mut file = File::create(path)?;
        let mut data = self.data.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut data)
            .context(format!("Failed to write dataset to '{}'", path.display()))?;
        info!("Dataset written to {}", path.display());
        Ok(())
    }
}

static_assertions::assert_impl_all!(Dataset: Send, Sync);

// =============================================================================
// Header Sniffing
// =============================================================================

/// Decide whether the first line of a CSV file is a header.
fn sniff_header(path: &Path) -> Result<bool> {
    let file = File::open(path)
        .map_err(PreprocessingError::from)
        .context(format!("Failed to open dataset '{}'", path.display()))?;
    let mut lines = BufReader::new(file).lines();

    let first = match lines.next() {
        Some(line) => line?,
        None => return Ok(false),
    };
    let mut samples = Vec::with_capacity(HEADER_SNIFF_SAMPLE_ROWS);
    for line in lines.take(HEADER_SNIFF_SAMPLE_ROWS) {
        let line = line?;
        if !line.trim().is_empty() {
            samples.push(split_csv_line(&line));
        }
    }

    Ok(has_header(&split_csv_line(&first), &samples))
}

/// Vote per column on whether `first` looks like a header for `samples`.
///
/// Numeric columns vote for a header when the first cell is not numeric.
/// String columns whose samples share one length vote for a header when the
/// first cell has another length.
pub fn has_header(first: &[String], samples: &[Vec<String>]) -> bool {
    let mut votes: i64 = 0;

    for (column, header_cell) in first.iter().enumerate() {
        let values: Vec<&str> = samples
            .iter()
            .filter_map(|row| row.get(column))
            .map(|value| value.as_str())
            .filter(|value| !value.is_empty())
            .collect();
        if values.is_empty() {
            continue;
        }

        if values.iter().all(|value| is_float(value)) {
            votes += if is_float(header_cell) { -1 } else { 1 };
            continue;
        }

        let length = values[0].chars().count();
        if values.iter().all(|value| value.chars().count() == length) {
            votes += if header_cell.chars().count() == length { -1 } else { 1 };
        }
    }

    votes > 0
}

/// Split one CSV line on commas, honouring double quotes.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches(['\r', '\n']).chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => cells.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    cells.push(current);
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        Dataset::from_frame(
            df![
                "Country" => [Some("France"), Some("Spain"), None, Some("France")],
                "Age" => [Some(44.0), None, Some(30.0), Some(38.0)],
                "Salary" => [Some(72000.0), Some(48000.0), Some(54000.0), None],
                "Purchased" => ["No", "Yes", "No", "No"],
            ]
            .unwrap(),
        )
    }

    fn rows(lines: &[&str]) -> Vec<Vec<String>> {
        lines.iter().map(|line| split_csv_line(line)).collect()
    }

    // ========================================================================
    // header sniffing tests
    // ========================================================================

    #[test]
    fn test_has_header_with_text_header_over_numbers() {
        let first = split_csv_line("a,b,c");
        let samples = rows(&["1,2,3", "4,5,6"]);
        assert!(has_header(&first, &samples));
    }

    #[test]
    fn test_has_header_without_header() {
        let first = split_csv_line("1,2,3");
        let samples = rows(&["4,5,6", "7,8,9"]);
        assert!(!has_header(&first, &samples));
    }

    #[test]
    fn test_has_header_with_string_lengths() {
        let first = split_csv_line("Country,Age");
        let samples = rows(&["FR,44", "ES,27"]);
        assert!(has_header(&first, &samples));
    }

    #[test]
    fn test_has_header_ignores_empty_cells() {
        let first = split_csv_line("x,y");
        let samples = rows(&["1,", ",2", "3,4"]);
        assert!(has_header(&first, &samples));
    }

    #[test]
    fn test_split_csv_line_quotes() {
        assert_eq!(
            split_csv_line(r#"a,"b,c","d""e""#),
            vec!["a".to_string(), "b,c".to_string(), "d\"e".to_string()]
        );
    }

    // ========================================================================
    // dataset queries
    // ========================================================================

    #[test]
    fn test_headers_and_shape() {
        let dataset = sample_dataset();
        assert_eq!(dataset.headers(), vec!["Country", "Age", "Salary", "Purchased"]);
        assert_eq!(dataset.width(), 4);
        assert_eq!(dataset.height(), 4);
    }

    #[test]
    fn test_column_index() {
        let dataset = sample_dataset();
        assert_eq!(dataset.column_index("Salary").unwrap(), 2);
        let err = dataset.column_index("Missing").unwrap_err();
        assert_eq!(err.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_categorical_columns() {
        let dataset = sample_dataset();
        assert_eq!(dataset.categorical_column_names(), vec!["Country", "Purchased"]);
        assert_eq!(dataset.categorical_column_indexes(), vec![0, 3]);
    }

    #[test]
    fn test_count_null_values() {
        let dataset = sample_dataset();
        assert_eq!(
            dataset.count_null_values(&[0, 1, 2, 3]),
            vec![(0, 1), (1, 1), (2, 1)]
        );
        assert!(dataset.count_null_values(&[3]).is_empty());
    }

    #[test]
    fn test_select_keeps_given_order() {
        let dataset = sample_dataset();
        let selected = dataset.select(&[2, 0]).unwrap();
        assert_eq!(selected.headers(), vec!["Salary", "Country"]);
        assert_eq!(selected.height(), 4);
    }
}
