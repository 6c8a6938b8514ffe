//! Column selection and operation definitions parser.
//!
//! A columns definition is a list of whitespace separated tokens, each one
//! being an index (negative indexes count from the end), a column name, an
//! inclusive interval `start<sep>end` or `*` for all columns.
//!
//! An operation definition prefixes operations with the columns they apply to:
//! `cols -> OP [-> OP ...]`.

use crate::dataset::Dataset;
use crate::error::{PreprocessingError, Result};
use crate::utils::parse_int;
use std::collections::BTreeSet;

/// Symbol separating the columns from each operation.
pub const OPERATION_LEADING_SYMBOL: &str = "->";

/// Token selecting every column.
pub const ALL_COLUMNS_SYMBOL: &str = "*";

/// Examples appended to the invalid operation definition error.
pub const OPERATIONS_DEFINITION_EXAMPLES: &str = "e.g. : '1 2 3 4 -> fillna 0 -> strip', or '1-4 -> / 2 -> + 42', or 'col1 col2 -> = 99',  or 'col0-col2 -> * 5', where each operation applies to a cell value.";

/// Resolves column tokens against a dataset's headers.
#[derive(Debug, Clone)]
pub struct ColumnSelector {
    separator: String,
}

impl ColumnSelector {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
        }
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Split an operation definition into its selected columns and operations.
    pub fn columns_and_operations(
        &self,
        dataset: &Dataset,
        definition: &str,
        all_selectable: bool,
    ) -> Result<(Vec<usize>, Vec<String>)> {
        let definition = definition.trim();
        if !definition.contains(OPERATION_LEADING_SYMBOL) {
            return Err(PreprocessingError::InvalidOperationDefinition {
                definition: definition.to_string(),
                examples: OPERATIONS_DEFINITION_EXAMPLES.to_string(),
            });
        }

        let mut parts = definition.split(OPERATION_LEADING_SYMBOL);
        let columns_part = parts.next().unwrap_or_default();
        let operations = parts.map(|operation| operation.trim().to_string()).collect();

        let tokens: Vec<&str> = columns_part.split_whitespace().collect();
        let columns = self.selected_columns(dataset, &tokens, all_selectable)?;
        Ok((columns, operations))
    }

    /// Union of several token groups, sorted.
    pub fn all_selected_columns<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        groups: &[Vec<S>],
        all_selectable: bool,
    ) -> Result<Vec<usize>> {
        let mut selected = BTreeSet::new();
        for group in groups {
            selected.extend(self.selected_columns(dataset, group, all_selectable)?);
        }
        Ok(selected.into_iter().collect())
    }

    /// Resolve a list of tokens into a sorted set of column indexes.
    ///
    /// Tokens holding whitespace are split further, so `["0 2", "3"]` and
    /// `["0", "2", "3"]` select the same columns.
    pub fn selected_columns<S: AsRef<str>>(
        &self,
        dataset: &Dataset,
        tokens: &[S],
        all_selectable: bool,
    ) -> Result<Vec<usize>> {
        let width = dataset.width();
        let mut selected = BTreeSet::new();

        for token in tokens.iter().flat_map(|token| token.as_ref().split_whitespace()) {
            if let Some(index) = parse_int(token) {
                selected.insert(self.checked_index(width, index, token)?);
            } else if token.contains(self.separator.as_str()) {
                let bounds: Vec<&str> = token.split(self.separator.as_str()).collect();
                if bounds.len() != 2 {
                    return Err(self.bad_token(token));
                }
                let start = self.checked_index(width, self.raw_index(dataset, bounds[0], token)?, token)?;
                let end = self.checked_index(width, self.raw_index(dataset, bounds[1], token)?, token)?;
                if start > end {
                    return Err(self.bad_token(token));
                }
                selected.extend(start..=end);
            } else if token == ALL_COLUMNS_SYMBOL {
                if !all_selectable {
                    return Err(PreprocessingError::AllColumnsNotAllowed);
                }
                selected.extend(0..width);
            } else {
                selected.insert(self.raw_index(dataset, token, token)? as usize);
            }
        }

        Ok(selected.into_iter().collect())
    }

    /// Index of an interval end or column name, before negative handling.
    fn raw_index(&self, dataset: &Dataset, column: &str, token: &str) -> Result<i64> {
        if let Some(index) = parse_int(column) {
            return Ok(index);
        }
        dataset
            .column_index(column)
            .map(|index| index as i64)
            .map_err(|_| self.bad_token(token))
    }

    /// Convert a negative index and check bounds.
    fn checked_index(&self, width: usize, index: i64, token: &str) -> Result<usize> {
        let index = if index < 0 { width as i64 + index } else { index };
        if index < 0 || index >= width as i64 {
            return Err(self.bad_token(token));
        }
        Ok(index as usize)
    }

    fn bad_token(&self, token: &str) -> PreprocessingError {
        PreprocessingError::InvalidColumnsInterval {
            token: token.to_string(),
            separator: self.separator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    fn dataset() -> Dataset {
        Dataset::from_frame(
            df![
                "col0" => [1, 2],
                "col1" => [3, 4],
                "col2" => [5, 6],
                "col3" => ["a", "b"],
                "col4" => [7.0, 8.0],
            ]
            .unwrap(),
        )
    }

    fn select(tokens: &[&str]) -> Result<Vec<usize>> {
        ColumnSelector::new("-").selected_columns(&dataset(), tokens, true)
    }

    // ========================================================================
    // selected_columns() tests
    // ========================================================================

    #[test]
    fn test_select_by_index() {
        assert_eq!(select(&["3", "0"]).unwrap(), vec![0, 3]);
    }

    #[test]
    fn test_select_by_negative_index() {
        assert_eq!(select(&["-1"]).unwrap(), vec![4]);
        assert_eq!(select(&["-5"]).unwrap(), vec![0]);
    }

    #[test]
    fn test_select_out_of_bounds() {
        let err = select(&["5"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid columns interval definition : 5, with the separator '-', expected one inbound and one outbound inclusive intervals"
        );
        assert!(select(&["-6"]).is_err());
    }

    #[test]
    fn test_select_interval_by_index_and_name() {
        assert_eq!(select(&["1-3"]).unwrap(), vec![1, 2, 3]);
        assert_eq!(select(&["col1-col2"]).unwrap(), vec![1, 2]);
        assert_eq!(select(&["col3-4"]).unwrap(), vec![3, 4]);
        assert_eq!(select(&["2-2"]).unwrap(), vec![2]);
    }

    #[test]
    fn test_select_interval_with_negative_ends() {
        let selector = ColumnSelector::new(":");
        let selected = selector.selected_columns(&dataset(), &["-3:-1"], true).unwrap();
        assert_eq!(selected, vec![2, 3, 4]);
    }

    #[test]
    fn test_select_interval_errors() {
        assert!(select(&["3-1"]).is_err());
        assert!(select(&["1-2-3"]).is_err());
        assert!(select(&["1-unknown"]).is_err());
        assert!(select(&["1-9"]).is_err());
    }

    #[test]
    fn test_select_all() {
        assert_eq!(select(&["*"]).unwrap(), vec![0, 1, 2, 3, 4]);

        let err = ColumnSelector::new("-")
            .selected_columns(&dataset(), &["*"], false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "It's not allowed to select all the columns with '*'"
        );
    }

    #[test]
    fn test_select_by_name() {
        assert_eq!(select(&["col4", "col0"]).unwrap(), vec![0, 4]);
        assert!(select(&["nope"]).is_err());
    }

    #[test]
    fn test_select_deduplicates_and_splits_whitespace() {
        assert_eq!(select(&["0 1", "1-2", "col0"]).unwrap(), vec![0, 1, 2]);
    }

    // ========================================================================
    // all_selected_columns() / columns_and_operations() tests
    // ========================================================================

    #[test]
    fn test_all_selected_columns_union() {
        let groups = vec![vec!["0"], vec!["3", "4"], vec!["0-1"]];
        let selected = ColumnSelector::new("-")
            .all_selected_columns(&dataset(), &groups, true)
            .unwrap();
        assert_eq!(selected, vec![0, 1, 3, 4]);
    }

    #[test]
    fn test_columns_and_operations() {
        let (columns, operations) = ColumnSelector::new("-")
            .columns_and_operations(&dataset(), " col0 2 -> * 2 ->  + 1 ", true)
            .unwrap();
        assert_eq!(columns, vec![0, 2]);
        assert_eq!(operations, vec!["* 2", "+ 1"]);
    }

    #[test]
    fn test_columns_and_operations_requires_leading_symbol() {
        let err = ColumnSelector::new("-")
            .columns_and_operations(&dataset(), "0 1 MEAN", true)
            .unwrap_err();
        assert!(err.to_string().starts_with("Invalid operation definition 0 1 MEAN. e.g. :"));
    }
}
