//! Strategy resolution shared by the preprocessors.

use crate::columns::ColumnSelector;
use crate::dataset::Dataset;
use crate::error::{PreprocessingError, Result};
use crate::strategies::{StrategyCode, parse_code};
use crate::table::NOT_APPLICABLE;
use std::collections::BTreeSet;

/// Column indexes grouped by strategy, in order of first declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnsByStrategy<S> {
    entries: Vec<(S, BTreeSet<usize>)>,
}

impl<S> Default for ColumnsByStrategy<S> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<S: StrategyCode> ColumnsByStrategy<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add columns to a strategy, creating its group on first use.
    pub fn add(&mut self, strategy: S, columns: impl IntoIterator<Item = usize>) {
        match self.entries.iter_mut().find(|(s, _)| *s == strategy) {
            Some((_, existing)) => existing.extend(columns),
            None => self.entries.push((strategy, columns.into_iter().collect())),
        }
    }

    /// Strategy declared for `column`, if any.
    pub fn strategy_of(&self, column: usize) -> Option<S> {
        self.entries
            .iter()
            .find(|(_, columns)| columns.contains(&column))
            .map(|(strategy, _)| *strategy)
    }

    pub fn columns(&self, strategy: S) -> Vec<usize> {
        self.entries
            .iter()
            .find(|(s, _)| *s == strategy)
            .map(|(_, columns)| columns.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (S, Vec<usize>)> + '_ {
        self.entries
            .iter()
            .map(|(strategy, columns)| (*strategy, columns.iter().copied().collect()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every declared column, once per group it appears in.
    fn declared_columns(&self) -> Vec<usize> {
        self.entries
            .iter()
            .flat_map(|(_, columns)| columns.iter().copied())
            .collect()
    }
}

/// Resolve `cols -> CODE` definitions against the dataset.
///
/// `*` is refused, every definition must carry exactly one code and the code
/// must belong to `allowed`.
pub fn columns_by_strategy_code<S: StrategyCode>(
    dataset: &Dataset,
    separator: &str,
    definitions: &[String],
    allowed: &[S],
) -> Result<ColumnsByStrategy<S>> {
    let selector = ColumnSelector::new(separator);
    let mut result = ColumnsByStrategy::new();

    for definition in definitions {
        let (columns, codes) = selector.columns_and_operations(dataset, definition, false)?;
        if codes.len() != 1 {
            return Err(PreprocessingError::InvalidCodeDeclaration(definition.clone()));
        }
        result.add(parse_code(&codes[0], allowed)?, columns);
    }

    Ok(result)
}

/// Check that no column is declared twice, within or across definitions.
pub fn check_for_duplicate_columns<S: StrategyCode>(
    dataset: &Dataset,
    definitions: &[&ColumnsByStrategy<S>],
) -> Result<()> {
    let mut seen = BTreeSet::new();
    let mut duplicates = BTreeSet::new();

    for definition in definitions {
        for column in definition.declared_columns() {
            if !seen.insert(column) {
                duplicates.insert(column);
            }
        }
    }

    if duplicates.is_empty() {
        return Ok(());
    }
    let duplicates: Vec<usize> = duplicates.into_iter().collect();
    Err(PreprocessingError::DuplicatedColumns(columns_label(
        &duplicates,
        &dataset.headers(),
    )))
}

/// Specific strategy of `column`, or `default`.
pub fn strategy_for<S: StrategyCode>(column: usize, default: S, specific: &ColumnsByStrategy<S>) -> S {
    specific.strategy_of(column).unwrap_or(default)
}

/// `'a', 'b'`, or `N / A` when empty.
pub fn columns_label(columns: &[usize], headers: &[String]) -> String {
    if columns.is_empty() {
        return NOT_APPLICABLE.to_string();
    }
    columns
        .iter()
        .filter_map(|&column| headers.get(column))
        .map(|name| format!("'{}'", name))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Split columns into `(numerical, categorical)`.
pub fn split_numerical_categorical(columns: &[usize], categorical: &[usize]) -> (Vec<usize>, Vec<usize>) {
    columns
        .iter()
        .copied()
        .partition(|column| !categorical.contains(column))
}
