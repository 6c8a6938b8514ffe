//! Cell operations applied by `--apply "cols -> op [-> op ...]"`.
//!
//! Supported operations, `x` being the cell value:
//!
//! | Operation              | Effect                                   |
//! |------------------------|------------------------------------------|
//! | `+ n`, `- n`, `* n`    | arithmetic, `x + n` ...                  |
//! | `/ n`, `** n`          | division and power                       |
//! | `= v`                  | replace by a constant (number or text)   |
//! | `fillna v`             | replace nulls by `v`                     |
//! | `strip`, `upper`, `lower` | text transformations                  |
//!
//! Arithmetic leaves text and null cells unchanged, and text operations leave
//! numbers unchanged.

use crate::columns::ColumnSelector;
use crate::dataset::Dataset;
use crate::error::{PreprocessingError, Result};
use crate::utils::{ScalarValue, is_numeric_dtype};
use polars::prelude::*;
use tracing::debug;

/// One cell operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Add(f64),
    Subtract(f64),
    Multiply(f64),
    Divide(f64),
    Power(f64),
    Assign(ScalarValue),
    FillNull(ScalarValue),
    Strip,
    Upper,
    Lower,
}

impl Operation {
    /// Parse an operation such as `* 2` or `fillna 0`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let invalid = || PreprocessingError::InvalidOperation(trimmed.to_string());

        let (keyword, argument) = match trimmed.split_once(char::is_whitespace) {
            Some((keyword, argument)) => (keyword, argument.trim()),
            None => (trimmed, ""),
        };
        let number = || argument.parse::<f64>().map_err(|_| invalid());

        let operation = match keyword {
            "+" => Operation::Add(number()?),
            "-" => Operation::Subtract(number()?),
            "*" => Operation::Multiply(number()?),
            "/" => Operation::Divide(number()?),
            "**" => Operation::Power(number()?),
            "=" if !argument.is_empty() => Operation::Assign(ScalarValue::parse(argument)),
            "fillna" if !argument.is_empty() => Operation::FillNull(ScalarValue::parse(argument)),
            "strip" if argument.is_empty() => Operation::Strip,
            "upper" if argument.is_empty() => Operation::Upper,
            "lower" if argument.is_empty() => Operation::Lower,
            _ => return Err(invalid()),
        };
        Ok(operation)
    }

    fn apply(&self, cell: Cell) -> Cell {
        match (self, cell) {
            (Operation::Assign(value), _) => Cell::from(value.clone()),
            (Operation::FillNull(value), Cell::Null) => Cell::from(value.clone()),
            (Operation::Strip, Cell::Text(s)) => Cell::Text(s.trim().to_string()),
            (Operation::Upper, Cell::Text(s)) => Cell::Text(s.to_uppercase()),
            (Operation::Lower, Cell::Text(s)) => Cell::Text(s.to_lowercase()),
            (Operation::Add(n), cell) => cell.arithmetic(*n, |x, n| x + n, i64::checked_add),
            (Operation::Subtract(n), cell) => cell.arithmetic(*n, |x, n| x - n, i64::checked_sub),
            (Operation::Multiply(n), cell) => cell.arithmetic(*n, |x, n| x * n, i64::checked_mul),
            (Operation::Divide(n), cell) => cell.arithmetic(*n, |x, n| x / n, |_, _| None),
            (Operation::Power(n), cell) => cell.arithmetic(*n, f64::powf, |x, n| {
                u32::try_from(n).ok().and_then(|n| x.checked_pow(n))
            }),
            (_, cell) => cell,
        }
    }
}

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

impl Cell {
    /// Numeric operation, integer preserving when both sides are integers.
    fn arithmetic(
        self,
        operand: f64,
        float_op: impl Fn(f64, f64) -> f64,
        int_op: impl Fn(i64, i64) -> Option<i64>,
    ) -> Cell {
        match self {
            Cell::Int(x) if operand.fract() == 0.0 => match int_op(x, operand as i64) {
                Some(result) => Cell::Int(result),
                None => Cell::Float(float_op(x as f64, operand)),
            },
            Cell::Int(x) => Cell::Float(float_op(x as f64, operand)),
            Cell::Float(x) => Cell::Float(float_op(x, operand)),
            other => other,
        }
    }
}

impl From<ScalarValue> for Cell {
    fn from(value: ScalarValue) -> Self {
        match value {
            ScalarValue::Int(v) => Cell::Int(v),
            ScalarValue::Float(v) => Cell::Float(v),
            ScalarValue::Text(v) => Cell::Text(v),
        }
    }
}

fn series_to_cells(series: &Series) -> Result<Vec<Cell>> {
    let dtype = series.dtype();
    let cells = if is_numeric_dtype(dtype) && !matches!(dtype, DataType::Float32 | DataType::Float64) {
        series
            .cast(&DataType::Int64)?
            .i64()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, Cell::Int))
            .collect()
    } else if is_numeric_dtype(dtype) {
        series
            .cast(&DataType::Float64)?
            .f64()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, Cell::Float))
            .collect()
    } else {
        series
            .cast(&DataType::String)?
            .str()?
            .into_iter()
            .map(|v| v.map_or(Cell::Null, |s| Cell::Text(s.to_string())))
            .collect()
    };
    Ok(cells)
}

/// Narrowest series holding every cell: Int64, Float64, else String.
fn cells_to_series(name: &str, cells: Vec<Cell>) -> Series {
    let all_int = cells.iter().all(|c| matches!(c, Cell::Int(_) | Cell::Null));
    let all_numeric = cells
        .iter()
        .all(|c| matches!(c, Cell::Int(_) | Cell::Float(_) | Cell::Null));

    if all_int {
        let values: Vec<Option<i64>> = cells
            .into_iter()
            .map(|c| match c {
                Cell::Int(v) => Some(v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else if all_numeric {
        let values: Vec<Option<f64>> = cells
            .into_iter()
            .map(|c| match c {
                Cell::Int(v) => Some(v as f64),
                Cell::Float(v) => Some(v),
                _ => None,
            })
            .collect();
        Series::new(name.into(), values)
    } else {
        let values: Vec<Option<String>> = cells
            .into_iter()
            .map(|c| match c {
                Cell::Null => None,
                Cell::Int(v) => Some(ScalarValue::Int(v).to_string()),
                Cell::Float(v) => Some(ScalarValue::Float(v).to_string()),
                Cell::Text(v) => Some(v),
            })
            .collect();
        Series::new(name.into(), values)
    }
}

/// Apply `operations` in order to every cell of `columns`.
pub fn apply_operations(dataset: &mut Dataset, columns: &[usize], operations: &[Operation]) -> Result<()> {
    for &index in columns {
        let name = dataset.column_name(index)?;
        let cells = series_to_cells(dataset.series(index)?)?;
        let cells: Vec<Cell> = cells
            .into_iter()
            .map(|cell| operations.iter().fold(cell, |cell, op| op.apply(cell)))
            .collect();
        dataset.frame_mut().replace(&name, cells_to_series(&name, cells))?;
        debug!("Applied {} operations to '{}'", operations.len(), name);
    }
    Ok(())
}

/// Parse and apply an operation definition (`cols -> op [-> op ...]`).
pub fn apply_definition(dataset: &mut Dataset, selector: &ColumnSelector, definition: &str) -> Result<()> {
    let (columns, raw_operations) = selector.columns_and_operations(dataset, definition, true)?;
    let operations = raw_operations
        .iter()
        .map(|raw| Operation::parse(raw))
        .collect::<Result<Vec<_>>>()?;
    apply_operations(dataset, &columns, &operations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::series_to_strings;

    fn dataset() -> Dataset {
        Dataset::from_frame(
            df![
                "name" => [Some(" Alice "), None, Some("bob")],
                "age" => [Some(30i64), Some(40), None],
                "score" => [1.5, 2.5, 3.5],
            ]
            .unwrap(),
        )
    }

    fn strings(dataset: &Dataset, index: usize) -> Vec<Option<String>> {
        series_to_strings(dataset.series(index).unwrap()).unwrap()
    }

    // ========================================================================
    // parsing
    // ========================================================================

    #[test]
    fn test_parse_operations() {
        assert_eq!(Operation::parse("* 2").unwrap(), Operation::Multiply(2.0));
        assert_eq!(Operation::parse("** 0.5").unwrap(), Operation::Power(0.5));
        assert_eq!(
            Operation::parse("= yes").unwrap(),
            Operation::Assign(ScalarValue::Text("yes".to_string()))
        );
        assert_eq!(
            Operation::parse("fillna 0").unwrap(),
            Operation::FillNull(ScalarValue::Int(0))
        );
        assert_eq!(Operation::parse(" strip ").unwrap(), Operation::Strip);
    }

    #[test]
    fn test_parse_invalid_operations() {
        for raw in ["", "+", "* two", "strip x", "x if isnull(x) else 0", "fillna"] {
            let err = Operation::parse(raw).unwrap_err();
            assert_eq!(err.error_code(), "INVALID_OPERATION", "{raw}");
        }
    }

    // ========================================================================
    // application
    // ========================================================================

    #[test]
    fn test_integer_arithmetic_keeps_integers() {
        let mut dataset = dataset();
        apply_definition(&mut dataset, &ColumnSelector::new("-"), "age -> + 1 -> * 2").unwrap();

        assert_eq!(dataset.series(1).unwrap().dtype(), &DataType::Int64);
        assert_eq!(
            strings(&dataset, 1),
            vec![Some("62".to_string()), Some("82".to_string()), None]
        );
    }

    #[test]
    fn test_division_turns_floats() {
        let mut dataset = dataset();
        apply_definition(&mut dataset, &ColumnSelector::new("-"), "1 2 -> / 2").unwrap();

        let age = crate::utils::series_to_f64(dataset.series(1).unwrap()).unwrap();
        assert_eq!(age, vec![Some(15.0), Some(20.0), None]);
        let score = crate::utils::series_to_f64(dataset.series(2).unwrap()).unwrap();
        assert_eq!(score, vec![Some(0.75), Some(1.25), Some(1.75)]);
    }

    #[test]
    fn test_text_operations_and_fillna() {
        let mut dataset = dataset();
        apply_definition(
            &mut dataset,
            &ColumnSelector::new("-"),
            "name -> fillna unknown -> strip -> upper",
        )
        .unwrap();

        assert_eq!(
            strings(&dataset, 0),
            vec![
                Some("ALICE".to_string()),
                Some("UNKNOWN".to_string()),
                Some("BOB".to_string())
            ]
        );
    }

    #[test]
    fn test_arithmetic_ignores_text() {
        let mut dataset = dataset();
        apply_definition(&mut dataset, &ColumnSelector::new("-"), "0 -> * 3").unwrap();
        assert_eq!(strings(&dataset, 0)[2], Some("bob".to_string()));
    }

    #[test]
    fn test_assign_text_over_numbers() {
        let mut dataset = dataset();
        apply_definition(&mut dataset, &ColumnSelector::new("-"), "score -> = n/a").unwrap();
        assert_eq!(dataset.series(2).unwrap().dtype(), &DataType::String);
        assert_eq!(strings(&dataset, 2), vec![Some("n/a".to_string()); 3]);
    }

    #[test]
    fn test_all_columns_allowed() {
        let mut dataset = dataset();
        apply_definition(&mut dataset, &ColumnSelector::new("-"), "* -> fillna 0").unwrap();
        assert!(dataset.count_null_values(&[0, 1, 2]).is_empty());
    }
}
