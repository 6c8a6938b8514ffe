//! Shared utilities for dataset preprocessing.
//!
//! This module contains helper functions used across multiple modules
//! for dtype checks, scalar parsing and cell formatting.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::fmt;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds categorical (textual) values.
#[inline]
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(dtype, DataType::String | DataType::Categorical(_, _))
}

// =============================================================================
// Scalar Parsing Utilities
// =============================================================================

static INTEGER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d+$").expect("valid integer pattern"));

/// Check if a token is a (possibly signed) integer.
pub fn is_int(token: &str) -> bool {
    INTEGER_PATTERN.is_match(token.trim())
}

/// Parse a token as a signed integer.
pub fn parse_int(token: &str) -> Option<i64> {
    if is_int(token) {
        token.trim().parse::<i64>().ok()
    } else {
        None
    }
}

/// Check if a token is a float literal (integers included).
pub fn is_float(token: &str) -> bool {
    let trimmed = token.trim();
    !trimmed.is_empty() && trimmed.parse::<f64>().is_ok()
}

/// A value typed on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl ScalarValue {
    /// Parse a token as an integer, then as a float, then keep it as text.
    pub fn parse(token: &str) -> Self {
        let trimmed = token.trim();
        if let Some(value) = parse_int(trimmed) {
            return ScalarValue::Int(value);
        }
        match trimmed.parse::<f64>() {
            Ok(value) if !trimmed.is_empty() => ScalarValue::Float(value),
            _ => ScalarValue::Text(token.to_string()),
        }
    }

    /// Numeric view of the value, `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ScalarValue::Int(v) => Some(*v as f64),
            ScalarValue::Float(v) => Some(*v),
            ScalarValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Int(v) => write!(f, "{}", v),
            ScalarValue::Float(v) => f.write_str(&format_float(*v)),
            ScalarValue::Text(v) => f.write_str(v),
        }
    }
}

// =============================================================================
// Formatting Utilities
// =============================================================================

/// Format a float keeping a trailing `.0` on whole numbers.
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

/// Render a cell value without the quoting polars applies to strings.
pub fn format_any_value(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => "nan".to_string(),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Float64(v) => format_float(*v),
        AnyValue::Float32(v) => format_float(*v as f64),
        other => format!("{}", other),
    }
}

// =============================================================================
// Series Utilities
// =============================================================================

/// Collect a numeric series as optional floats.
pub fn series_to_f64(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().collect())
}

/// Collect any series as optional strings, nulls kept as `None`.
pub fn series_to_strings(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let casted = series.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Most frequent non-null value of a series rendered as text.
///
/// Ties are resolved towards the smallest value so results are stable.
pub fn string_mode(series: &Series) -> Option<String> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return None;
    }

    let str_series = non_null.cast(&DataType::String).ok()?;
    let str_chunked = str_series.str().ok()?;

    let mut value_counts: HashMap<&str, usize> = HashMap::new();
    for val in str_chunked.into_iter().flatten() {
        *value_counts.entry(val).or_insert(0) += 1;
    }

    value_counts
        .into_iter()
        .max_by(|(a_val, a_count), (b_val, b_count)| {
            a_count.cmp(b_count).then_with(|| b_val.cmp(a_val))
        })
        .map(|(val, _)| val.to_string())
}

/// Fill the nulls of a string series with a constant.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let values: Vec<String> = series_to_strings(series)?
        .into_iter()
        .map(|value| value.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), values))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // dtype tests
    // ========================================================================

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_is_categorical_dtype() {
        assert!(is_categorical_dtype(&DataType::String));
        assert!(!is_categorical_dtype(&DataType::Float64));
    }

    // ========================================================================
    // parsing tests
    // ========================================================================

    #[test]
    fn test_is_int() {
        assert!(is_int("3"));
        assert!(is_int("-12"));
        assert!(is_int("+4"));
        assert!(!is_int("1.5"));
        assert!(!is_int("col1"));
        assert!(!is_int("1-3"));
        assert!(!is_int(""));
    }

    #[test]
    fn test_is_float() {
        assert!(is_float("3"));
        assert!(is_float("-0.5"));
        assert!(is_float("1e3"));
        assert!(!is_float("abc"));
        assert!(!is_float(""));
    }

    #[test]
    fn test_scalar_parse_order() {
        assert_eq!(ScalarValue::parse("42"), ScalarValue::Int(42));
        assert_eq!(ScalarValue::parse("4.5"), ScalarValue::Float(4.5));
        assert_eq!(
            ScalarValue::parse("France"),
            ScalarValue::Text("France".to_string())
        );
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(ScalarValue::Int(3).to_string(), "3");
        assert_eq!(ScalarValue::Float(3.0).to_string(), "3.0");
        assert_eq!(ScalarValue::Float(2.25).to_string(), "2.25");
    }

    // ========================================================================
    // formatting and series tests
    // ========================================================================

    #[test]
    fn test_format_any_value() {
        assert_eq!(format_any_value(&AnyValue::String("Spain")), "Spain");
        assert_eq!(format_any_value(&AnyValue::Null), "nan");
        assert_eq!(format_any_value(&AnyValue::Int64(7)), "7");
        assert_eq!(format_any_value(&AnyValue::Float64(7.0)), "7.0");
    }

    #[test]
    fn test_string_mode_tie_goes_to_smallest() {
        let series = Series::new(
            "c".into(),
            &[Some("b"), Some("a"), None, Some("b"), Some("a")],
        );
        assert_eq!(string_mode(&series), Some("a".to_string()));

        let series = Series::new("c".into(), &[Some("x"), Some("y"), Some("y")]);
        assert_eq!(string_mode(&series), Some("y".to_string()));
    }

    #[test]
    fn test_string_mode_empty() {
        let series = Series::new("c".into(), &[None::<&str>, None]);
        assert_eq!(string_mode(&series), None);
    }

    #[test]
    fn test_fill_string_nulls_does_not_quote() {
        let series = Series::new("c".into(), &[Some("a"), None]);
        let filled = fill_string_nulls(&series, "z").unwrap();
        let values: Vec<_> = filled.str().unwrap().into_iter().collect();
        assert_eq!(values, vec![Some("a"), Some("z")]);
    }
}
