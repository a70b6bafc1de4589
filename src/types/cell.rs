use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{format_date, has_date_serial, parse_formatted_date, parse_iso_date};

/// A single grid value.
///
/// `Empty` and `Text("")` are different values and both survive every
/// operation unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "camelCase")]
pub enum Cell {
    Text(String),
    Number(f64),
    /// Calendar date, rendered as `"Mar 15, 2023"`.
    Date(NaiveDate),
    #[default]
    Empty,
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Numeric reading of the value, including numeric-looking text.
    ///
    /// The whole trimmed text must parse; `"7kg"` is not a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    /// Calendar reading of the value: a date cell, or text in the
    /// `"<Mon> <D>, <YYYY>"` form.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Date(d) => Some(*d),
            Self::Text(s) => parse_formatted_date(s),
            _ => None,
        }
    }

    /// Coerce text typed into a cell editor.
    ///
    /// - blank (after trimming) → `Empty`
    /// - `YYYY-MM-DD` naming a real day from Dec 31, 1899 on → `Date`
    /// - finite numeric text → `Number`
    /// - anything else → `Text`, kept as typed
    ///
    /// Days before Dec 31, 1899 have no positive serial and would not read
    /// back as dates, so they stay text.
    pub fn from_input(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Self::Empty;
        }
        if let Some(date) = parse_iso_date(trimmed) {
            return if has_date_serial(date) {
                Self::Date(date)
            } else {
                Self::Text(input.to_string())
            };
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Self::Number(n),
            _ => Self::Text(input.to_string()),
        }
    }
}

/// Render a number the way the grid displays it: integers without a
/// fractional part, everything else in shortest round-trip form.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    n.to_string()
}

impl fmt::Display for Cell {
    /// Display text. `Empty` renders as the empty string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => f.write_str(&format_number(*n)),
            Self::Date(d) => f.write_str(&format_date(*d)),
            Self::Empty => Ok(()),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<NaiveDate> for Cell {
    fn from(d: NaiveDate) -> Self {
        Self::Date(d)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Empty, Into::into)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_empty_distinct_from_empty_text() {
        assert_ne!(Cell::Empty, Cell::text(""));
        assert_eq!(Cell::Empty.to_string(), "");
        assert_eq!(Cell::text("").to_string(), "");
    }

    #[test_case(7.0 => "7")]
    #[test_case(2.5 => "2.5")]
    #[test_case(-3.0 => "-3")]
    #[test_case(-0.0 => "0")]
    #[test_case(0.1 + 0.2 => "0.30000000000000004")]
    fn test_format_number(n: f64) -> String {
        format_number(n)
    }

    #[test]
    fn test_date_display() {
        let d = NaiveDate::from_ymd_opt(2023, 3, 15).unwrap();
        assert_eq!(Cell::Date(d).to_string(), "Mar 15, 2023");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Cell::Number(4.0).as_number(), Some(4.0));
        assert_eq!(Cell::text(" 12.5 ").as_number(), Some(12.5));
        assert_eq!(Cell::text("7kg").as_number(), None);
        assert_eq!(Cell::text("inf").as_number(), None);
        assert_eq!(Cell::Empty.as_number(), None);
    }

    #[test]
    fn test_as_date() {
        let d = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(Cell::text("Jan 5, 2024").as_date(), Some(d));
        assert_eq!(Cell::Date(d).as_date(), Some(d));
        assert_eq!(Cell::Number(45000.0).as_date(), None);
    }

    #[test]
    fn test_from_input() {
        assert_eq!(Cell::from_input("   "), Cell::Empty);
        assert_eq!(Cell::from_input("42"), Cell::Number(42.0));
        assert_eq!(
            Cell::from_input("2024-01-05"),
            Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap())
        );
        assert_eq!(Cell::from_input("2024-13-05"), Cell::text("2024-13-05"));
        assert_eq!(
            Cell::from_input("1899-12-31"),
            Cell::Date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap())
        );
        assert_eq!(Cell::from_input("1899-12-30"), Cell::text("1899-12-30"));
        assert_eq!(Cell::from_input("1850-06-01"), Cell::text("1850-06-01"));
        assert_eq!(Cell::from_input(" hello "), Cell::text(" hello "));
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&Cell::Number(1.5)).unwrap();
        assert_eq!(json, r#"{"t":"number","v":1.5}"#);
        let back: Cell = serde_json::from_str(r#"{"t":"empty"}"#).unwrap();
        assert_eq!(back, Cell::Empty);
    }
}
