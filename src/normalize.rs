//! Normalizer: turns decoded (possibly ragged) rows into a rectangular [`Sheet`].
//!
//! Decoders hand over every row as a list of [`RawValue`]s. Row 0 becomes the
//! header row unless explicit headers are given. Rows are padded to the widest
//! row, never truncated, and numeric data cells pass through the date
//! heuristic (header cells never do).

use crate::dates::{is_serial_candidate, serial_to_date};
use crate::error::ParseError;
use crate::types::{format_number, Cell, Sheet};

/// A decoded cell before date classification.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Text(String),
    Number {
        value: f64,
        /// The container tags this cell with a date number format.
        date_styled: bool,
    },
    Empty,
}

impl RawValue {
    pub fn number(value: f64) -> Self {
        Self::Number {
            value,
            date_styled: false,
        }
    }

    pub fn date_serial(value: f64) -> Self {
        Self::Number {
            value,
            date_styled: true,
        }
    }

    fn into_header(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::Number { value, .. } => format_number(value),
            Self::Empty => String::new(),
        }
    }

    fn into_cell(self, detect_dates: bool) -> Cell {
        match self {
            Self::Text(s) => Cell::Text(s),
            Self::Empty => Cell::Empty,
            Self::Number { value, date_styled } => {
                if detect_dates && is_serial_candidate(value, date_styled) {
                    if let Some(date) = serial_to_date(value) {
                        return Cell::Date(date);
                    }
                }
                Cell::Number(value)
            }
        }
    }
}

/// Normalize the rows of one worksheet.
///
/// `name` is only used to label the error for a worksheet with no rows at
/// all. With explicit `headers`, every row in `rows` is data.
pub fn normalize(
    name: &str,
    rows: Vec<Vec<RawValue>>,
    headers: Option<Vec<String>>,
    detect_dates: bool,
) -> Result<Sheet, ParseError> {
    let mut rows = rows.into_iter();
    let headers = match headers {
        Some(h) => h,
        None => rows
            .next()
            .ok_or_else(|| ParseError::EmptyWorksheet {
                name: name.to_string(),
            })?
            .into_iter()
            .map(RawValue::into_header)
            .collect(),
    };

    let body: Vec<Vec<Cell>> = rows
        .map(|row| {
            row.into_iter()
                .map(|v| v.into_cell(detect_dates))
                .collect()
        })
        .collect();

    // `Sheet::new` pads headers and rows to the widest row.
    Ok(Sheet::new(headers, body))
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

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_headers_from_first_row() {
        let sheet = normalize(
            "S",
            vec![
                vec![text("Name"), RawValue::Empty, RawValue::number(2024.0)],
                vec![text("Bob"), RawValue::number(7.0), RawValue::Empty],
            ],
            None,
            true,
        )
        .unwrap();
        assert_eq!(sheet.headers(), &["Name", "", "2024"]);
        assert_eq!(
            sheet.rows()[0],
            vec![Cell::text("Bob"), Cell::Number(7.0), Cell::Empty]
        );
    }

    #[test]
    fn test_pads_to_widest_row_without_truncating() {
        let sheet = normalize(
            "S",
            vec![
                vec![text("A")],
                vec![text("1"), text("2"), text("3")],
                vec![],
            ],
            None,
            true,
        )
        .unwrap();
        assert_eq!(sheet.headers(), &["A", "", ""]);
        assert_eq!(sheet.rows()[0][2], Cell::text("3"));
        assert_eq!(sheet.rows()[1], vec![Cell::Empty; 3]);
        assert!(sheet.is_rectangular());
    }

    #[test]
    fn test_zero_rows_rejected() {
        let err = normalize("Blank", vec![], None, true).unwrap_err();
        assert!(matches!(err, ParseError::EmptyWorksheet { ref name } if name == "Blank"));
    }

    #[test]
    fn test_explicit_headers_with_no_rows() {
        let sheet = normalize("S", vec![], Some(vec!["A".into(), "B".into()]), true).unwrap();
        assert_eq!(sheet.width(), 2);
        assert_eq!(sheet.height(), 0);
    }

    #[test]
    fn test_header_row_never_date_coerced() {
        let sheet = normalize(
            "S",
            vec![
                vec![RawValue::date_serial(45000.0), RawValue::number(1.5)],
                vec![RawValue::date_serial(45000.0), RawValue::number(1.5)],
            ],
            None,
            true,
        )
        .unwrap();
        assert_eq!(sheet.headers(), &["45000", "1.5"]);
        assert_eq!(sheet.rows()[0][0].to_string(), "Mar 15, 2023");
        assert_eq!(sheet.rows()[0][1].to_string(), "Dec 31, 1899");
    }

    #[test]
    fn test_plain_integers_stay_numbers() {
        let sheet = normalize(
            "S",
            vec![vec![text("Score")], vec![RawValue::number(45000.0)]],
            None,
            true,
        )
        .unwrap();
        assert_eq!(sheet.rows()[0][0], Cell::Number(45000.0));
    }

    #[test]
    fn test_date_detection_can_be_disabled() {
        let sheet = normalize(
            "S",
            vec![vec![text("X")], vec![RawValue::number(0.5)]],
            None,
            false,
        )
        .unwrap();
        assert_eq!(sheet.rows()[0][0], Cell::Number(0.5));
    }
}
