use serde::{Deserialize, Serialize};

use super::Cell;
use crate::error::EditError;

/// One grid: a header row kept apart from the data rows.
///
/// Every row has exactly `headers.len()` cells. The constructor pads ragged
/// input on the right and every edit returns a new, still rectangular value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "SheetParts")]
pub struct Sheet {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

/// Unchecked wire shape; deserialization pads it through [`Sheet::new`].
#[derive(Deserialize)]
struct SheetParts {
    headers: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<Cell>>,
}

impl From<SheetParts> for Sheet {
    fn from(parts: SheetParts) -> Self {
        Self::new(parts.headers, parts.rows)
    }
}

impl Sheet {
    /// Build a sheet, padding the headers (with `""`) and every row (with
    /// `Empty`) to the widest of them. Nothing is ever truncated.
    pub fn new(mut headers: Vec<String>, mut rows: Vec<Vec<Cell>>) -> Self {
        let width = rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(headers.len()))
            .max()
            .unwrap_or(0);
        headers.resize(width, String::new());
        for row in &mut rows {
            row.resize(width, Cell::Empty);
        }
        Self { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Cell>>) {
        (self.headers, self.rows)
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Number of data rows (the header row is not counted).
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn is_rectangular(&self) -> bool {
        self.rows.iter().all(|r| r.len() == self.headers.len())
    }

    /// Same headers, rows replaced. Used by the sorter and filter, which only
    /// reorder or drop existing rows.
    pub(crate) fn with_rows(&self, rows: Vec<Vec<Cell>>) -> Self {
        Self::new(self.headers.clone(), rows)
    }

    fn check_row(&self, row: usize) -> Result<(), EditError> {
        if row < self.rows.len() {
            Ok(())
        } else {
            Err(EditError::RowOutOfRange {
                row,
                len: self.rows.len(),
            })
        }
    }

    fn check_col(&self, col: usize) -> Result<(), EditError> {
        if col < self.headers.len() {
            Ok(())
        } else {
            Err(EditError::ColumnOutOfRange {
                col,
                len: self.headers.len(),
            })
        }
    }

    /// Replace one cell with editor input, coerced by [`Cell::from_input`].
    pub fn with_cell(&self, row: usize, col: usize, input: &str) -> Result<Self, EditError> {
        self.with_cell_value(row, col, Cell::from_input(input))
    }

    /// Replace one cell with an explicit value.
    pub fn with_cell_value(&self, row: usize, col: usize, value: Cell) -> Result<Self, EditError> {
        self.check_row(row)?;
        self.check_col(col)?;
        let mut next = self.clone();
        if let Some(slot) = next.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *slot = value;
        }
        Ok(next)
    }

    /// Rename one column. Header text is never `Empty`; blank input stays `""`.
    pub fn with_header(&self, col: usize, text: &str) -> Result<Self, EditError> {
        self.check_col(col)?;
        let mut next = self.clone();
        if let Some(slot) = next.headers.get_mut(col) {
            *slot = text.to_string();
        }
        Ok(next)
    }

    /// Append a column filled with `Empty`.
    pub fn with_column_added(&self, header: &str) -> Self {
        let mut headers = self.headers.clone();
        headers.push(header.to_string());
        let rows = self
            .rows
            .iter()
            .map(|r| {
                let mut r = r.clone();
                r.push(Cell::Empty);
                r
            })
            .collect();
        Self::new(headers, rows)
    }

    /// Drop a column (header and cells).
    pub fn without_column(&self, col: usize) -> Result<Self, EditError> {
        self.check_col(col)?;
        let keep = |idx: &usize| *idx != col;
        let headers = self
            .headers
            .iter()
            .enumerate()
            .filter(|(i, _)| keep(i))
            .map(|(_, h)| h.clone())
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|r| {
                r.iter()
                    .enumerate()
                    .filter(|(i, _)| keep(i))
                    .map(|(_, c)| c.clone())
                    .collect()
            })
            .collect();
        Ok(Self { headers, rows })
    }

    /// Append an all-`Empty` row.
    pub fn with_row_added(&self) -> Self {
        let mut next = self.clone();
        next.rows.push(vec![Cell::Empty; self.headers.len()]);
        next
    }

    /// Drop a data row.
    pub fn without_row(&self, row: usize) -> Result<Self, EditError> {
        self.check_row(row)?;
        let mut next = self.clone();
        next.rows.remove(row);
        Ok(next)
    }

    /// Rows where any cell's display text contains `term`, ignoring case.
    /// An empty term keeps every row. Headers are always kept.
    pub fn filter_rows(&self, term: &str) -> Self {
        if term.is_empty() {
            return self.clone();
        }
        let needle = term.to_lowercase();
        let rows = self
            .rows
            .iter()
            .filter(|r| {
                r.iter()
                    .any(|c| c.to_string().to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();
        self.with_rows(rows)
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

    fn sample() -> Sheet {
        Sheet::new(
            vec!["Name".into(), "Score".into()],
            vec![
                vec![Cell::text("Bob"), Cell::Number(7.0)],
                vec![Cell::text("Amy"), Cell::Number(9.0)],
            ],
        )
    }

    #[test]
    fn test_new_pads_ragged_rows() {
        let sheet = Sheet::new(
            vec!["A".into()],
            vec![
                vec![Cell::text("x"), Cell::text("y"), Cell::text("z")],
                vec![],
            ],
        );
        assert_eq!(sheet.headers(), &["A", "", ""]);
        assert_eq!(sheet.rows()[1], vec![Cell::Empty; 3]);
        assert!(sheet.is_rectangular());
    }

    #[test]
    fn test_with_cell_returns_new_value() {
        let sheet = sample();
        let edited = sheet.with_cell(0, 1, "12").unwrap();
        assert_eq!(edited.cell(0, 1), Some(&Cell::Number(12.0)));
        assert_eq!(sheet.cell(0, 1), Some(&Cell::Number(7.0)));
    }

    #[test]
    fn test_with_cell_blank_is_empty() {
        let edited = sample().with_cell(1, 0, "  ").unwrap();
        assert_eq!(edited.cell(1, 0), Some(&Cell::Empty));
    }

    #[test]
    fn test_with_cell_out_of_range() {
        assert_eq!(
            sample().with_cell(5, 0, "x"),
            Err(EditError::RowOutOfRange { row: 5, len: 2 })
        );
        assert_eq!(
            sample().with_cell(0, 2, "x"),
            Err(EditError::ColumnOutOfRange { col: 2, len: 2 })
        );
    }

    #[test]
    fn test_header_edit() {
        let edited = sample().with_header(1, "Points").unwrap();
        assert_eq!(edited.headers(), &["Name", "Points"]);
    }

    #[test]
    fn test_add_and_remove_column() {
        let added = sample().with_column_added("Notes");
        assert_eq!(added.width(), 3);
        assert!(added.is_rectangular());
        assert_eq!(added.cell(1, 2), Some(&Cell::Empty));

        let removed = added.without_column(0).unwrap();
        assert_eq!(removed.headers(), &["Score", "Notes"]);
        assert_eq!(removed.cell(0, 0), Some(&Cell::Number(7.0)));
        assert!(removed.is_rectangular());
    }

    #[test]
    fn test_remove_last_column_keeps_rows() {
        let one = Sheet::new(vec!["A".into()], vec![vec![Cell::text("x")]]);
        let none = one.without_column(0).unwrap();
        assert_eq!(none.width(), 0);
        assert_eq!(none.height(), 1);
        assert!(none.is_rectangular());
    }

    #[test]
    fn test_add_and_remove_row() {
        let added = sample().with_row_added();
        assert_eq!(added.height(), 3);
        assert_eq!(added.rows()[2], vec![Cell::Empty, Cell::Empty]);

        let removed = added.without_row(0).unwrap();
        assert_eq!(removed.height(), 2);
        assert_eq!(removed.cell(0, 0), Some(&Cell::text("Amy")));
    }

    #[test]
    fn test_filter_rows() {
        let sheet = sample();
        let hits = sheet.filter_rows("AM");
        assert_eq!(hits.height(), 1);
        assert_eq!(hits.headers(), sheet.headers());
        assert_eq!(sheet.filter_rows("").height(), 2);
        assert_eq!(sheet.filter_rows("9").height(), 1);
    }

    #[test]
    fn test_deserialize_pads() {
        let sheet: Sheet =
            serde_json::from_str(r#"{"headers":["A","B"],"rows":[[{"t":"text","v":"x"}]]}"#)
                .unwrap();
        assert_eq!(sheet.rows()[0], vec![Cell::text("x"), Cell::Empty]);
    }
}
