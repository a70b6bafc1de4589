//! Legacy binary (BIFF8 / compound file) workbooks, decoded through calamine.

use std::io::Cursor;

use calamine::{Data, Range, Reader, Xls};

use super::within_cell_budget;
use crate::error::ParseError;
use crate::normalize::RawValue;

fn convert_value(value: &Data) -> RawValue {
    match value {
        Data::Empty => RawValue::Empty,
        Data::Bool(v) => RawValue::Text(if *v { "TRUE" } else { "FALSE" }.to_string()),
        #[allow(clippy::cast_precision_loss)]
        Data::Int(v) => RawValue::number(*v as f64),
        Data::Float(v) => RawValue::number(*v),
        Data::String(v) | Data::DateTimeIso(v) | Data::DurationIso(v) => RawValue::Text(v.clone()),
        Data::Error(e) => RawValue::Text(e.to_string()),
        Data::DateTime(v) => RawValue::date_serial(v.as_f64()),
    }
}

/// Lay a calamine range out on an absolute grid.
///
/// calamine ranges start at the first used cell, so leading empty rows and
/// columns are restored from `range.start()`.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<RawValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };
    let row_offset = usize::try_from(start_row).unwrap_or(0);
    let col_offset = usize::try_from(start_col).unwrap_or(0);

    let mut rows: Vec<Vec<RawValue>> = vec![Vec::new(); row_offset];
    for cells in range.rows() {
        let mut row = vec![RawValue::Empty; col_offset];
        row.extend(cells.iter().map(convert_value));
        rows.push(row);
    }
    rows
}

/// Absolute `(rows, cols)` a range covers once laid out from A1.
fn absolute_extent(range: &Range<Data>) -> (usize, usize) {
    range.end().map_or((0, 0), |(row, col)| {
        (
            usize::try_from(row).map_or(usize::MAX, |r| r.saturating_add(1)),
            usize::try_from(col).map_or(usize::MAX, |c| c.saturating_add(1)),
        )
    })
}

/// Decode every worksheet of a legacy workbook, in workbook order.
pub(super) fn read_legacy(bytes: &[u8]) -> Result<Vec<(String, Vec<Vec<RawValue>>)>, ParseError> {
    let mut workbook: Xls<_> = Xls::new(Cursor::new(bytes))?;
    let sheet_names = workbook.sheet_names().to_owned();

    let mut sheets = Vec::with_capacity(sheet_names.len());
    for name in sheet_names {
        let range = workbook.worksheet_range(&name)?;
        log::debug!(
            "legacy sheet '{name}': {} x {}",
            range.height(),
            range.width()
        );
        let (rows, cols) = absolute_extent(&range);
        if !within_cell_budget(rows, cols) {
            return Err(ParseError::TooLarge { name, rows, cols });
        }
        sheets.push((name, range_to_rows(&range)));
    }
    Ok(sheets)
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
    use calamine::CellErrorType;

    #[test]
    fn test_convert_value() {
        assert_eq!(convert_value(&Data::Int(7)), RawValue::number(7.0));
        assert_eq!(
            convert_value(&Data::Bool(false)),
            RawValue::Text("FALSE".to_string())
        );
        assert_eq!(
            convert_value(&Data::Error(CellErrorType::Div0)),
            RawValue::Text("#DIV/0!".to_string())
        );
        assert_eq!(convert_value(&Data::Empty), RawValue::Empty);
    }

    #[test]
    fn test_range_offset_restored() {
        let mut range = Range::new((1, 2), (2, 3));
        range.set_value((1, 2), Data::String("H".to_string()));
        range.set_value((2, 3), Data::Float(1.5));
        let rows = range_to_rows(&range);
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_empty());
        assert_eq!(
            rows[1],
            vec![RawValue::Empty, RawValue::Empty, RawValue::Text("H".to_string()), RawValue::Empty]
        );
        assert_eq!(rows[2][3], RawValue::number(1.5));
    }

    #[test]
    fn test_absolute_extent_counts_from_a1() {
        let range: Range<Data> = Range::new((1, 2), (4, 3));
        assert_eq!(absolute_extent(&range), (5, 4));
        assert_eq!(absolute_extent(&Range::<Data>::empty()), (0, 0));
        assert!(!within_cell_budget(65_536, 256));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(read_legacy(&[0xD0, 0xCF, 0x11, 0xE0, 0, 0, 0, 0]).is_err());
    }
}
