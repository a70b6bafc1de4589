//! Delimited text writer.

use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::error::ExportError;
use crate::types::Sheet;

/// Write the header row then every data row, one record per line.
///
/// Cells are written as they display (`Empty` is an empty field). Fields
/// holding the delimiter, a quote or a line break are quoted, with inner
/// quotes doubled. Records are separated by `\n`; there is no trailing
/// newline.
pub fn write_csv_with_delimiter(sheet: &Sheet, delimiter: u8) -> Result<Vec<u8>, ExportError> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(sheet.headers())?;
    for row in sheet.rows() {
        writer.write_record(row.iter().map(ToString::to_string))?;
    }

    let mut out = writer.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    if out.last() == Some(&b'\n') {
        out.pop();
    }
    Ok(out)
}

/// Comma-separated form of `sheet`.
pub fn write_csv(sheet: &Sheet) -> Result<Vec<u8>, ExportError> {
    write_csv_with_delimiter(sheet, b',')
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
    use crate::types::Cell;
    use chrono::NaiveDate;

    fn csv_text(sheet: &Sheet) -> String {
        String::from_utf8(write_csv(sheet).unwrap()).unwrap()
    }

    #[test]
    fn test_scenario_output() {
        let sheet = Sheet::new(
            vec!["Name".into(), "Score".into()],
            vec![
                vec![Cell::text("Bob"), Cell::Number(7.0)],
                vec![Cell::text("Amy"), Cell::Number(9.0)],
            ],
        );
        assert_eq!(csv_text(&sheet), "Name,Score\nBob,7\nAmy,9");
    }

    #[test]
    fn test_quoting() {
        let sheet = Sheet::new(
            vec!["a,b".into(), "plain".into()],
            vec![
                vec![Cell::text("say \"hi\""), Cell::text("two\nlines")],
                vec![Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()), Cell::Empty],
            ],
        );
        assert_eq!(
            csv_text(&sheet),
            "\"a,b\",plain\n\"say \"\"hi\"\"\",\"two\nlines\"\n\"Mar 15, 2023\","
        );
    }

    #[test]
    fn test_other_delimiter() {
        let sheet = Sheet::new(
            vec!["x".into(), "y".into()],
            vec![vec![Cell::text("1,5"), Cell::text("a\tb")]],
        );
        assert_eq!(
            write_csv_with_delimiter(&sheet, b'\t').unwrap(),
            b"x\ty\n1,5\t\"a\tb\""
        );
    }
}
