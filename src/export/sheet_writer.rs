//! Generates worksheet XML from a [`Sheet`].
//!
//! Text is written as inline strings (`t="inlineStr"`) so no shared string
//! table is needed. Date cells, and data text in the `"Mar 15, 2023"` form,
//! are written as serial numbers with the date style.

use std::fmt::Write as _;

use crate::cell_ref::{cell_ref, col_to_letter};
use crate::dates::{date_to_serial, has_date_serial, parse_formatted_date};
use crate::types::{format_number, Cell, Sheet};

/// Index of the date cell format in the package's `cellXfs`.
pub(crate) const DATE_STYLE_INDEX: u32 = 1;

fn index_u32(i: usize) -> u32 {
    u32::try_from(i).unwrap_or(u32::MAX)
}

/// Write a complete worksheet XML string. Row 1 holds the headers.
pub(crate) fn write_sheet_xml(sheet: &Sheet) -> String {
    let mut out = String::with_capacity(4096 + sheet.height() * sheet.width() * 32);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push('\n');

    // <dimension> keeps trailing empty rows and columns on re-read
    if sheet.width() > 0 {
        let end_col = col_to_letter(index_u32(sheet.width() - 1));
        let _ = writeln!(out, "<dimension ref=\"A1:{end_col}{}\"/>", sheet.height() + 1);
    }

    out.push_str("<sheetData>\n");
    write_header_row(&mut out, sheet.headers());
    for (idx, row) in sheet.rows().iter().enumerate() {
        write_data_row(&mut out, index_u32(idx + 1), row);
    }
    out.push_str("</sheetData>\n");

    out.push_str("</worksheet>");
    out
}

fn write_header_row(out: &mut String, headers: &[String]) {
    if headers.iter().all(String::is_empty) {
        out.push_str("<row r=\"1\"/>\n");
        return;
    }
    out.push_str("<row r=\"1\">");
    for (col, header) in headers.iter().enumerate() {
        if !header.is_empty() {
            write_inline_string(out, &cell_ref(0, index_u32(col)), header);
        }
    }
    out.push_str("</row>\n");
}

fn write_data_row(out: &mut String, row: u32, cells: &[Cell]) {
    if cells.iter().all(Cell::is_empty) {
        let _ = writeln!(out, "<row r=\"{}\"/>", u64::from(row) + 1);
        return;
    }
    let _ = write!(out, "<row r=\"{}\">", u64::from(row) + 1);
    for (col, cell) in cells.iter().enumerate() {
        write_cell(out, &cell_ref(row, index_u32(col)), cell);
    }
    out.push_str("</row>\n");
}

/// Write a single `<c>` element. `Empty` cells are omitted.
fn write_cell(out: &mut String, r: &str, cell: &Cell) {
    match cell {
        Cell::Empty => {}
        Cell::Number(n) => {
            let _ = write!(out, "<c r=\"{r}\"><v>{}</v></c>", format_number(*n));
        }
        Cell::Date(d) if has_date_serial(*d) => write_date_serial(out, r, date_to_serial(*d)),
        // No positive serial, so the display form is kept as text.
        Cell::Date(_) => write_inline_string(out, r, &cell.to_string()),
        Cell::Text(s) => match parse_formatted_date(s).filter(|d| has_date_serial(*d)) {
            Some(d) => write_date_serial(out, r, date_to_serial(d)),
            None => write_inline_string(out, r, s),
        },
    }
}

fn write_date_serial(out: &mut String, r: &str, serial: f64) {
    let _ = write!(
        out,
        "<c r=\"{r}\" s=\"{DATE_STYLE_INDEX}\"><v>{}</v></c>",
        format_number(serial)
    );
}

fn write_inline_string(out: &mut String, r: &str, text: &str) {
    let _ = write!(out, "<c r=\"{r}\" t=\"inlineStr\"><is><t");
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        out.push_str(" xml:space=\"preserve\"");
    }
    out.push('>');
    out.push_str(&xml_escape(text));
    out.push_str("</t></is></c>");
}

/// Minimal XML escaping for attribute/text content.
pub(crate) fn xml_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            // Control characters other than tab/newline/CR are not valid XML 1.0
            c if c.is_control() && !matches!(c, '\t' | '\n' | '\r') => {}
            _ => out.push(c),
        }
    }
    out
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
    use chrono::NaiveDate;

    #[test]
    fn test_header_and_cells() {
        let sheet = Sheet::new(
            vec!["Name".into(), "When".into()],
            vec![
                vec![Cell::text("A & B"), Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap())],
                vec![Cell::Number(7.0), Cell::text("Jan 5, 2024")],
            ],
        );
        let xml = write_sheet_xml(&sheet);
        assert!(xml.contains(r#"<dimension ref="A1:B3"/>"#));
        assert!(xml.contains(r#"<c r="A1" t="inlineStr"><is><t>Name</t></is></c>"#));
        assert!(xml.contains(r#"<is><t>A &amp; B</t></is>"#));
        assert!(xml.contains(r#"<c r="B2" s="1"><v>45000</v></c>"#));
        assert!(xml.contains(r#"<c r="A3"><v>7</v></c>"#));
        assert!(xml.contains(r#"<c r="B3" s="1"><v>45296</v></c>"#));
    }

    #[test]
    fn test_empty_values() {
        let sheet = Sheet::new(
            vec!["".into(), "H".into()],
            vec![
                vec![Cell::Empty, Cell::Empty],
                vec![Cell::text(""), Cell::Empty],
            ],
        );
        let xml = write_sheet_xml(&sheet);
        assert!(xml.contains("<row r=\"2\"/>"));
        assert!(xml.contains(r#"<c r="A3" t="inlineStr"><is><t></t></is></c>"#));
        assert!(!xml.contains(r#"r="A1""#));
    }

    #[test]
    fn test_days_before_serial_range_stay_text() {
        let sheet = Sheet::new(
            vec!["When".into(), "Note".into()],
            vec![vec![
                Cell::Date(NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()),
                Cell::text("Jun 1, 1850"),
            ]],
        );
        let xml = write_sheet_xml(&sheet);
        assert!(xml.contains(r#"<c r="A2" t="inlineStr"><is><t>Dec 30, 1899</t></is></c>"#));
        assert!(xml.contains(r#"<c r="B2" t="inlineStr"><is><t>Jun 1, 1850</t></is></c>"#));
    }

    #[test]
    fn test_header_text_is_never_a_serial() {
        let sheet = Sheet::new(vec!["Mar 15, 2023".into()], vec![]);
        let xml = write_sheet_xml(&sheet);
        assert!(xml.contains("<t>Mar 15, 2023</t>"));
    }

    #[test]
    fn test_preserves_edge_whitespace() {
        let sheet = Sheet::new(vec!["H".into()], vec![vec![Cell::text(" x ")]]);
        let xml = write_sheet_xml(&sheet);
        assert!(xml.contains(r#"<t xml:space="preserve"> x </t>"#));
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("<a href='x'>\"&\""), "&lt;a href=&apos;x&apos;&gt;&quot;&amp;&quot;");
        assert_eq!(xml_escape("a\u{1}b\tc"), "ab\tc");
    }
}
