//! Export tests: every format, driven from parsed workbooks.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod fixtures;

use std::io::{Cursor, Read};

use chrono::NaiveDate;
use fixtures::{scores_xlsx, SheetBuilder, XlsxBuilder};
use xlgrid::{
    export, export_filename, parse, parse_file, Cell, ExportError, ExportFormat, ParseOptions,
    Workbook,
};

fn read_part(bytes: &[u8], name: &str) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut part = archive.by_name(name).unwrap();
    let mut out = String::new();
    part.read_to_string(&mut out).unwrap();
    out
}

fn mixed_workbook() -> Workbook {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Mixed")
                .dimension("A1:D5")
                .row(1, &["Name", "When", "Score", ""])
                .cell("A2", "Bob")
                .date("B2", 45000.0)
                .cell("C2", 7)
                .cell("A3", "Cy")
                .cell("C3", 3)
                .cell("A4", "Amy & <co>"),
        )
        .sheet(SheetBuilder::new("Second").row(1, &["K"]).cell("A2", "v"))
        .build();
    parse_file("mixed.xlsx", &xlsx, ParseOptions::default()).unwrap()
}

// ============================================================================
// NATIVE
// ============================================================================

#[test]
fn test_native_round_trip() {
    let workbook = mixed_workbook();
    let bytes = export(&workbook, ExportFormat::Native).unwrap();
    let reparsed = parse(&bytes).unwrap();

    assert_eq!(
        reparsed.sheet_names().collect::<Vec<_>>(),
        workbook.sheet_names().collect::<Vec<_>>()
    );
    for name in workbook.sheet_names() {
        assert_eq!(reparsed.sheet(name), workbook.sheet(name), "sheet {name}");
    }
}

#[test]
fn test_native_dates_become_styled_serials() {
    let workbook = mixed_workbook();
    let bytes = export(&workbook, ExportFormat::Native).unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");

    assert!(sheet.contains(r#"<c r="B2" s="1"><v>45000</v></c>"#));
    assert!(sheet.contains(r#"<c r="A4" t="inlineStr"><is><t>Amy &amp; &lt;co&gt;</t></is></c>"#));
    assert!(sheet.contains(r#"<row r="5"/>"#));
    assert!(sheet.contains(r#"<dimension ref="A1:D5"/>"#));
}

#[test]
fn test_native_formatted_date_text_becomes_date() {
    let workbook = Workbook::new_table(
        "typed",
        vec!["When".into(), "Note".into()],
        vec![vec![Cell::text("Jan 5, 2024"), Cell::text("Feb 30, 2024")]],
    );
    let bytes = export(&workbook, ExportFormat::Native).unwrap();
    let sheet = read_part(&bytes, "xl/worksheets/sheet1.xml");
    assert!(sheet.contains(r#"<c r="A2" s="1"><v>45296</v></c>"#));

    let reparsed = parse(&bytes).unwrap();
    let row = &reparsed.active_sheet().unwrap().rows()[0];
    assert_eq!(row[0], Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap()));
    // Not a real day, so it stays text.
    assert_eq!(row[1], Cell::text("Feb 30, 2024"));
}

#[test]
fn test_native_round_trip_of_edge_dates() {
    let workbook = Workbook::new_table("edge", vec!["When".into()], vec![vec![Cell::Empty]; 2])
        .edit_active(|s| s.with_cell(0, 0, "1899-12-31")?.with_cell(1, 0, "1850-06-01"))
        .unwrap();
    let rows = workbook.active_sheet().unwrap().rows();
    assert_eq!(rows[0][0], Cell::Date(NaiveDate::from_ymd_opt(1899, 12, 31).unwrap()));
    assert_eq!(rows[1][0], Cell::text("1850-06-01"));

    let reparsed = parse(&export(&workbook, ExportFormat::Native).unwrap()).unwrap();
    assert_eq!(reparsed.active_sheet(), workbook.active_sheet());
}

#[test]
fn test_native_keeps_active_sheet() {
    let workbook = mixed_workbook().with_active_sheet("Second").unwrap();
    let bytes = export(&workbook, ExportFormat::Native).unwrap();
    assert!(read_part(&bytes, "xl/workbook.xml").contains(r#"activeTab="1""#));
}

#[test]
fn test_native_new_table() {
    let workbook = Workbook::new_table(
        "",
        vec!["A".into(), "B".into()],
        vec![vec![Cell::text(""), Cell::Empty]],
    );
    let reparsed = parse(&export(&workbook, ExportFormat::Native).unwrap()).unwrap();
    let sheet = reparsed.sheet(xlgrid::NEW_TABLE_SHEET).unwrap();
    assert_eq!(sheet.headers(), &["A", "B"]);
    assert_eq!(sheet.rows()[0], vec![Cell::text(""), Cell::Empty]);
}

// ============================================================================
// CSV / JSON
// ============================================================================

#[test]
fn test_csv_covers_active_sheet_only() {
    let workbook = mixed_workbook();
    let csv = String::from_utf8(export(&workbook, ExportFormat::Csv).unwrap()).unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("Name,When,Score,"));
    assert_eq!(lines.next(), Some("Bob,\"Mar 15, 2023\",7,"));
    assert!(!csv.contains("Second"));
    assert!(!csv.ends_with('\n'));

    let second = workbook.with_active_sheet("Second").unwrap();
    let csv = export(&second, ExportFormat::Csv).unwrap();
    assert_eq!(csv, b"K\nv");
}

#[test]
fn test_json_rows() {
    let workbook = parse(&scores_xlsx()).unwrap();
    let value: serde_json::Value =
        serde_json::from_slice(&export(&workbook, ExportFormat::Json).unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!([
            { "Name": "Bob", "Score": 7 },
            { "Name": "Amy", "Score": 9 }
        ])
    );
}

#[test]
fn test_json_blank_header_and_dates() {
    let value: serde_json::Value =
        serde_json::from_slice(&export(&mixed_workbook(), ExportFormat::Json).unwrap()).unwrap();
    let first = &value[0];
    assert_eq!(first["When"], "Mar 15, 2023");
    assert_eq!(first["__EMPTY"], serde_json::Value::Null);
    assert_eq!(value.as_array().unwrap().len(), 4);
}

// ============================================================================
// PDF
// ============================================================================

#[test]
fn test_pdf_document() {
    let pdf = export(&mixed_workbook(), ExportFormat::Pdf).unwrap();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(pdf.ends_with(b"%%EOF\n"));
    let text = String::from_utf8_lossy(&pdf);
    assert!(text.contains("(Mixed)"));
    assert!(text.contains("(Second)"));
    assert!(text.contains("(Mar 15, 2023)"));
}

#[test]
fn test_pdf_paginates_long_sheets() {
    let rows: Vec<Vec<Cell>> = (0..300)
        .map(|i| vec![Cell::text(format!("row {i}")), Cell::Number(f64::from(i))])
        .collect();
    let workbook = Workbook::new_table("long", vec!["Label".into(), "N".into()], rows);
    let pdf = export(&workbook, ExportFormat::Pdf).unwrap();
    let text = String::from_utf8_lossy(&pdf);
    let pages = text.matches("/Type /Page ").count();
    assert!(pages > 1, "expected several pages, got {pages}");
    // The head row is repeated on every page.
    assert_eq!(text.matches("(Label) Tj").count(), pages);
}

// ============================================================================
// FORMAT SELECTION
// ============================================================================

#[test]
fn test_unknown_format_tag() {
    let err = "xml".parse::<ExportFormat>().unwrap_err();
    assert!(matches!(err, ExportError::UnsupportedFormat(tag) if tag == "xml"));
}

#[test]
fn test_every_format_exports() {
    let workbook = mixed_workbook();
    for format in ExportFormat::ALL {
        let bytes = export(&workbook, format).unwrap();
        assert!(!bytes.is_empty(), "{format} produced nothing");
    }
}

#[test]
fn test_export_filenames() {
    let workbook = mixed_workbook();
    assert_eq!(export_filename(&workbook, ExportFormat::Pdf), "mixed.pdf");

    let sorted = xlgrid::sort_active(&workbook, 2).unwrap();
    assert_eq!(
        export_filename(&sorted, ExportFormat::Native),
        "modified_mixed.xlsx"
    );
}

#[test]
fn test_workbook_object_with_unknown_active_sheet_is_rejected() {
    let mut json =
        serde_json::to_value(Workbook::new_table("t", vec!["A".into()], vec![])).unwrap();
    json["activeSheetName"] = serde_json::json!("Nope");
    assert!(serde_json::from_value::<Workbook>(json).is_err());
}
