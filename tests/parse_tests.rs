//! Integration tests for workbook parsing.
//!
//! Every fixture is built in memory with `fixtures::XlsxBuilder` and pushed
//! through the public parse entry points.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod fixtures;

use chrono::NaiveDate;
use fixtures::{scores_xlsx, xlsx_without_sheets, CellValue, SheetBuilder, XlsxBuilder};
use xlgrid::{parse, parse_batch, parse_file, parse_with_options, Cell, ParseError, ParseOptions};

fn date(y: i32, m: u32, d: u32) -> Cell {
    Cell::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
}

// ============================================================================
// BASIC DECODING
// ============================================================================

#[test]
fn test_scores_sheet() {
    let workbook = parse_file("scores.xlsx", &scores_xlsx(), ParseOptions::default()).unwrap();

    assert_eq!(workbook.name, "scores.xlsx");
    assert!(!workbook.modified);
    assert_eq!(workbook.sheet_names().collect::<Vec<_>>(), vec!["Sheet1"]);
    assert_eq!(workbook.active_sheet_name(), "Sheet1");

    let sheet = workbook.active_sheet().unwrap();
    assert_eq!(sheet.headers(), &["Name", "Score"]);
    assert_eq!(
        sheet.rows(),
        &[
            vec![Cell::text("Bob"), Cell::Number(7.0)],
            vec![Cell::text("Amy"), Cell::Number(9.0)],
        ]
    );
}

#[test]
fn test_parse_leaves_name_empty() {
    let workbook = parse(&scores_xlsx()).unwrap();
    assert_eq!(workbook.name, "");
}

#[test]
fn test_sheets_keep_workbook_order() {
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("Zeta").cell("A1", "z"))
        .sheet(SheetBuilder::new("Alpha").cell("A1", "a"))
        .sheet(SheetBuilder::new("Mid & Co").cell("A1", "m"))
        .build();
    let workbook = parse(&xlsx).unwrap();
    assert_eq!(
        workbook.sheet_names().collect::<Vec<_>>(),
        vec!["Zeta", "Alpha", "Mid & Co"]
    );
    assert_eq!(workbook.active_sheet_name(), "Zeta");
    assert_eq!(workbook.sheet("Mid & Co").unwrap().headers(), &["m"]);
}

#[test]
fn test_cell_kinds() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Kinds")
                .row(1, &["shared", "inline", "formula", "bool", "error", "number"])
                .cell("A2", "text")
                .cell("B2", CellValue::InlineString("in <line>".to_string()))
                .cell("C2", CellValue::FormulaString("computed".to_string()))
                .cell("D2", true)
                .cell("E2", CellValue::Error("#DIV/0!".to_string()))
                .cell("F2", -12),
        )
        .build();
    let workbook = parse(&xlsx).unwrap();
    let row = &workbook.active_sheet().unwrap().rows()[0];
    assert_eq!(
        row,
        &vec![
            Cell::text("text"),
            Cell::text("in <line>"),
            Cell::text("computed"),
            Cell::text("TRUE"),
            Cell::text("#DIV/0!"),
            Cell::Number(-12.0),
        ]
    );
}

#[test]
fn test_header_values_become_text() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", 2024)
                .cell("C1", "Label")
                .cell("A2", 1)
                .cell("B2", 2)
                .cell("C2", 3),
        )
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.headers(), &["2024", "", "Label"]);
}

// ============================================================================
// RECTANGULAR GRID
// ============================================================================

#[test]
fn test_ragged_rows_are_padded() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Ragged")
                .cell("A1", "A")
                .cell("A2", 1)
                .cell("D3", "far")
                .cell("B4", 2),
        )
        .build();
    let options = ParseOptions {
        honor_dimension: false,
        ..ParseOptions::default()
    };
    let sheet = parse_with_options(&xlsx, options)
        .unwrap()
        .active_sheet()
        .unwrap()
        .clone();

    assert!(sheet.is_rectangular());
    assert_eq!(sheet.width(), 4);
    assert_eq!(sheet.headers(), &["A", "", "", ""]);
    assert_eq!(sheet.rows()[0], vec![Cell::Number(1.0), Cell::Empty, Cell::Empty, Cell::Empty]);
    assert_eq!(sheet.rows()[1][3], Cell::text("far"));
    assert_eq!(sheet.rows()[2][1], Cell::Number(2.0));
}

#[test]
fn test_skipped_rows_stay_as_empty_rows() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Gaps")
                .cell("A1", "A")
                .cell("A2", 1)
                .cell("A5", 2),
        )
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.height(), 4);
    assert_eq!(sheet.rows()[1], vec![Cell::Empty]);
    assert_eq!(sheet.rows()[2], vec![Cell::Empty]);
    assert_eq!(sheet.rows()[3], vec![Cell::Number(2.0)]);
}

#[test]
fn test_dimension_widens_grid() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Wide")
                .dimension("A1:C4")
                .cell("A1", "A")
                .cell("A2", 1),
        )
        .build();

    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.headers(), &["A", "", ""]);
    assert_eq!(sheet.height(), 3);
    assert!(sheet.rows()[2].iter().all(Cell::is_empty));

    let narrow = ParseOptions {
        honor_dimension: false,
        ..ParseOptions::default()
    };
    let sheet = parse_with_options(&xlsx, narrow)
        .unwrap()
        .active_sheet()
        .unwrap()
        .clone();
    assert_eq!(sheet.width(), 1);
    assert_eq!(sheet.height(), 1);
}

// ============================================================================
// DATES
// ============================================================================

#[test]
fn test_date_styled_integer_is_date() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Dates")
                .row(1, &["When", "Count"])
                .date("A2", 45000.0)
                .cell("B2", 45000),
        )
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.rows()[0][0], date(2023, 3, 15));
    assert_eq!(sheet.rows()[0][0].to_string(), "Mar 15, 2023");
    // Unstyled integers stay numbers.
    assert_eq!(sheet.rows()[0][1], Cell::Number(45000.0));
}

#[test]
fn test_fractional_number_is_date() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "Stamp")
                .cell("A2", 45000.75)
                .cell("A3", -1.5),
        )
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.rows()[0][0], date(2023, 3, 15));
    assert_eq!(sheet.rows()[1][0], Cell::Number(-1.5));
}

#[test]
fn test_date_detection_can_be_disabled() {
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("S").cell("A1", "When").date("A2", 45000.0))
        .build();
    let options = ParseOptions {
        detect_dates: false,
        ..ParseOptions::default()
    };
    let sheet = parse_with_options(&xlsx, options)
        .unwrap()
        .active_sheet()
        .unwrap()
        .clone();
    assert_eq!(sheet.rows()[0][0], Cell::Number(45000.0));
}

#[test]
fn test_date1904_workbook() {
    let xlsx = XlsxBuilder::new()
        .date1904()
        .sheet(
            SheetBuilder::new("S")
                .cell("A1", "When")
                .cell("B1", "Plain")
                .cell("C1", "Stamp")
                .date("A2", 43538.0)
                .cell("B2", 43538)
                .cell("C2", 43538.25),
        )
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.rows()[0][0], date(2023, 3, 15));
    assert_eq!(sheet.rows()[0][1], Cell::Number(43538.0));
    // Unformatted fractions are dates too, on the same 1904 calendar.
    assert_eq!(sheet.rows()[0][2], date(2023, 3, 15));
}

#[test]
fn test_header_row_is_never_a_date() {
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("S").date("A1", 45000.0).cell("A2", 1))
        .build();
    let sheet = parse(&xlsx).unwrap().active_sheet().unwrap().clone();
    assert_eq!(sheet.headers(), &["45000"]);
}

// ============================================================================
// FAILURES
// ============================================================================

#[test]
fn test_unrecognized_bytes() {
    let err = parse(b"Name,Score\nBob,7").unwrap_err();
    assert!(matches!(err, ParseError::UnrecognizedContainer));
}

#[test]
fn test_truncated_zip_is_an_error() {
    let mut xlsx = scores_xlsx();
    xlsx.truncate(40);
    assert!(parse(&xlsx).is_err());
}

#[test]
fn test_empty_worksheet() {
    let xlsx = XlsxBuilder::new()
        .sheet(SheetBuilder::new("Data").cell("A1", "x"))
        .sheet(SheetBuilder::new("Blank"))
        .build();
    match parse(&xlsx).unwrap_err() {
        ParseError::EmptyWorksheet { name } => assert_eq!(name, "Blank"),
        other => panic!("expected EmptyWorksheet, got {other:?}"),
    }
}

#[test]
fn test_far_away_cell_is_rejected_not_materialized() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sparse")
                .cell("A1", "H")
                .cell("XFD1048576", 1),
        )
        .build();
    match parse(&xlsx).unwrap_err() {
        ParseError::TooLarge { name, rows, cols } => {
            assert_eq!(name, "Sparse");
            assert_eq!((rows, cols), (1_048_576, 16_384));
        }
        other => panic!("expected TooLarge, got {other:?}"),
    }
}

#[test]
fn test_empty_worksheet_message_names_sheet() {
    let xlsx = XlsxBuilder::new().sheet(SheetBuilder::new("Blank")).build();
    assert_eq!(parse(&xlsx).unwrap_err().to_string(), "Sheet 'Blank' is empty");
}

#[test]
fn test_no_worksheets() {
    let err = parse(&xlsx_without_sheets()).unwrap_err();
    assert!(matches!(err, ParseError::NoWorksheets));
}

// ============================================================================
// BATCH
// ============================================================================

#[test]
fn test_batch_isolates_failures() {
    let good = scores_xlsx();
    let other = XlsxBuilder::new()
        .sheet(SheetBuilder::new("Other").cell("A1", "k"))
        .build();
    let inputs: Vec<(&str, &[u8])> = vec![
        ("a.xlsx", &good),
        ("b.xlsx", &other),
        ("notes.txt", b"plain text"),
    ];
    let outcome = parse_batch(&inputs);

    assert_eq!(outcome.results.len(), 3);
    assert!(outcome.results[0].is_ok());
    assert!(outcome.results[1].is_ok());
    assert!(matches!(
        outcome.results[2],
        Err(ParseError::UnrecognizedContainer)
    ));
    assert_eq!(outcome.active, Some(1));
    assert_eq!(outcome.active_workbook().unwrap().name, "b.xlsx");
    assert_eq!(
        outcome.workbooks().map(|w| w.name.as_str()).collect::<Vec<_>>(),
        vec!["a.xlsx", "b.xlsx"]
    );
}

#[test]
fn test_batch_with_no_successes() {
    let inputs: Vec<(&str, &[u8])> = vec![("x", b"nope"), ("y", b"")];
    let outcome = parse_batch(&inputs);
    assert_eq!(outcome.active, None);
    assert!(outcome.active_workbook().is_none());
    assert_eq!(outcome.workbooks().count(), 0);
}
