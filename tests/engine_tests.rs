//! End-to-end tests: parse, sort, merge and edit on parsed workbooks.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod fixtures;

use fixtures::{scores_xlsx, SheetBuilder, XlsxBuilder};
use xlgrid::{
    export, merge, merge_workbooks, parse_file, sort, sort_active, Cell, EditError, ExportFormat,
    MergeError, ParseOptions, Workbook,
};

fn load(name: &str, data: &[u8]) -> Workbook {
    parse_file(name, data, ParseOptions::default()).unwrap()
}

fn table(name: &str, rows: &[(&str, i32)]) -> Vec<u8> {
    let mut sheet = SheetBuilder::new(name).row(1, &["Name", "Score"]);
    for (idx, (who, score)) in rows.iter().enumerate() {
        let r = idx + 2;
        sheet = sheet.cell(&format!("A{r}"), *who).cell(&format!("B{r}"), *score);
    }
    XlsxBuilder::new().sheet(sheet).build()
}

// ============================================================================
// SORT
// ============================================================================

#[test]
fn test_parse_sort_csv_scenario() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    let sheet = workbook.active_sheet().unwrap();

    let sorted = sort(sheet, 1);
    assert_eq!(sorted.rows(), sheet.rows());

    let workbook = sort_active(&workbook, 1).unwrap();
    let csv = export(&workbook, ExportFormat::Csv).unwrap();
    assert_eq!(String::from_utf8(csv).unwrap(), "Name,Score\nBob,7\nAmy,9");
}

#[test]
fn test_sort_by_text_column() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    let sorted = sort_active(&workbook, 0).unwrap();

    assert!(sorted.modified);
    assert!(!workbook.modified);
    let names: Vec<String> = sorted
        .active_sheet()
        .unwrap()
        .rows()
        .iter()
        .map(|r| r[0].to_string())
        .collect();
    assert_eq!(names, vec!["Amy", "Bob"]);
}

#[test]
fn test_sort_is_stable_on_ties() {
    let workbook = load("t.xlsx", &table("S", &[("b", 1), ("a", 1), ("a", 2)]));
    let sorted = sort_active(&workbook, 1).unwrap();
    let rows = sorted.active_sheet().unwrap().rows();
    assert_eq!(rows[0], vec![Cell::text("b"), Cell::Number(1.0)]);
    assert_eq!(rows[1], vec![Cell::text("a"), Cell::Number(1.0)]);
    assert_eq!(rows[2], vec![Cell::text("a"), Cell::Number(2.0)]);
}

#[test]
fn test_sort_puts_blanks_last() {
    let xlsx = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .row(1, &["Name", "Score"])
                .cell("A2", "none")
                .cell("A3", "high")
                .cell("B3", 10)
                .cell("A4", "low")
                .cell("B4", 2),
        )
        .build();
    let sorted = sort_active(&load("b.xlsx", &xlsx), 1).unwrap();
    let rows = sorted.active_sheet().unwrap().rows();
    assert_eq!(rows[0][0], Cell::text("low"));
    assert_eq!(rows[1][0], Cell::text("high"));
    assert_eq!(rows[2][0], Cell::text("none"));
    assert_eq!(rows[2][1], Cell::Empty);
}

#[test]
fn test_sort_active_rejects_out_of_range_column() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    assert_eq!(
        sort_active(&workbook, 5).unwrap_err(),
        EditError::ColumnOutOfRange { col: 5, len: 2 }
    );
}

// ============================================================================
// MERGE
// ============================================================================

#[test]
fn test_merge_parsed_workbooks() {
    let first = load("jan.xlsx", &table("Jan", &[("Bob", 7)]));
    let second = load("feb.xlsx", &table("Feb", &[("Amy", 9), ("Bob", 7)]));

    let merged = merge_workbooks(&[&first, &second], "Merged").unwrap();
    assert_eq!(merged.name, "Merged");
    assert!(merged.modified);
    assert_eq!(merged.sheet_names().collect::<Vec<_>>(), vec!["Merged"]);

    let sheet = merged.active_sheet().unwrap();
    assert_eq!(sheet.headers(), &["Name", "Score"]);
    assert_eq!(sheet.height(), 3);
    assert_eq!(sheet.rows()[0], sheet.rows()[2]);
    assert_eq!(sheet.rows()[1][0], Cell::text("Amy"));
}

#[test]
fn test_merge_rejects_different_headers() {
    let first = load("a.xlsx", &scores_xlsx());
    let other = XlsxBuilder::new()
        .sheet(SheetBuilder::new("S").row(1, &["Name", "Points"]).cell("A2", "x"))
        .build();
    let second = load("b.xlsx", &other);

    let err = merge(&[first.active_sheet().unwrap(), second.active_sheet().unwrap()])
        .unwrap_err();
    assert_eq!(
        err,
        MergeError::HeaderMismatch {
            index: 1,
            expected: vec!["Name".into(), "Score".into()],
            found: vec!["Name".into(), "Points".into()],
        }
    );
}

#[test]
fn test_merge_needs_two_inputs() {
    let only = load("a.xlsx", &scores_xlsx());
    assert_eq!(
        merge_workbooks(&[&only], "M").unwrap_err(),
        MergeError::InsufficientInputs { found: 1 }
    );
    assert_eq!(
        merge(&[]).unwrap_err(),
        MergeError::InsufficientInputs { found: 0 }
    );
}

#[test]
fn test_merge_needs_a_name_and_round_trips() {
    let first = load("jan.xlsx", &table("Jan", &[("Bob", 7)]));
    let second = load("feb.xlsx", &table("Feb", &[("Amy", 9)]));
    assert_eq!(
        merge_workbooks(&[&first, &second], "  ").unwrap_err(),
        MergeError::BlankName
    );

    let merged = merge_workbooks(&[&first, &second], "Q1").unwrap();
    let bytes = export(&merged, ExportFormat::Native).unwrap();
    let reparsed = load("Q1.xlsx", &bytes);
    assert_eq!(reparsed.sheet_names().collect::<Vec<_>>(), vec!["Q1"]);
    assert_eq!(reparsed.sheet("Q1"), merged.active_sheet());
}

// ============================================================================
// EDITING
// ============================================================================

#[test]
fn test_edit_then_sort() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    let edited = workbook
        .edit_active(|sheet| sheet.with_cell(0, 1, "12"))
        .unwrap();
    assert!(edited.modified);
    assert_eq!(edited.active_sheet().unwrap().rows()[0][1], Cell::Number(12.0));

    let sorted = sort_active(&edited, 1).unwrap();
    assert_eq!(sorted.active_sheet().unwrap().rows()[0][0], Cell::text("Amy"));
    // The source workbook is untouched.
    assert_eq!(workbook.active_sheet().unwrap().rows()[0][1], Cell::Number(7.0));
}

#[test]
fn test_structural_edits_keep_grid_rectangular() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    let edited = workbook
        .edit_active(|sheet| {
            let sheet = sheet.with_column_added("Rank").with_row_added();
            sheet.without_row(0)
        })
        .unwrap();
    let sheet = edited.active_sheet().unwrap();
    assert!(sheet.is_rectangular());
    assert_eq!(sheet.headers(), &["Name", "Score", "Rank"]);
    assert_eq!(sheet.height(), 2);
    assert_eq!(sheet.rows()[0][0], Cell::text("Amy"));
}

#[test]
fn test_filter_rows_matches_display_text() {
    let workbook = load("scores.xlsx", &scores_xlsx());
    let sheet = workbook.active_sheet().unwrap();
    assert_eq!(sheet.filter_rows("am").height(), 1);
    assert_eq!(sheet.filter_rows("9").rows()[0][0], Cell::text("Amy"));
    assert_eq!(sheet.filter_rows("").height(), 2);
}
