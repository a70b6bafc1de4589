//! In-memory workbook fixtures.
//!
//! Builds small but valid `.xlsx` packages so integration tests never touch
//! the filesystem.
//!
//! ```rust,ignore
//! let xlsx = XlsxBuilder::new()
//!     .sheet(
//!         SheetBuilder::new("Sheet1")
//!             .cell("A1", "Name")
//!             .cell("B1", "Score")
//!             .cell("A2", "Bob")
//!             .cell("B2", 7),
//!     )
//!     .build();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Style index of the date-formatted `xf` in every generated styles part.
pub const DATE_XF: u32 = 1;

// ============================================================================
// Cell Value
// ============================================================================

/// A cell value that can be added to a sheet.
#[derive(Debug, Clone)]
pub enum CellValue {
    /// Shared string.
    String(String),
    /// Inline string (`t="inlineStr"`).
    InlineString(String),
    /// Formula string result (`t="str"`).
    FormulaString(String),
    Number(f64),
    /// Number carrying the date style.
    Date(f64),
    Boolean(bool),
    /// Error literal such as `#DIV/0!`.
    Error(String),
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

#[derive(Debug, Clone)]
struct CellEntry {
    cell_ref: String,
    row: u32,
    value: CellValue,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    cells: Vec<CellEntry>,
    dimension: Option<String>,
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Add a cell. `cell_ref` is an A1 reference.
    #[must_use]
    pub fn cell<V: Into<CellValue>>(mut self, cell_ref: &str, value: V) -> Self {
        let row = cell_ref
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .expect("cell reference needs a row number");
        self.cells.push(CellEntry {
            cell_ref: cell_ref.to_string(),
            row,
            value: value.into(),
        });
        self
    }

    /// Add a date-styled serial.
    #[must_use]
    pub fn date(self, cell_ref: &str, serial: f64) -> Self {
        self.cell(cell_ref, CellValue::Date(serial))
    }

    /// Add a whole row of values starting at column A.
    #[must_use]
    pub fn row<V: Into<CellValue> + Clone>(mut self, row: u32, values: &[V]) -> Self {
        for (idx, value) in values.iter().enumerate() {
            let col = u8::try_from(idx).expect("fixture rows stay under 26 columns");
            let cell_ref = format!("{}{row}", char::from(b'A' + col));
            self = self.cell(&cell_ref, value.clone());
        }
        self
    }

    /// Declare `<dimension ref="..."/>`.
    #[must_use]
    pub fn dimension(mut self, range: &str) -> Self {
        self.dimension = Some(range.to_string());
        self
    }
}

// ============================================================================
// Workbook Builder
// ============================================================================

/// Builder for a complete `.xlsx` package.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    date1904: bool,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Mark the workbook as using the 1904 date system.
    #[must_use]
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let mut shared_strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        let mut put = |name: &str, body: &str| {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        };

        put("[Content_Types].xml", &content_types(self.sheets.len()));
        put("_rels/.rels", ROOT_RELS);
        put("xl/workbook.xml", &workbook(&self.sheets, self.date1904));
        put("xl/_rels/workbook.xml.rels", &workbook_rels(self.sheets.len()));
        put("xl/styles.xml", STYLES);
        put("xl/sharedStrings.xml", &shared_strings_xml(&shared_strings));
        for (idx, sheet) in self.sheets.iter().enumerate() {
            put(
                &format!("xl/worksheets/sheet{}.xml", idx + 1),
                &sheet_xml(sheet, &shared_strings),
            );
        }

        zip.finish().unwrap().into_inner()
    }
}

/// Package with a workbook part that lists no sheets.
#[must_use]
pub fn xlsx_without_sheets() -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(content_types(0).as_bytes()).unwrap();
    zip.start_file("_rels/.rels", options).unwrap();
    zip.write_all(ROOT_RELS.as_bytes()).unwrap();
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(workbook(&[], false).as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// The two-row score table used across tests.
#[must_use]
pub fn scores_xlsx() -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Sheet1")
                .row(1, &["Name", "Score"])
                .cell("A2", "Bob")
                .cell("B2", 7)
                .cell("A3", "Amy")
                .cell("B3", 9),
        )
        .build()
}

// ============================================================================
// Part generators
// ============================================================================

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
  <fills count="1"><fill><patternFill patternType="none"/></fill></fills>
  <borders count="1"><border/></borders>
  <cellXfs count="2">
    <xf numFmtId="0" fontId="0" fillId="0" borderId="0"/>
    <xf numFmtId="14" fontId="0" fillId="0" borderId="0" applyNumberFormat="1"/>
  </cellXfs>
</styleSheet>"#;

fn content_types(sheet_count: usize) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    );
    for n in 1..=sheet_count {
        let _ = write!(
            out,
            r#"
  <Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
    }
    out.push_str("\n</Types>");
    out
}

fn workbook(sheets: &[SheetBuilder], date1904: bool) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    if date1904 {
        out.push_str(r#"<workbookPr date1904="1"/>"#);
    }
    out.push_str("<sheets>");
    for (idx, sheet) in sheets.iter().enumerate() {
        let n = idx + 1;
        let _ = write!(
            out,
            r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#,
            escape(&sheet.name)
        );
    }
    out.push_str("</sheets></workbook>");
    out
}

fn workbook_rels(sheet_count: usize) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for n in 1..=sheet_count {
        let _ = write!(
            out,
            r#"<Relationship Id="rId{n}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{n}.xml"/>"#
        );
    }
    let _ = write!(
        out,
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#,
        sheet_count + 1
    );
    let _ = write!(
        out,
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        sheet_count + 2
    );
    out.push_str("</Relationships>");
    out
}

fn shared_strings_xml(strings: &[String]) -> String {
    let mut out = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">"#,
        strings.len()
    );
    for s in strings {
        let _ = write!(out, "<si><t>{}</t></si>", escape(s));
    }
    out.push_str("</sst>");
    out
}

fn sheet_xml(sheet: &SheetBuilder, shared_strings: &[String]) -> String {
    let mut out = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    );
    if let Some(dimension) = &sheet.dimension {
        let _ = write!(out, r#"<dimension ref="{dimension}"/>"#);
    }

    let mut rows: Vec<u32> = sheet.cells.iter().map(|c| c.row).collect();
    rows.sort_unstable();
    rows.dedup();

    if rows.is_empty() {
        out.push_str("<sheetData/>");
    } else {
        out.push_str("<sheetData>");
        for row in rows {
            let _ = write!(out, r#"<row r="{row}">"#);
            for cell in sheet.cells.iter().filter(|c| c.row == row) {
                out.push_str(&cell_xml(cell, shared_strings));
            }
            out.push_str("</row>");
        }
        out.push_str("</sheetData>");
    }
    out.push_str("</worksheet>");
    out
}

fn cell_xml(cell: &CellEntry, shared_strings: &[String]) -> String {
    let r = &cell.cell_ref;
    match &cell.value {
        CellValue::String(s) => {
            let idx = shared_strings.iter().position(|x| x == s).unwrap();
            format!(r#"<c r="{r}" t="s"><v>{idx}</v></c>"#)
        }
        CellValue::InlineString(s) => {
            format!(r#"<c r="{r}" t="inlineStr"><is><t>{}</t></is></c>"#, escape(s))
        }
        CellValue::FormulaString(s) => {
            format!(r#"<c r="{r}" t="str"><f>A1</f><v>{}</v></c>"#, escape(s))
        }
        CellValue::Number(n) => format!(r#"<c r="{r}"><v>{n}</v></c>"#),
        CellValue::Date(n) => format!(r#"<c r="{r}" s="{DATE_XF}"><v>{n}</v></c>"#),
        CellValue::Boolean(b) => format!(r#"<c r="{r}" t="b"><v>{}</v></c>"#, u8::from(*b)),
        CellValue::Error(e) => format!(r#"<c r="{r}" t="e"><v>{}</v></c>"#, escape(e)),
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
