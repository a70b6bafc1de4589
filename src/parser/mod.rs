//! Workbook parser
//!
//! Sniffs the container, decodes every worksheet into raw rows and hands them
//! to the normalizer. OOXML packages are read with `zip` + `quick-xml`;
//! legacy compound-file workbooks go through calamine.

mod legacy;
mod relationships;
mod styles;
mod worksheet;

use std::collections::HashSet;
use std::io::Cursor;
use zip::ZipArchive;

use crate::error::ParseError;
use crate::normalize::{normalize, RawValue};
use crate::types::{NamedSheet, Workbook};

use relationships::{get_sheet_info, parse_shared_strings, parse_workbook_relationships};
use styles::parse_date_styles;
use worksheet::{parse_sheet, SheetContext};

/// Local file header signature of a ZIP archive.
const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
/// End-of-central-directory signature (an archive with no entries).
const ZIP_EMPTY_MAGIC: [u8; 4] = *b"PK\x05\x06";
/// Compound File Binary signature used by legacy workbooks.
const CFB_MAGIC: [u8; 8] = [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Largest grid, in cells, one sheet may decode to.
const MAX_GRID_CELLS: usize = 4_000_000;

/// Whether a `rows` x `cols` grid fits in [`MAX_GRID_CELLS`].
fn within_cell_budget(rows: usize, cols: usize) -> bool {
    rows.checked_mul(cols.max(1)).is_some_and(|cells| cells <= MAX_GRID_CELLS)
}

/// Spreadsheet container kinds the parser understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// Office Open XML package (`.xlsx`).
    Ooxml,
    /// Compound-file binary workbook (`.xls`).
    Legacy,
}

/// Identify the container from its leading bytes.
pub fn sniff_container(data: &[u8]) -> Option<Container> {
    if data.starts_with(&ZIP_MAGIC) || data.starts_with(&ZIP_EMPTY_MAGIC) {
        Some(Container::Ooxml)
    } else if data.starts_with(&CFB_MAGIC) {
        Some(Container::Legacy)
    } else {
        None
    }
}

/// Parser settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// Run the date heuristic on numeric data cells.
    pub detect_dates: bool,
    /// Widen the grid to the worksheet's declared extent so trailing empty
    /// rows and columns survive.
    pub honor_dimension: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            detect_dates: true,
            honor_dimension: true,
        }
    }
}

/// Parse a workbook from bytes with default options.
pub fn parse(data: &[u8]) -> Result<Workbook, ParseError> {
    parse_with_options(data, ParseOptions::default())
}

/// Parse a workbook from bytes. The workbook's `name` is left empty.
pub fn parse_with_options(data: &[u8], options: ParseOptions) -> Result<Workbook, ParseError> {
    parse_file("", data, options)
}

/// Parse a workbook and record `name` (typically the source file name) on it.
pub fn parse_file(name: &str, data: &[u8], options: ParseOptions) -> Result<Workbook, ParseError> {
    let raw_sheets = match sniff_container(data) {
        Some(Container::Ooxml) => read_ooxml(data, options)?,
        Some(Container::Legacy) => legacy::read_legacy(data)?,
        None => return Err(ParseError::UnrecognizedContainer),
    };
    log::debug!("'{name}': decoded {} worksheet(s)", raw_sheets.len());

    let mut seen = HashSet::new();
    let mut sheets = Vec::with_capacity(raw_sheets.len());
    for (sheet_name, rows) in raw_sheets {
        if !seen.insert(sheet_name.clone()) {
            log::warn!("'{name}': duplicate sheet name '{sheet_name}' skipped");
            continue;
        }
        let sheet = normalize(&sheet_name, rows, None, options.detect_dates)?;
        log::debug!(
            "'{name}': sheet '{sheet_name}' is {} x {}",
            sheet.height(),
            sheet.width()
        );
        sheets.push(NamedSheet::new(sheet_name, sheet));
    }

    Workbook::from_sheets(name, sheets).map_err(|_| ParseError::NoWorksheets)
}

fn read_ooxml(
    data: &[u8],
    options: ParseOptions,
) -> Result<Vec<(String, Vec<Vec<RawValue>>)>, ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    // Parse workbook relationships first to get actual file paths
    let relationships = parse_workbook_relationships(&mut archive);
    let shared_strings =
        parse_shared_strings(&mut archive, relationships.shared_strings.as_deref());
    let date_styles = parse_date_styles(&mut archive, relationships.styles.as_deref());
    let (sheet_info, date1904) = get_sheet_info(&mut archive, &relationships)?;

    let ctx = SheetContext {
        shared_strings: &shared_strings,
        date_styles: &date_styles,
        date1904,
        detect_dates: options.detect_dates,
        honor_dimension: options.honor_dimension,
    };

    sheet_info
        .into_iter()
        .map(|info| {
            let rows = parse_sheet(&mut archive, &info, &ctx)?;
            Ok((info.name, rows))
        })
        .collect()
}

/// Result of parsing several files in one go.
#[derive(Debug)]
pub struct BatchOutcome {
    /// One result per input, in submission order.
    pub results: Vec<Result<Workbook, ParseError>>,
    /// Index of the last input that parsed successfully.
    pub active: Option<usize>,
}

impl BatchOutcome {
    /// The workbooks that parsed, in submission order.
    pub fn workbooks(&self) -> impl Iterator<Item = &Workbook> {
        self.results.iter().filter_map(|r| r.as_ref().ok())
    }

    /// The workbook of the last successful input.
    pub fn active_workbook(&self) -> Option<&Workbook> {
        self.active
            .and_then(|i| self.results.get(i))
            .and_then(|r| r.as_ref().ok())
    }
}

/// Parse `(name, bytes)` inputs independently. A failure affects only its own
/// entry.
pub fn parse_batch(inputs: &[(&str, &[u8])]) -> BatchOutcome {
    let results: Vec<_> = inputs
        .iter()
        .map(|(name, data)| {
            let result = parse_file(name, data, ParseOptions::default());
            if let Err(e) = &result {
                log::warn!("failed to parse '{name}': {e}");
            }
            result
        })
        .collect();
    let active = results.iter().rposition(Result::is_ok);
    BatchOutcome { results, active }
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

    #[test]
    fn test_sniff_container() {
        assert_eq!(sniff_container(b"PK\x03\x04rest"), Some(Container::Ooxml));
        assert_eq!(sniff_container(&CFB_MAGIC), Some(Container::Legacy));
        assert_eq!(sniff_container(b"Name,Score\n"), None);
        assert_eq!(sniff_container(b""), None);
    }

    #[test]
    fn test_unrecognized_container() {
        let err = parse(b"hello").unwrap_err();
        assert!(matches!(err, ParseError::UnrecognizedContainer));
    }

    #[test]
    fn test_truncated_zip_is_parse_error() {
        let err = parse(b"PK\x03\x04\x00\x00").unwrap_err();
        assert!(matches!(err, ParseError::Zip(_)));
    }

    #[test]
    fn test_batch_reports_last_success() {
        let outcome = parse_batch(&[("a.txt", b"nope".as_slice()), ("b.txt", b"nope".as_slice())]);
        assert_eq!(outcome.results.len(), 2);
        assert!(outcome.active.is_none());
        assert!(outcome.active_workbook().is_none());
        assert_eq!(outcome.workbooks().count(), 0);
    }
}
