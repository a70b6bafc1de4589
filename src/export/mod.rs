//! Workbook export.
//!
//! One entry point, [`export`], picks the writer for the requested format.
//! The native package and the PDF cover every sheet; CSV and JSON cover the
//! active sheet only.

mod delimited;
mod json;
mod native;
mod pdf;
pub(crate) mod sheet_writer;

use std::fmt;
use std::str::FromStr;

use crate::error::ExportError;
use crate::types::{Sheet, Workbook};

pub use delimited::{write_csv, write_csv_with_delimiter};
pub use json::write_json;
pub use native::write_native;
pub use pdf::{export_pdf_with, PdfOptions};

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExportFormat {
    /// Spreadsheet package (`.xlsx`), all sheets.
    Native,
    /// Comma-separated text, active sheet.
    Csv,
    /// Array of row objects, active sheet.
    Json,
    /// Paginated table document, all sheets.
    Pdf,
}

impl ExportFormat {
    pub const ALL: [Self; 4] = [Self::Native, Self::Csv, Self::Json, Self::Pdf];

    /// Format tag as accepted by [`FromStr`].
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    /// Standard file extension, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Native => "xlsx",
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Pdf => "pdf",
        }
    }

    pub const fn mime_type(self) -> &'static str {
        match self {
            Self::Native => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
            Self::Json => "application/json",
            Self::Pdf => "application/pdf",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    /// Accepts the format tags, case-insensitively; `xlsx` is an alias of
    /// `native`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "native" | "xlsx" => Ok(Self::Native),
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            "pdf" => Ok(Self::Pdf),
            _ => Err(ExportError::UnsupportedFormat(s.to_string())),
        }
    }
}

fn active_sheet(workbook: &Workbook) -> Result<&Sheet, ExportError> {
    workbook
        .active_sheet()
        .ok_or_else(|| ExportError::MissingActiveSheet(workbook.active_sheet_name().to_string()))
}

/// Serialize `workbook` in `format`.
pub fn export(workbook: &Workbook, format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    log::debug!("exporting '{}' as {format}", workbook.name);
    match format {
        ExportFormat::Native => write_native(workbook),
        ExportFormat::Csv => write_csv(active_sheet(workbook)?),
        ExportFormat::Json => write_json(active_sheet(workbook)?),
        ExportFormat::Pdf => Ok(export_pdf_with(workbook, &PdfOptions::default())),
    }
}

/// Download name for an export: `modified_` when the workbook was edited,
/// the source extension replaced by the format's.
pub fn export_filename(workbook: &Workbook, format: ExportFormat) -> String {
    let stem = match workbook.name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.contains('/') => stem,
        _ => workbook.name.as_str(),
    };
    let prefix = if workbook.modified { "modified_" } else { "" };
    format!("{prefix}{stem}.{}", format.extension())
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
    use test_case::test_case;

    #[test_case("native" => Some(ExportFormat::Native))]
    #[test_case("XLSX" => Some(ExportFormat::Native))]
    #[test_case(" csv " => Some(ExportFormat::Csv))]
    #[test_case("json" => Some(ExportFormat::Json))]
    #[test_case("pdf" => Some(ExportFormat::Pdf))]
    #[test_case("docx" => None)]
    fn test_parse_format(tag: &str) -> Option<ExportFormat> {
        tag.parse().ok()
    }

    #[test]
    fn test_unsupported_format_error() {
        let err = "xml".parse::<ExportFormat>().unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedFormat(ref t) if t == "xml"));
    }

    #[test]
    fn test_tags_round_trip() {
        for format in ExportFormat::ALL {
            assert_eq!(format.tag().parse::<ExportFormat>().unwrap(), format);
        }
    }

    #[test]
    fn test_export_filename() {
        let mut wb = Workbook::new_table("report.final.xlsx", vec!["A".into()], vec![]);
        assert_eq!(export_filename(&wb, ExportFormat::Csv), "report.final.csv");
        wb.modified = true;
        assert_eq!(
            export_filename(&wb, ExportFormat::Pdf),
            "modified_report.final.pdf"
        );
        wb.name = "noext".into();
        assert_eq!(export_filename(&wb, ExportFormat::Json), "modified_noext.json");
        wb.name = ".hidden".into();
        assert_eq!(export_filename(&wb, ExportFormat::Native), "modified_.hidden.xlsx");
    }

    #[test]
    fn test_csv_is_active_sheet_only() {
        let wb = Workbook::new_table("t", vec!["H".into()], vec![vec![Cell::text("v")]]);
        let bytes = export(&wb, ExportFormat::Csv).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "H\nv");
    }
}
