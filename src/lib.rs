//! xlgrid - tabular data engine for spreadsheet files
//!
//! Reads `.xlsx` and legacy `.xls` workbooks into a rectangular grid of
//! typed cells, then:
//! - sorts the active sheet by any column
//! - merges sheets that share a header row
//! - exports to `.xlsx`, CSV, JSON or PDF
//!
//! Every operation returns a new value; inputs are never mutated.
//!
//! # Usage (Rust)
//!
//! ```no_run
//! use xlgrid::{export, parse_file, sort_active, ExportFormat, ParseOptions};
//!
//! # fn main() -> xlgrid::Result<()> {
//! let bytes = std::fs::read("scores.xlsx").map_err(xlgrid::ParseError::Io)?;
//! let workbook = parse_file("scores.xlsx", &bytes, ParseOptions::default())?;
//! let sorted = sort_active(&workbook, 1)?;
//! let csv = export(&sorted, ExportFormat::Csv)?;
//! # let _ = csv;
//! # Ok(())
//! # }
//! ```
//!
//! # Usage (JavaScript)
//!
//! ```javascript
//! import init, { parseWorkbook, sortActiveSheet, exportWorkbook } from 'xlgrid';
//! await init();
//! const wb = parseWorkbook(file.name, new Uint8Array(await file.arrayBuffer()));
//! const csv = exportWorkbook(sortActiveSheet(wb, 0), 'csv');
//! ```

pub mod bindings;
pub mod cell_ref;
pub mod dates;
pub mod error;
pub mod export;
pub mod merge;
pub mod normalize;
pub mod numfmt;
pub mod parser;
pub mod sort;
pub mod types;

pub use error::{EditError, ExportError, MergeError, ParseError, Result, XlgridError};
pub use export::{export, export_filename, ExportFormat, PdfOptions};
pub use merge::{merge, merge_workbooks};
pub use parser::{parse, parse_batch, parse_file, parse_with_options, BatchOutcome, ParseOptions};
pub use sort::{sort, sort_active};
pub use types::*;
