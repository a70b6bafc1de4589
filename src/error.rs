//! Structured error types for xlgrid.
//!
//! Each engine operation has its own error enum so callers can match on the
//! failure kinds that operation can actually produce. [`XlgridError`] wraps
//! all of them for code (the CLI, the wasm bindings) that chains operations.

/// Failure to decode an input buffer into a [`Workbook`](crate::types::Workbook).
///
/// Terminal for that input: nothing is partially produced.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The buffer is neither a ZIP (OOXML) nor a compound-file (legacy) container.
    #[error("unrecognized spreadsheet container")]
    UnrecognizedContainer,

    /// ZIP archive error.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// XML parsing error from quick-xml.
    #[error("XML parsing: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Legacy workbook decoding error.
    #[error("legacy workbook: {0}")]
    Legacy(#[from] calamine::XlsError),

    /// A part the container format requires is absent.
    #[error("missing part: {0}")]
    MissingPart(String),

    /// A worksheet decoded to zero rows.
    #[error("Sheet '{name}' is empty")]
    EmptyWorksheet { name: String },

    /// A worksheet's cells span more of the grid than the parser will hold.
    #[error("Sheet '{name}' is too large ({rows} rows x {cols} columns)")]
    TooLarge {
        name: String,
        rows: usize,
        cols: usize,
    },

    /// The workbook holds no usable worksheet.
    #[error("No valid worksheets found")]
    NoWorksheets,

    /// I/O error while reading a part.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to merge sheets. No output is produced in either case.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Fewer than two sheets were supplied.
    #[error("at least 2 sheets are required to merge, got {found}")]
    InsufficientInputs { found: usize },

    /// A sheet's headers differ from the first sheet's headers.
    #[error("headers of input {index} ({found:?}) do not match {expected:?}")]
    HeaderMismatch {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// The merged workbook was given an empty or whitespace-only name.
    #[error("a name is required for the merged workbook")]
    BlankName,
}

/// Failure to serialize a workbook.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// The requested format tag is not one of `native`, `csv`, `json`, `pdf`.
    #[error("unsupported export format: {0}")]
    UnsupportedFormat(String),

    /// The workbook's active sheet name does not resolve to a sheet.
    #[error("active sheet '{0}' not found")]
    MissingActiveSheet(String),

    /// ZIP archive error while writing the native container.
    #[error("ZIP archive: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// Delimited text writer error.
    #[error("CSV: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Invalid structural edit (index or sheet name out of range).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("row {row} out of range ({len} rows)")]
    RowOutOfRange { row: usize, len: usize },

    #[error("column {col} out of range ({len} columns)")]
    ColumnOutOfRange { col: usize, len: usize },

    #[error("no sheet named '{0}'")]
    UnknownSheet(String),

    #[error("a workbook needs at least one sheet")]
    NoSheets,

    #[error("duplicate sheet name '{0}'")]
    DuplicateSheet(String),
}

/// All errors that can occur in xlgrid.
#[derive(Debug, thiserror::Error)]
pub enum XlgridError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Convenience alias used by code that chains several operations.
pub type Result<T> = std::result::Result<T, XlgridError>;

#[cfg(target_arch = "wasm32")]
impl From<XlgridError> for wasm_bindgen::JsValue {
    fn from(e: XlgridError) -> Self {
        wasm_bindgen::JsValue::from_str(&e.to_string())
    }
}
