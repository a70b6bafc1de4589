//! JavaScript entry points.
//!
//! Workbooks cross the boundary as plain objects (the serde form of
//! [`Workbook`]); every call returns a new object and never mutates its input.
//! Errors are thrown as strings.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::export::{export, export_filename, ExportFormat};
use crate::merge::merge_workbooks;
use crate::parser::{parse_batch, parse_file, ParseOptions};
use crate::sort::sort_active;
use crate::types::{Cell, Workbook};

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value)
        .map_err(|e| JsValue::from_str(&format!("Serialization error: {e}")))
}

fn from_js(value: JsValue) -> Result<Workbook, JsValue> {
    serde_wasm_bindgen::from_value(value)
        .map_err(|e| JsValue::from_str(&format!("Invalid workbook: {e}")))
}

/// Parse one spreadsheet file into a workbook object.
///
/// # Errors
/// Throws if the bytes are not a readable workbook or a sheet is empty.
#[wasm_bindgen(js_name = parseWorkbook)]
pub fn parse_workbook(name: &str, data: &[u8]) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let workbook = parse_file(name, data, ParseOptions::default()).map_err(js_error)?;
    to_js(&workbook)
}

#[derive(Serialize)]
struct BatchEntry<'a> {
    name: &'a str,
    workbook: Option<&'a Workbook>,
    error: Option<String>,
}

#[derive(Serialize)]
struct BatchView<'a> {
    results: Vec<BatchEntry<'a>>,
    active: Option<usize>,
}

/// Parse several files in order.
///
/// `buffers` is an array of `Uint8Array`, parallel to `names`. Returns
/// `{ results: [{ name, workbook, error }], active }` where `active` is the
/// index of the last file that parsed.
///
/// # Errors
/// Throws if the two arrays differ in length.
#[wasm_bindgen(js_name = parseFiles)]
pub fn parse_files(names: Vec<String>, buffers: js_sys::Array) -> Result<JsValue, JsValue> {
    console_error_panic_hook::set_once();
    let buffers: Vec<Vec<u8>> = buffers
        .iter()
        .map(|b| js_sys::Uint8Array::new(&b).to_vec())
        .collect();
    if buffers.len() != names.len() {
        return Err(JsValue::from_str("names and buffers must have the same length"));
    }
    let inputs: Vec<(&str, &[u8])> = names
        .iter()
        .map(String::as_str)
        .zip(buffers.iter().map(Vec::as_slice))
        .collect();
    let outcome = parse_batch(&inputs);
    let view = BatchView {
        results: names
            .iter()
            .zip(&outcome.results)
            .map(|(name, result)| BatchEntry {
                name,
                workbook: result.as_ref().ok(),
                error: result.as_ref().err().map(ToString::to_string),
            })
            .collect(),
        active: outcome.active,
    };
    to_js(&view)
}

/// Sort the active sheet by column `col`.
///
/// # Errors
/// Throws on an invalid workbook object or a column outside the sheet.
#[wasm_bindgen(js_name = sortActiveSheet)]
pub fn sort_active_sheet(workbook: JsValue, col: usize) -> Result<JsValue, JsValue> {
    let workbook = from_js(workbook)?;
    to_js(&sort_active(&workbook, col).map_err(js_error)?)
}

/// Merge the active sheets of `workbooks` into a new workbook.
///
/// # Errors
/// Throws on fewer than two workbooks or differing headers.
#[wasm_bindgen(js_name = mergeWorkbooks)]
pub fn merge_workbooks_js(workbooks: JsValue, result_name: &str) -> Result<JsValue, JsValue> {
    let workbooks: Vec<Workbook> = serde_wasm_bindgen::from_value(workbooks)
        .map_err(|e| JsValue::from_str(&format!("Invalid workbooks: {e}")))?;
    let refs: Vec<&Workbook> = workbooks.iter().collect();
    to_js(&merge_workbooks(&refs, result_name).map_err(js_error)?)
}

/// Edit one cell of the active sheet with editor input.
///
/// # Errors
/// Throws on an invalid workbook object or an index outside the sheet.
#[wasm_bindgen(js_name = editCell)]
pub fn edit_cell(workbook: JsValue, row: usize, col: usize, input: &str) -> Result<JsValue, JsValue> {
    let workbook = from_js(workbook)?;
    let edited = workbook
        .edit_active(|sheet| sheet.with_cell(row, col, input))
        .map_err(js_error)?;
    to_js(&edited)
}

/// Create a single-sheet table with `headers` and one empty row.
///
/// # Errors
/// Throws only if the result cannot be serialized.
#[wasm_bindgen(js_name = newTable)]
pub fn new_table(name: &str, headers: Vec<String>) -> Result<JsValue, JsValue> {
    let width = headers.len();
    to_js(&Workbook::new_table(name, headers, vec![vec![Cell::Empty; width]]))
}

/// Export to `format` (`native`, `csv`, `json` or `pdf`). Returns the bytes.
///
/// # Errors
/// Throws on an unknown format tag or an invalid workbook object.
#[wasm_bindgen(js_name = exportWorkbook)]
pub fn export_workbook(workbook: JsValue, format: &str) -> Result<Vec<u8>, JsValue> {
    let workbook = from_js(workbook)?;
    let format: ExportFormat = format.parse().map_err(js_error)?;
    export(&workbook, format).map_err(js_error)
}

/// Download name and MIME type for an export, as `{ filename, mimeType }`.
///
/// # Errors
/// Throws on an unknown format tag or an invalid workbook object.
#[wasm_bindgen(js_name = exportTarget)]
pub fn export_target(workbook: JsValue, format: &str) -> Result<JsValue, JsValue> {
    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Target {
        filename: String,
        mime_type: &'static str,
    }

    let workbook = from_js(workbook)?;
    let format: ExportFormat = format.parse().map_err(js_error)?;
    to_js(&Target {
        filename: export_filename(&workbook, format),
        mime_type: format.mime_type(),
    })
}

/// Get the library version
#[must_use]
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
