//! JSON writer: the sheet as an array of row objects keyed by header.

use std::collections::HashMap;

use serde_json::{Map, Number, Value};

use crate::error::ExportError;
use crate::types::{Cell, Sheet};

/// Key used for a blank header.
const EMPTY_HEADER_KEY: &str = "__EMPTY";

/// Unique object keys for `headers`: blanks become `__EMPTY`, and repeats of
/// a key get `_1`, `_2`, ... suffixes in column order.
fn object_keys(headers: &[String]) -> Vec<String> {
    let mut taken: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::with_capacity(headers.len());
    for header in headers {
        let base = if header.is_empty() {
            EMPTY_HEADER_KEY.to_string()
        } else {
            header.clone()
        };
        let mut key = base.clone();
        if let Some(count) = taken.get(&base).copied() {
            let mut n = count;
            loop {
                key = format!("{base}_{n}");
                if !taken.contains_key(&key) {
                    break;
                }
                n += 1;
            }
            taken.insert(base, n + 1);
        } else {
            taken.insert(base, 1);
        }
        taken.entry(key.clone()).or_insert(1);
        keys.push(key);
    }
    keys
}

/// Whole numbers up to 2^53 are written without a fraction, like the CSV
/// display form.
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn number_value(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() < MAX_EXACT_INTEGER {
        #[allow(clippy::cast_possible_truncation)]
        let whole = n as i64;
        return Value::Number(Number::from(whole));
    }
    Number::from_f64(n).map_or(Value::Null, Value::Number)
}

fn cell_value(cell: &Cell) -> Value {
    match cell {
        Cell::Empty => Value::Null,
        Cell::Number(n) => number_value(*n),
        Cell::Text(s) => Value::String(s.clone()),
        Cell::Date(_) => Value::String(cell.to_string()),
    }
}

/// Serialize `sheet` as pretty-printed JSON.
///
/// Numbers stay numbers, dates use their display form and `Empty` is `null`.
/// Keys keep header order.
pub fn write_json(sheet: &Sheet) -> Result<Vec<u8>, ExportError> {
    let keys = object_keys(sheet.headers());
    let records: Vec<Value> = sheet
        .rows()
        .iter()
        .map(|row| {
            let object: Map<String, Value> = keys
                .iter()
                .cloned()
                .zip(row.iter().map(cell_value).chain(std::iter::repeat(Value::Null)))
                .collect();
            Value::Object(object)
        })
        .collect();
    Ok(serde_json::to_vec_pretty(&records)?)
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
    use serde_json::json;

    #[test]
    fn test_rows_as_objects() {
        let sheet = Sheet::new(
            vec!["Name".into(), "Score".into(), "When".into()],
            vec![vec![
                Cell::text("Bob"),
                Cell::Number(7.0),
                Cell::Date(NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()),
            ]],
        );
        let value: Value = serde_json::from_slice(&write_json(&sheet).unwrap()).unwrap();
        assert_eq!(
            value,
            json!([{ "Name": "Bob", "Score": 7, "When": "Mar 15, 2023" }])
        );
    }

    #[test]
    fn test_whole_numbers_have_no_fraction() {
        let sheet = Sheet::new(
            vec!["A".into(), "B".into(), "C".into(), "D".into()],
            vec![vec![
                Cell::Number(7.0),
                Cell::Number(-2.5),
                Cell::Number(1e300),
                Cell::Number(-0.0),
            ]],
        );
        let text = String::from_utf8(write_json(&sheet).unwrap()).unwrap();
        assert!(text.contains("\"A\": 7,"));
        assert!(text.contains("\"B\": -2.5,"));
        assert!(text.contains("\"C\": 1e300,"));
        assert!(text.contains("\"D\": 0\n"));
    }

    #[test]
    fn test_key_order_follows_headers() {
        let sheet = Sheet::new(
            vec!["z".into(), "a".into()],
            vec![vec![Cell::Empty, Cell::text("")]],
        );
        let text = String::from_utf8(write_json(&sheet).unwrap()).unwrap();
        let z = text.find("\"z\"").unwrap();
        let a = text.find("\"a\"").unwrap();
        assert!(z < a);
        assert!(text.contains("\"z\": null"));
        assert!(text.contains("\"a\": \"\""));
    }

    #[test]
    fn test_duplicate_and_blank_headers() {
        let headers: Vec<String> = ["A", "A", "", "A_1", ""]
            .iter()
            .map(|s| (*s).to_string())
            .collect();
        assert_eq!(
            object_keys(&headers),
            vec!["A", "A_1", "__EMPTY", "A_1_1", "__EMPTY_1"]
        );
    }

    #[test]
    fn test_no_rows_is_empty_array() {
        let sheet = Sheet::new(vec!["A".into()], vec![]);
        assert_eq!(write_json(&sheet).unwrap(), b"[]");
    }
}
