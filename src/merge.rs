//! Row-wise merge of sheets that share a header row.

use crate::error::MergeError;
use crate::types::{NamedSheet, Sheet, Workbook};

/// Concatenate the rows of `sheets`, in input order, under the first sheet's
/// headers.
///
/// Every sheet must have exactly the same headers (length, text, order).
/// Duplicate rows are kept. On error nothing is produced.
pub fn merge(sheets: &[&Sheet]) -> Result<Sheet, MergeError> {
    let [first, rest @ ..] = sheets else {
        return Err(MergeError::InsufficientInputs { found: 0 });
    };
    if rest.is_empty() {
        return Err(MergeError::InsufficientInputs { found: 1 });
    }

    let expected = first.headers();
    if let Some((offset, mismatch)) = rest
        .iter()
        .enumerate()
        .find(|(_, s)| s.headers() != expected)
    {
        return Err(MergeError::HeaderMismatch {
            index: offset + 1,
            expected: expected.to_vec(),
            found: mismatch.headers().to_vec(),
        });
    }

    let total = sheets.iter().map(|s| s.height()).sum();
    let mut rows = Vec::with_capacity(total);
    for sheet in sheets {
        rows.extend_from_slice(sheet.rows());
    }
    log::debug!("merged {} sheets into {total} rows", sheets.len());
    Ok(first.with_rows(rows))
}

/// Merge the active sheets of `workbooks` into a new single-sheet workbook.
///
/// The workbook and its only sheet are both called `result_name`, which must
/// not be blank. The result is marked modified since it exists only in
/// memory.
pub fn merge_workbooks(workbooks: &[&Workbook], result_name: &str) -> Result<Workbook, MergeError> {
    let sheets: Vec<&Sheet> = workbooks.iter().filter_map(|w| w.active_sheet()).collect();
    if sheets.len() < workbooks.len().max(2) {
        return Err(MergeError::InsufficientInputs {
            found: sheets.len(),
        });
    }
    if result_name.trim().is_empty() {
        return Err(MergeError::BlankName);
    }
    let merged = merge(&sheets)?;
    let mut workbook = Workbook::from_sheet(result_name, NamedSheet::new(result_name, merged));
    workbook.modified = true;
    Ok(workbook)
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

    fn sheet(headers: &[&str], rows: usize, tag: &str) -> Sheet {
        Sheet::new(
            headers.iter().map(|h| (*h).to_string()).collect(),
            (0..rows)
                .map(|i| vec![Cell::text(format!("{tag}{i}")); headers.len()])
                .collect(),
        )
    }

    #[test]
    fn test_row_count_and_order() {
        let a = sheet(&["A", "B"], 3, "a");
        let b = sheet(&["A", "B"], 5, "b");
        let merged = merge(&[&a, &b]).unwrap();
        assert_eq!(merged.headers(), &["A", "B"]);
        assert_eq!(merged.height(), 8);
        assert_eq!(merged.rows()[0][0], Cell::text("a0"));
        assert_eq!(merged.rows()[3][0], Cell::text("b0"));
    }

    #[test]
    fn test_header_mismatch() {
        let a = sheet(&["A", "B"], 1, "a");
        let b = sheet(&["A", "B"], 1, "b");
        let c = sheet(&["A", "C"], 1, "c");
        let err = merge(&[&a, &b, &c]).unwrap_err();
        assert_eq!(
            err,
            MergeError::HeaderMismatch {
                index: 2,
                expected: vec!["A".into(), "B".into()],
                found: vec!["A".into(), "C".into()],
            }
        );
    }

    #[test]
    fn test_header_order_and_length_matter() {
        let a = sheet(&["A", "B"], 1, "a");
        assert!(merge(&[&a, &sheet(&["B", "A"], 1, "b")]).is_err());
        assert!(merge(&[&a, &sheet(&["A", "B", ""], 1, "b")]).is_err());
    }

    #[test]
    fn test_insufficient_inputs() {
        let a = sheet(&["A"], 1, "a");
        assert_eq!(
            merge(&[&a]),
            Err(MergeError::InsufficientInputs { found: 1 })
        );
        assert_eq!(merge(&[]), Err(MergeError::InsufficientInputs { found: 0 }));
    }

    #[test]
    fn test_duplicates_kept() {
        let a = sheet(&["A"], 2, "x");
        let merged = merge(&[&a, &a]).unwrap();
        assert_eq!(merged.height(), 4);
        assert_eq!(merged.rows()[0], merged.rows()[2]);
    }

    #[test]
    fn test_merge_workbooks() {
        let one = Workbook::new_table("one", vec!["N".into()], vec![vec![Cell::Number(1.0)]]);
        let two = Workbook::new_table("two", vec!["N".into()], vec![vec![Cell::Number(2.0)]]);
        let merged = merge_workbooks(&[&one, &two], "Combined").unwrap();
        assert_eq!(merged.name, "Combined");
        assert_eq!(merged.active_sheet_name(), "Combined");
        assert!(merged.modified);
        assert_eq!(merged.active_sheet().unwrap().height(), 2);
    }

    #[test]
    fn test_merge_workbooks_requires_a_name() {
        let one = Workbook::new_table("one", vec!["N".into()], vec![]);
        let two = Workbook::new_table("two", vec!["N".into()], vec![]);
        assert_eq!(merge_workbooks(&[&one, &two], ""), Err(MergeError::BlankName));
        assert_eq!(merge_workbooks(&[&one, &two], " \t"), Err(MergeError::BlankName));
        assert_eq!(
            merge_workbooks(&[&one], ""),
            Err(MergeError::InsufficientInputs { found: 1 })
        );
    }
}
