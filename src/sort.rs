//! Column sort.
//!
//! Ordering for one column, first rule that decides wins:
//! empty cells last, then numeric comparison when both values read as
//! numbers, then chronological when both read as dates, then
//! case-insensitive text in Unicode collation order (root locale), so
//! accented letters sort next to their base letters.

use std::cmp::Ordering;

use feruca::Collator;

use crate::error::EditError;
use crate::types::{Cell, Sheet, Workbook};

/// Cell ordering for one sort. Holds the collator and its cache, so reuse
/// one comparer across a whole column.
pub struct CellComparer {
    collator: Collator,
}

impl Default for CellComparer {
    fn default() -> Self {
        Self::new()
    }
}

impl CellComparer {
    pub fn new() -> Self {
        Self {
            collator: Collator::default(),
        }
    }

    /// Compare two cells of the sorted column.
    pub fn compare(&mut self, a: &Cell, b: &Cell) -> Ordering {
        match (a.is_empty(), b.is_empty()) {
            (true, true) => return Ordering::Equal,
            (true, false) => return Ordering::Greater,
            (false, true) => return Ordering::Less,
            (false, false) => {}
        }

        if let (Some(x), Some(y)) = (a.as_number(), b.as_number()) {
            // Both finite, so partial_cmp always answers.
            return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
        }

        if let (Some(x), Some(y)) = (a.as_date(), b.as_date()) {
            return x.cmp(&y);
        }

        self.compare_text(&a.to_string(), &b.to_string())
    }

    /// Collation order of the lowercased text; code point order breaks
    /// collation ties.
    fn compare_text(&mut self, a: &str, b: &str) -> Ordering {
        let a = a.to_lowercase();
        let b = b.to_lowercase();
        self.collator.collate(&a, &b).then_with(|| a.cmp(&b))
    }
}

/// Compare two cells of the sorted column with a fresh [`CellComparer`].
pub fn compare_cells(a: &Cell, b: &Cell) -> Ordering {
    CellComparer::new().compare(a, b)
}

/// Stable top-down merge sort.
///
/// `slice::sort_by` may panic when the comparator is not a total order, which
/// mixed-type columns can produce; this one only ever asks "is right strictly
/// less than left".
fn merge_sort<T, F>(mut items: Vec<T>, cmp: &mut F) -> Vec<T>
where
    F: FnMut(&T, &T) -> Ordering,
{
    if items.len() <= 1 {
        return items;
    }
    let right = items.split_off(items.len() / 2);
    let left = merge_sort(items, cmp);
    let right = merge_sort(right, cmp);

    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let take_right = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => cmp(r, l) == Ordering::Less,
            (Some(_), None) => false,
            (None, Some(_)) => true,
            (None, None) => break,
        };
        merged.extend(if take_right { right.next() } else { left.next() });
    }
    merged
}

/// Return a copy of `sheet` with its data rows ordered by column `col`.
///
/// Headers never move. Equal keys keep their input order. A column index
/// outside the sheet leaves the rows as they are.
pub fn sort(sheet: &Sheet, col: usize) -> Sheet {
    if col >= sheet.width() {
        log::debug!("sort column {col} outside {} columns", sheet.width());
        return sheet.clone();
    }
    let mut comparer = CellComparer::new();
    let rows = merge_sort(sheet.rows().to_vec(), &mut |a: &Vec<Cell>, b: &Vec<Cell>| {
        match (a.get(col), b.get(col)) {
            (Some(x), Some(y)) => comparer.compare(x, y),
            _ => Ordering::Equal,
        }
    });
    sheet.with_rows(rows)
}

/// Sort the workbook's active sheet, marking the workbook modified.
pub fn sort_active(workbook: &Workbook, col: usize) -> Result<Workbook, EditError> {
    if col >= workbook.active_sheet().map_or(0, Sheet::width) {
        return Err(EditError::ColumnOutOfRange {
            col,
            len: workbook.active_sheet().map_or(0, Sheet::width),
        });
    }
    workbook.edit_active(|sheet| Ok(sort(sheet, col)))
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
    use test_case::test_case;

    fn sheet(rows: Vec<Vec<Cell>>) -> Sheet {
        Sheet::new(vec!["Name".into(), "Score".into()], rows)
    }

    #[test_case(Cell::Empty, Cell::Empty => Ordering::Equal; "two empties")]
    #[test_case(Cell::Empty, Cell::text("a") => Ordering::Greater; "empty after text")]
    #[test_case(Cell::Number(-5.0), Cell::Empty => Ordering::Less; "number before empty")]
    #[test_case(Cell::text(" 10 "), Cell::Number(9.0) => Ordering::Greater; "numeric text")]
    #[test_case(Cell::text("7kg"), Cell::text("10kg") => Ordering::Greater; "partial numbers are text")]
    #[test_case(Cell::text("Jan 5, 2024"), Cell::text("Dec 1, 2023") => Ordering::Greater; "formatted dates")]
    #[test_case(Cell::text("apple"), Cell::text("Banana") => Ordering::Less; "case insensitive")]
    #[test_case(Cell::text("ABC"), Cell::text("abc") => Ordering::Equal; "case only differs")]
    #[test_case(Cell::text("Émile"), Cell::text("zebra") => Ordering::Less; "accent sorts with base letter")]
    #[test_case(Cell::text("éclair"), Cell::text("Eclair") => Ordering::Greater; "accent after plain letter")]
    fn test_compare_cells(a: Cell, b: Cell) -> Ordering {
        compare_cells(&a, &b)
    }

    #[test]
    fn test_dates_compare_chronologically() {
        let early = Cell::Date(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap());
        let late = Cell::text("Jan 5, 2024");
        assert_eq!(compare_cells(&early, &late), Ordering::Less);
    }

    #[test]
    fn test_accented_text_sorts_with_base_letters() {
        let s = Sheet::new(
            vec!["Word".into()],
            vec![
                vec![Cell::text("zebra")],
                vec![Cell::text("Émile")],
                vec![Cell::text("apple")],
                vec![Cell::text("olive")],
                vec![Cell::text("ñandú")],
            ],
        );
        let sorted = sort(&s, 0);
        let words: Vec<String> = sorted.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(words, vec!["apple", "Émile", "ñandú", "olive", "zebra"]);
    }

    #[test]
    fn test_stability() {
        let s = Sheet::new(
            vec!["K".into(), "V".into()],
            vec![
                vec![Cell::text("b"), Cell::Number(1.0)],
                vec![Cell::text("a"), Cell::Number(1.0)],
                vec![Cell::text("a"), Cell::Number(2.0)],
            ],
        );
        let sorted = sort(&s, 1);
        assert_eq!(sorted.rows(), s.rows());
    }

    #[test]
    fn test_already_sorted_scenario() {
        let s = sheet(vec![
            vec![Cell::text("Bob"), Cell::Number(7.0)],
            vec![Cell::text("Amy"), Cell::Number(9.0)],
        ]);
        assert_eq!(sort(&s, 1), s);
        let by_name = sort(&s, 0);
        assert_eq!(by_name.rows()[0][0], Cell::text("Amy"));
        assert_eq!(by_name.headers(), s.headers());
    }

    #[test]
    fn test_empty_cells_sort_last_and_idempotent() {
        let s = sheet(vec![
            vec![Cell::text("x"), Cell::Empty],
            vec![Cell::text("y"), Cell::Number(3.0)],
            vec![Cell::text("z"), Cell::text("2")],
            vec![Cell::text("w"), Cell::Empty],
        ]);
        let once = sort(&s, 1);
        let names: Vec<String> = once.rows().iter().map(|r| r[0].to_string()).collect();
        assert_eq!(names, vec!["z", "y", "x", "w"]);
        assert_eq!(sort(&once, 1), once);
    }

    #[test]
    fn test_mixed_column_does_not_panic() {
        let mut rows = Vec::new();
        for i in 0..200 {
            let cell = match i % 4 {
                0 => Cell::Number(f64::from(i)),
                1 => Cell::text(format!("item {i}")),
                2 => Cell::text("Mar 15, 2023"),
                _ => Cell::text(format!("{}", 300 - i)),
            };
            rows.push(vec![Cell::Empty, cell]);
        }
        let sorted = sort(&sheet(rows.clone()), 1);
        assert_eq!(sorted.height(), rows.len());
    }

    #[test]
    fn test_out_of_range_column() {
        let s = sheet(vec![vec![Cell::text("b"), Cell::Empty]]);
        assert_eq!(sort(&s, 5), s);
    }

    #[test]
    fn test_sort_active_marks_modified() {
        let wb = Workbook::new_table(
            "T",
            vec!["N".into()],
            vec![vec![Cell::Number(2.0)], vec![Cell::Number(1.0)]],
        );
        assert!(!wb.modified);
        let sorted = sort_active(&wb, 0).unwrap();
        assert!(sorted.modified);
        assert_eq!(sorted.active_sheet().unwrap().rows()[0][0], Cell::Number(1.0));
        assert!(sort_active(&wb, 3).is_err());
    }
}
