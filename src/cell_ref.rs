//! Utilities for A1-style cell references.
//!
//! Rows and columns are 0-indexed throughout the engine; the text form is
//! 1-based (`A1` is `(0, 0)`).

/// Parse a cell reference from raw bytes (ASCII) into (col, row), 0-indexed.
///
/// Works directly on XML attribute values (e.g., `attr.value` from
/// quick-xml). `$` anchors are ignored.
pub fn parse_cell_ref_bytes(ref_bytes: &[u8]) -> Option<(u32, u32)> {
    let mut col: u32 = 0;
    let mut row: u32 = 0;
    let mut saw_col = false;
    let mut saw_row = false;

    for &b in ref_bytes {
        if b == b'$' {
            continue;
        }
        if b.is_ascii_alphabetic() {
            if saw_row {
                return None;
            }
            let upper = b.to_ascii_uppercase();
            col = col
                .saturating_mul(26)
                .saturating_add(u32::from(upper - b'A') + 1);
            saw_col = true;
        } else if b.is_ascii_digit() {
            row = row.saturating_mul(10).saturating_add(u32::from(b - b'0'));
            saw_row = true;
        } else {
            return None;
        }
    }

    if !saw_col || !saw_row || row == 0 {
        return None;
    }

    Some((col - 1, row - 1))
}

/// Parse a cell reference like "A1" into (col, row), 0-indexed.
pub fn parse_cell_ref(cell_ref: &str) -> Option<(u32, u32)> {
    parse_cell_ref_bytes(cell_ref.trim().as_bytes())
}

/// Parse the end corner of a range like "A1:D20" (or a single "D20") into
/// (col, row), 0-indexed.
pub fn parse_range_end(range: &str) -> Option<(u32, u32)> {
    let end = range.split_once(':').map_or(range, |(_, end)| end);
    parse_cell_ref(end)
}

/// Convert a 0-indexed column to letters (`0` → `A`, `26` → `AA`).
pub fn col_to_letter(col: u32) -> String {
    let mut result = Vec::new();
    let mut n = u64::from(col) + 1; // Convert to 1-based
    while n > 0 {
        n -= 1;
        // n % 26 < 26, so the narrowing is lossless.
        #[allow(clippy::cast_possible_truncation)]
        let offset = (n % 26) as u8;
        result.push(b'A' + offset);
        n /= 26;
    }
    result.reverse();
    String::from_utf8(result).unwrap_or_default()
}

/// Format a 0-indexed (row, col) as an A1 reference.
pub fn cell_ref(row: u32, col: u32) -> String {
    format!("{}{}", col_to_letter(col), u64::from(row) + 1)
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
    use test_case::test_case;

    #[test_case("A1" => Some((0, 0)))]
    #[test_case("B3" => Some((1, 2)))]
    #[test_case("$AA$10" => Some((26, 9)))]
    #[test_case("xfd1048576" => Some((16383, 1_048_575)))]
    #[test_case("A0" => None)]
    #[test_case("12" => None)]
    #[test_case("A1B" => None)]
    #[test_case("" => None)]
    fn test_parse_cell_ref(input: &str) -> Option<(u32, u32)> {
        parse_cell_ref(input)
    }

    #[test]
    fn test_parse_range_end() {
        assert_eq!(parse_range_end("A1:D20"), Some((3, 19)));
        assert_eq!(parse_range_end("C5"), Some((2, 4)));
        assert_eq!(parse_range_end("A1:"), None);
    }

    #[test_case(0 => "A")]
    #[test_case(25 => "Z")]
    #[test_case(26 => "AA")]
    #[test_case(701 => "ZZ")]
    #[test_case(702 => "AAA")]
    fn test_col_to_letter(col: u32) -> String {
        col_to_letter(col)
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(9, 27), "AB10");
    }
}
