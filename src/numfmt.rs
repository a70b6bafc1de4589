//! Number format classification.
//!
//! The engine does not render number formats; it only needs to know whether
//! a numeric cell is tagged as a date so the date heuristic can pick it up.
//!
//! Format codes can have up to 4 sections separated by semicolons and may
//! include color specifications (`[Red]`) or conditions (`[>100]`), which are
//! ignored here.

/// Custom format id the native writer assigns to its date style.
pub const DATE_NUM_FMT_ID: u32 = 164;

/// Format code of the native writer's date style (renders as `Mar 15, 2023`).
pub const DATE_NUM_FMT_CODE: &str = "mmm d, yyyy";

/// Built-in number format IDs (0-49 are predefined by Excel)
/// See: ECMA-376 Part 1, Section 18.8.30
pub const fn get_builtin_format(id: u32) -> Option<&'static str> {
    match id {
        0 => Some("General"),
        1 => Some("0"),
        2 => Some("0.00"),
        3 => Some("#,##0"),
        4 => Some("#,##0.00"),
        // Currency formats (5-8)
        5 => Some("$#,##0_);($#,##0)"),
        6 => Some("$#,##0_);[Red]($#,##0)"),
        7 => Some("$#,##0.00_);($#,##0.00)"),
        8 => Some("$#,##0.00_);[Red]($#,##0.00)"),
        9 => Some("0%"),
        10 => Some("0.00%"),
        11 => Some("0.00E+00"),
        12 => Some("# ?/?"),
        13 => Some("# ??/??"),
        14 => Some("mm-dd-yy"),
        15 => Some("d-mmm-yy"),
        16 => Some("d-mmm"),
        17 => Some("mmm-yy"),
        18 => Some("h:mm AM/PM"),
        19 => Some("h:mm:ss AM/PM"),
        20 => Some("h:mm"),
        21 => Some("h:mm:ss"),
        22 => Some("m/d/yy h:mm"),
        37 => Some("#,##0 ;(#,##0)"),
        38 => Some("#,##0 ;[Red](#,##0)"),
        39 => Some("#,##0.00;(#,##0.00)"),
        40 => Some("#,##0.00;[Red](#,##0.00)"),
        // Accounting formats (41-44)
        41 => Some("_(* #,##0_);_(* (#,##0);_(* \"-\"_);_(@_)"),
        42 => Some("_($* #,##0_);_($* (#,##0);_($* \"-\"_);_(@_)"),
        43 => Some("_(* #,##0.00_);_(* (#,##0.00);_(* \"-\"??_);_(@_)"),
        44 => Some("_($* #,##0.00_);_($* (#,##0.00);_($* \"-\"??_);_(@_)"),
        45 => Some("mm:ss"),
        46 => Some("[h]:mm:ss"),
        47 => Some("mmss.0"),
        48 => Some("##0.0E+0"),
        49 => Some("@"),
        _ => None,
    }
}

/// Check if a format code is a date/time format
pub fn is_date_format(format_code: &str) -> bool {
    let lower = format_code.to_lowercase();

    // Skip text in quotes and brackets
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut cleaned = String::new();

    for c in lower.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            '[' => in_brackets = true,
            ']' => in_brackets = false,
            _ if !in_quotes && !in_brackets => cleaned.push(c),
            _ => {}
        }
    }

    cleaned.contains('y') ||
    cleaned.contains('m') && !cleaned.contains('#') ||  // m is month if no # (number format)
    cleaned.contains('d') ||
    cleaned.contains('h') ||
    cleaned.contains('s') && cleaned.contains(':') // s is seconds if with colon
}

/// Resolve a format id (built-in first, then the workbook's custom codes)
/// and report whether it formats dates.
pub fn is_date_format_id(id: u32, custom: &[(u32, String)]) -> bool {
    if let Some(code) = get_builtin_format(id) {
        return is_date_format(code);
    }
    custom
        .iter()
        .find(|(custom_id, _)| *custom_id == id)
        .is_some_and(|(_, code)| is_date_format(code))
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
    fn test_date_detection() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("m/d/yy"));
        assert!(is_date_format(DATE_NUM_FMT_CODE));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("General"));
        assert!(!is_date_format("[Red]0.00"));
    }

    #[test]
    fn test_builtin_ids() {
        assert!(is_date_format_id(14, &[]));
        assert!(is_date_format_id(22, &[]));
        assert!(!is_date_format_id(0, &[]));
        assert!(!is_date_format_id(9, &[]));
    }

    #[test]
    fn test_custom_ids() {
        let custom = vec![
            (DATE_NUM_FMT_ID, DATE_NUM_FMT_CODE.to_string()),
            (165, "0.000".to_string()),
        ];
        assert!(is_date_format_id(DATE_NUM_FMT_ID, &custom));
        assert!(!is_date_format_id(165, &custom));
        assert!(!is_date_format_id(170, &custom));
    }
}
