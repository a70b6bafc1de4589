//! Date heuristic: spreadsheet serials and the formatted-date pattern.
//!
//! Spreadsheet dates are days since 1899-12-30, so serial 25569 is
//! 1970-01-01. Inside the grid a parsed date is rendered as
//! `"<Mon> <D>, <YYYY>"` (fixed English month abbreviations), e.g.
//! `"Jan 5, 2024"`. The native writer converts that form back to a serial.
//!
//! Classification is deliberately loose: any positive non-integer number in a
//! data row is treated as a serial, so a genuine fraction such as `0.5` reads
//! as `Dec 30, 1899`. Integers are only treated as dates when the container
//! marks the cell with a date number format.

use std::sync::LazyLock;

use chrono::{Days, NaiveDate, NaiveTime};
use regex::Regex;

/// Serial number of 1970-01-01.
pub const SERIAL_UNIX_EPOCH: f64 = 25569.0;

/// Milliseconds per day.
pub const MS_PER_DAY: f64 = 86_400_000.0;

/// Largest serial the engine converts (Dec 31, 9999).
const MAX_SERIAL: f64 = 2_958_465.0;

static FORMATTED_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z]{3} \d{1,2}, \d{4}$").ok());

static ISO_DATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").ok());

fn serial_epoch() -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(1899, 12, 30)
}

/// Whether a numeric data cell should be read as a date serial.
///
/// `date_styled` is true when the source cell carries a date number format.
pub fn is_serial_candidate(value: f64, date_styled: bool) -> bool {
    value.is_finite() && value > 0.0 && (value.fract() != 0.0 || date_styled)
}

/// Convert a serial to a calendar date. The time-of-day fraction is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || !(0.0..=MAX_SERIAL).contains(&serial) {
        return None;
    }
    // Range-checked above, so the floor fits in a u64.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let days = serial.floor() as u64;
    serial_epoch()?.checked_add_days(Days::new(days))
}

/// Whether `date` has a positive serial (Dec 31, 1899 or later), the range
/// that reads back as a date. Earlier days are kept as text.
pub fn has_date_serial(date: NaiveDate) -> bool {
    date_to_serial(date) >= 1.0
}

/// Convert a calendar date to its serial: `25569 + epochMillis / 86_400_000`.
#[allow(clippy::cast_precision_loss)]
pub fn date_to_serial(date: NaiveDate) -> f64 {
    let millis = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
    SERIAL_UNIX_EPOCH + millis as f64 / MS_PER_DAY
}

/// Render a date in the canonical in-grid form, e.g. `"Mar 15, 2023"`.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Parse the canonical `"<Mon> <D>, <YYYY>"` form.
///
/// Strings that match the shape but name an impossible day (`"Feb 30, 2024"`)
/// are not dates.
pub fn parse_formatted_date(text: &str) -> Option<NaiveDate> {
    let matches = FORMATTED_DATE
        .as_ref()
        .is_some_and(|re| re.is_match(text));
    if !matches {
        return None;
    }
    NaiveDate::parse_from_str(text, "%b %d, %Y").ok()
}

/// Parse an ISO `YYYY-MM-DD` date as typed into a cell editor.
pub fn parse_iso_date(text: &str) -> Option<NaiveDate> {
    let matches = ISO_DATE.as_ref().is_some_and(|re| re.is_match(text));
    if !matches {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
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

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_unix_epoch_serial() {
        assert_eq!(serial_to_date(25569.0), Some(ymd(1970, 1, 1)));
        assert!((date_to_serial(ymd(1970, 1, 1)) - 25569.0).abs() < 1e-9);
    }

    #[test]
    fn test_serial_45000() {
        let date = serial_to_date(45000.0).unwrap();
        assert_eq!(format_date(date), "Mar 15, 2023");
        assert!((date_to_serial(date) - 45000.0).abs() < 1e-9);
    }

    #[test]
    fn test_fraction_drops_time_of_day() {
        assert_eq!(serial_to_date(45000.75), Some(ymd(2023, 3, 15)));
    }

    #[test]
    fn test_half_is_a_date_documented_limitation() {
        // A genuine 0.5 ("50%") is read as a serial. Inherited behavior.
        assert!(is_serial_candidate(0.5, false));
        assert_eq!(format_date(serial_to_date(0.5).unwrap()), "Dec 30, 1899");
    }

    #[test_case(7.0, false => false; "integer without date format")]
    #[test_case(45000.0, true => true; "integer with date format")]
    #[test_case(1.25, false => true; "positive fraction")]
    #[test_case(-1.5, false => false; "negative fraction")]
    #[test_case(0.0, true => false; "zero")]
    #[test_case(f64::NAN, true => false; "nan")]
    fn test_serial_candidate(value: f64, date_styled: bool) -> bool {
        is_serial_candidate(value, date_styled)
    }

    #[test]
    fn test_format_has_no_zero_padding() {
        assert_eq!(format_date(ymd(2024, 1, 5)), "Jan 5, 2024");
        assert_eq!(format_date(ymd(2024, 12, 25)), "Dec 25, 2024");
    }

    #[test_case("Jan 5, 2024" => Some((2024, 1, 5)); "single digit day")]
    #[test_case("Dec 25, 2024" => Some((2024, 12, 25)); "two digit day")]
    #[test_case("jan 05, 2024" => Some((2024, 1, 5)); "lowercase and padded")]
    #[test_case("Feb 30, 2024" => None; "impossible day")]
    #[test_case("January 5, 2024" => None; "long month name")]
    #[test_case("Jan 5 2024" => None; "missing comma")]
    #[test_case("2024-01-05" => None; "iso form")]
    fn test_parse_formatted(text: &str) -> Option<(i32, u32, u32)> {
        use chrono::Datelike;
        parse_formatted_date(text).map(|d| (d.year(), d.month(), d.day()))
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_iso_date("2024-02-29"), Some(ymd(2024, 2, 29)));
        assert_eq!(parse_iso_date("2023-02-29"), None);
        assert_eq!(parse_iso_date("2024-2-9"), None);
    }

    #[test]
    fn test_has_date_serial() {
        assert!(has_date_serial(ymd(1899, 12, 31)));
        assert!(!has_date_serial(ymd(1899, 12, 30)));
        assert!(!has_date_serial(ymd(1066, 10, 14)));
    }

    #[test]
    fn test_out_of_range_serial() {
        assert_eq!(serial_to_date(f64::INFINITY), None);
        assert_eq!(serial_to_date(1e12), None);
    }
}
