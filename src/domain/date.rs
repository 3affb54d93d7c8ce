use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Date substituted for line items whose date cannot be read.
pub const DEFAULT_FALLBACK_DATE: &str = "2023-01-01";

pub fn default_fallback_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

/// Parse a ledger date string. Patterns are tried in order and the first that parses wins:
/// - "2023-04-01 00:00:00" (midnight timestamp as written by spreadsheet exports)
/// - "2023/04/01 - 2023/04/03" (range, start bound taken)
/// - "2023/04/01"
/// - "2023-04-01"
pub fn parse_ledger_date(input: &str) -> Option<NaiveDate> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        // Only date cells rendered at midnight carry a usable day
        return (dt.time() == NaiveTime::default()).then_some(dt.date());
    }

    if s.contains('/') && s.contains('-') {
        let start = s.split(" - ").next().unwrap_or(s).trim();
        if let Ok(d) = NaiveDate::parse_from_str(start, "%Y/%m/%d") {
            return Some(d);
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y/%m/%d") {
        return Some(d);
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Excel serial date conversion using the 1899-12-30 base.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 || serial > 2_958_465.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    base.checked_add_signed(Duration::days(serial.floor() as i64))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_midnight_timestamp() {
        assert_eq!(parse_ledger_date("2023-05-20 00:00:00"), Some(ymd(2023, 5, 20)));
    }

    #[test]
    fn test_timestamp_with_time_of_day_is_unreadable() {
        assert_eq!(parse_ledger_date("2023-04-01 12:30:00"), None);
        assert_eq!(parse_ledger_date("2023-04-01 00:00:01"), None);
    }

    #[test]
    fn test_range_takes_start_bound() {
        assert_eq!(
            parse_ledger_date("2023/04/01 - 2023/04/03"),
            Some(ymd(2023, 4, 1))
        );
    }

    #[test]
    fn test_slash_and_iso_dates() {
        assert_eq!(parse_ledger_date("2023/12/31"), Some(ymd(2023, 12, 31)));
        assert_eq!(parse_ledger_date(" 2023/1/5 "), Some(ymd(2023, 1, 5)));
        assert_eq!(parse_ledger_date("2023-07-07"), Some(ymd(2023, 7, 7)));
    }

    #[test]
    fn test_unparseable_dates() {
        assert_eq!(parse_ledger_date("N/A"), None);
        assert_eq!(parse_ledger_date(""), None);
        assert_eq!(parse_ledger_date("令和5年4月1日"), None);
        assert_eq!(parse_ledger_date("2023/02/30"), None);
    }

    #[test]
    fn test_excel_serial() {
        assert_eq!(excel_serial_to_date(45017.0), Some(ymd(2023, 4, 1)));
        assert_eq!(excel_serial_to_date(45017.75), Some(ymd(2023, 4, 1)));
        assert_eq!(excel_serial_to_date(f64::NAN), None);
        assert_eq!(excel_serial_to_date(-1.0), None);
    }

    #[test]
    fn test_default_fallback_date_matches_constant() {
        assert_eq!(default_fallback_date().to_string(), DEFAULT_FALLBACK_DATE);
    }
}
