// Utility helpers for cell access and `YYYY-MM` period handling.
//
// Sheet cells are positional and frequently missing at the end of a row, so
// every lookup goes through `cell` and never panics.
use chrono::{Datelike, Months, NaiveDate};
use num_format::{Locale, ToFormattedString};

pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Trimmed cell at `idx`, or an empty string when the row is too short.
pub fn cell(row: &[String], idx: usize) -> String {
    row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
}

/// Parse a zero-padded `YYYY-MM` period into the first day of that month.
///
/// Rejects anything that is not exactly seven characters with a dash at
/// position four, so `2024-1` or `2024-01-15` do not slip through.
pub fn parse_period(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.len() != 7 || s.as_bytes()[4] != b'-' {
        return None;
    }
    NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok()
}

pub fn format_period(d: NaiveDate) -> String {
    d.format("%Y-%m").to_string()
}

pub fn period_of(year: i32, month: u32) -> Option<String> {
    NaiveDate::from_ymd_opt(year, month, 1).map(format_period)
}

/// Every month from `start` to `end` inclusive, as `YYYY-MM` strings.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = start;
    while cur <= end {
        out.push(format_period(cur));
        match cur.checked_add_months(Months::new(1)) {
            Some(next) => cur = next,
            None => break,
        }
    }
    out
}

/// Zero-based month slot (January = 0) of a period string.
pub fn month_index(period: &str) -> Option<usize> {
    parse_period(period).map(|d| d.month0() as usize)
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_is_forgiving_about_short_rows() {
        let row = vec![" a ".to_string(), "b".to_string()];
        assert_eq!(cell(&row, 0), "a");
        assert_eq!(cell(&row, 5), "");
    }

    #[test]
    fn parse_period_requires_zero_padding() {
        assert_eq!(parse_period("2024-03"), NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(parse_period("2024-3"), None);
        assert_eq!(parse_period("2024-13"), None);
        assert_eq!(parse_period("2024-03-01"), None);
        assert_eq!(parse_period("March"), None);
    }

    #[test]
    fn months_between_crosses_year_boundary() {
        let start = parse_period("2023-11").unwrap();
        let end = parse_period("2024-02").unwrap();
        assert_eq!(months_between(start, end), vec!["2023-11", "2023-12", "2024-01", "2024-02"]);
        assert!(months_between(end, start).is_empty());
    }

    #[test]
    fn month_index_is_zero_based() {
        assert_eq!(month_index("2024-01"), Some(0));
        assert_eq!(month_index("2023-12"), Some(11));
        assert_eq!(month_index("bogus"), None);
    }

    #[test]
    fn format_int_groups_thousands() {
        assert_eq!(format_int(9855usize), "9,855");
    }
}
