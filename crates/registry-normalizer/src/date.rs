//! Calendar dates in the three formats the platform uses.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static DATE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        r"(\d{4})-(\d{1,2})-(\d{1,2})",
        r"(\d{4})年(\d{1,2})月(\d{1,2})日",
        r"(\d{4})/(\d{1,2})/(\d{1,2})",
    ]
    .map(|p| Regex::new(p).expect("Date regex is hardcoded and valid"))
});

/// Parse `YYYY-M-D`, `YYYY年M月D日` or `YYYY/M/D` into a calendar date.
///
/// The first pattern that matches wins; a match that is not a real day
/// (e.g. `2023-02-30`) yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let captures = DATE_PATTERNS.iter().find_map(|p| p.captures(raw))?;
    let year = captures[1].parse().ok()?;
    let month = captures[2].parse().ok()?;
    let day = captures[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Canonical zero-padded `YYYY-MM-DD`.
pub fn normalize_date(raw: &str) -> Option<String> {
    parse_date(raw).map(|d| d.format("%Y-%m-%d").to_string())
}
