//! Money amounts such as `500万元` or `1,200.5万人民币`.

use once_cell::sync::Lazy;
use regex::Regex;

static NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("Number regex is hardcoded and valid"));

/// Magnitude suffixes, checked in this order.
const MAGNITUDES: [(char, f64); 3] = [('万', 1e4), ('千', 1e3), ('亿', 1e8)];

/// Parse an amount in yuan.
///
/// Thousands separators (`,` and `，`) and whitespace are dropped, the first
/// numeric literal is taken, and the first magnitude suffix found scales it.
/// Returns `None` when there is no numeric literal.
pub fn parse_amount(raw: &str) -> Option<f64> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ',' | '，') && !c.is_whitespace())
        .collect();

    let number: f64 = NUMBER_PATTERN.find(&compact)?.as_str().parse().ok()?;
    let multiplier = MAGNITUDES
        .iter()
        .find(|(suffix, _)| compact.contains(*suffix))
        .map_or(1.0, |(_, m)| *m);

    Some(number * multiplier)
}
