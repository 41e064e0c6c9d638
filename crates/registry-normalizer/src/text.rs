//! Names, codes, ratios and company-id resolution.

use once_cell::sync::Lazy;
use regex::Regex;
use registry_core::CompanyId;

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Whitespace regex is hardcoded and valid"));

static CREDIT_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9A-HJ-NPQRTUWXY]{2}[0-9]{6}[0-9A-HJ-NPQRTUWXY]{10}$")
        .expect("Credit code regex is hardcoded and valid")
});

static DETAIL_PATH_ID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"company_detail_(\w+)").expect("Detail URL regex is hardcoded and valid")
});

static LEADING_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d+(?:\.\d+)?)").expect("Ratio regex is hardcoded and valid")
});

/// Trim, drop `\r` `\n` `\t`, and collapse inner whitespace to single spaces.
pub fn clean_company_name(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '\r' | '\n' | '\t'))
        .collect();
    WHITESPACE.replace_all(&stripped, " ").into_owned()
}

/// Whether `code` has the shape of an 18-character unified social credit code.
pub fn validate_credit_code(code: &str) -> bool {
    CREDIT_CODE.is_match(code)
}

/// Leading numeric literal of a percentage such as `"35.5%"`.
pub fn parse_ratio(raw: &str) -> Option<f64> {
    LEADING_NUMBER.captures(raw)?[1].parse().ok()
}

/// Company id from a detail-page URL.
///
/// Recognises `.../company_detail_<id>` and a `companyId=<id>` query parameter.
pub fn extract_company_id(url: &str) -> Option<CompanyId> {
    if let Some(captures) = DETAIL_PATH_ID.captures(url) {
        return CompanyId::new(&captures[1]).ok();
    }

    let parsed = url::Url::parse(url).ok()?;
    let (_, value) = parsed.query_pairs().find(|(key, _)| key == "companyId")?;
    CompanyId::new(value.into_owned()).ok()
}

/// Resolve a detail-mode input: URLs go through [`extract_company_id`],
/// anything else must already be an id.
pub fn resolve_target(item: &str) -> Option<CompanyId> {
    let item = item.trim();
    if item.starts_with("http") {
        let id = extract_company_id(item);
        if id.is_none() {
            tracing::warn!(url = item, "Could not extract a company id from URL, skipping");
        }
        id
    } else {
        match CompanyId::new(item) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(item, "Skipping invalid company id: {}", e);
                None
            }
        }
    }
}

/// Search session id sent with each search request: epoch milliseconds.
pub fn generate_search_id() -> String {
    chrono::Utc::now().timestamp_millis().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_company_name() {
        assert_eq!(
            clean_company_name("  北京百度网讯\t科技   有限公司\r\n"),
            "北京百度网讯科技 有限公司"
        );
        assert_eq!(clean_company_name(""), "");
    }

    #[test]
    fn test_validate_credit_code() {
        assert!(validate_credit_code("91110000802100433B"));
        assert!(!validate_credit_code("91110000802100433"));
        assert!(!validate_credit_code("9111000080210043IO"));
        assert!(!validate_credit_code(""));
    }

    #[test]
    fn test_parse_ratio() {
        assert_eq!(parse_ratio("35.5%"), Some(35.5));
        assert_eq!(parse_ratio(" 100%"), Some(100.0));
        assert_eq!(parse_ratio("未知"), None);
        assert_eq!(parse_ratio(""), None);
    }

    #[test]
    fn test_extract_company_id() {
        assert_eq!(
            extract_company_id("https://aiqicha.baidu.com/company_detail_29453261288626")
                .unwrap()
                .as_str(),
            "29453261288626"
        );
        assert_eq!(
            extract_company_id("https://aiqicha.baidu.com/detail?companyId=abc_123&tab=1")
                .unwrap()
                .as_str(),
            "abc_123"
        );
        assert!(extract_company_id("https://aiqicha.baidu.com/s?q=百度").is_none());
        assert!(extract_company_id("not a url").is_none());
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target(" 12345 ").unwrap().as_str(), "12345");
        assert_eq!(
            resolve_target("https://aiqicha.baidu.com/company_detail_777")
                .unwrap()
                .as_str(),
            "777"
        );
        assert!(resolve_target("https://aiqicha.baidu.com/").is_none());
        assert!(resolve_target("bad id!").is_none());
    }

    #[test]
    fn test_generate_search_id() {
        let id = generate_search_id();
        assert!(id.len() >= 13);
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }
}
