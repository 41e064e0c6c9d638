//! Cookie string helpers.
//!
//! The session credential is a plain `name=value; name=value` string so it
//! can be handed to the HTTP client as a `Cookie` header unchanged.

use registry_browser::SessionCookie;

/// Parse `name=value` pairs separated by `;`, scoping each to `domain` and `/`.
///
/// Pairs without `=` or with an empty name are ignored.
pub fn parse_cookie_string(raw: &str, domain: &str) -> Vec<SessionCookie> {
    raw.split(';')
        .filter_map(|pair| {
            let (name, value) = pair.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(SessionCookie::new(name, value.trim()).scoped(domain, "/"))
        })
        .collect()
}

/// Join cookies as `name=value` pairs separated by `; `.
pub fn serialize_cookies(cookies: &[SessionCookie]) -> String {
    cookies
        .iter()
        .map(|c| format!("{}={}", c.name, c.value))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookie_string() {
        let cookies = parse_cookie_string(" BDUSS=abc ; STOKEN=d=e;junk; =nameless", ".aiqicha.baidu.com");
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "BDUSS");
        assert_eq!(cookies[0].value, "abc");
        assert_eq!(cookies[1].name, "STOKEN");
        assert_eq!(cookies[1].value, "d=e");
        assert_eq!(cookies[1].domain.as_deref(), Some(".aiqicha.baidu.com"));
        assert_eq!(cookies[1].path.as_deref(), Some("/"));
    }

    #[test]
    fn test_parse_empty() {
        assert!(parse_cookie_string("", ".x").is_empty());
        assert!(parse_cookie_string(" ; ;", ".x").is_empty());
    }

    #[test]
    fn test_serialize_cookies() {
        let cookies = vec![SessionCookie::new("a", "1"), SessionCookie::new("b", "2")];
        assert_eq!(serialize_cookies(&cookies), "a=1; b=2");
        assert_eq!(serialize_cookies(&[]), "");
    }

    #[test]
    fn test_parse_then_serialize_normalizes_spacing() {
        let cookies = parse_cookie_string("a=1;b=2", ".x");
        assert_eq!(serialize_cookies(&cookies), "a=1; b=2");
    }
}
