use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A cookie as the login flow and the HTTP client see it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionCookie {
    pub name: String,
    pub value: String,
    pub domain: Option<String>,
    pub path: Option<String>,
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
        }
    }

    /// Scope the cookie to `domain` and `path`.
    #[must_use]
    pub fn scoped(mut self, domain: impl Into<String>, path: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self.path = Some(path.into());
        self
    }
}

/// Page-level operations a tab supports.
#[async_trait::async_trait]
pub trait BrowserActions {
    /// Navigate to a URL
    async fn navigate(&self, url: &str) -> Result<()>;

    /// URL after redirects
    async fn current_url(&self) -> Result<Option<String>>;

    /// Fill a form field by selector
    async fn fill_field(&self, selector: &str, value: &str) -> Result<()>;

    /// Click an element by selector
    async fn click(&self, selector: &str) -> Result<()>;

    /// Whether an element matching `selector` exists right now
    async fn has_element(&self, selector: &str) -> Result<bool>;

    /// Wait for a selector to appear
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()>;

    /// Serialized HTML of the current document
    async fn content(&self) -> Result<String>;

    /// Install cookies into the tab's browser context
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()>;

    /// Cookies visible to the current page
    async fn cookies(&self) -> Result<Vec<SessionCookie>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_cookie() {
        let cookie = SessionCookie::new("BDUSS", "abc").scoped(".aiqicha.baidu.com", "/");
        assert_eq!(cookie.domain.as_deref(), Some(".aiqicha.baidu.com"));
        assert_eq!(cookie.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_new_cookie_is_unscoped() {
        let cookie = SessionCookie::new("STOKEN", "x");
        assert_eq!(cookie.domain, None);
        assert_eq!(cookie.path, None);
    }
}
