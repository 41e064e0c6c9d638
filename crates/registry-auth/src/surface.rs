use async_trait::async_trait;
use registry_browser::{BrowserActions, BrowserTab, Result, SessionCookie};

/// The page a login flow drives.
///
/// [`BrowserTab`] is the production surface; anything that can navigate,
/// probe selectors and exchange cookies can stand in for it.
#[async_trait]
pub trait LoginSurface: Send + Sync {
    /// Navigate to `url`.
    async fn navigate(&self, url: &str) -> Result<()>;
    /// URL after redirects.
    async fn current_url(&self) -> Result<Option<String>>;
    /// Whether `selector` matches an element right now.
    async fn has_element(&self, selector: &str) -> Result<bool>;
    /// Click the first element matching `selector`.
    async fn click(&self, selector: &str) -> Result<()>;
    /// Type `value` into the field matching `selector`.
    async fn fill(&self, selector: &str, value: &str) -> Result<()>;
    /// Install cookies.
    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()>;
    /// Cookies currently held.
    async fn cookies(&self) -> Result<Vec<SessionCookie>>;
}

#[async_trait]
impl LoginSurface for BrowserTab {
    async fn navigate(&self, url: &str) -> Result<()> {
        BrowserActions::navigate(self, url).await
    }

    async fn current_url(&self) -> Result<Option<String>> {
        BrowserActions::current_url(self).await
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        BrowserActions::has_element(self, selector).await
    }

    async fn click(&self, selector: &str) -> Result<()> {
        BrowserActions::click(self, selector).await
    }

    async fn fill(&self, selector: &str, value: &str) -> Result<()> {
        self.fill_field(selector, value).await
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        BrowserActions::set_cookies(self, cookies).await
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        BrowserActions::cookies(self).await
    }
}
