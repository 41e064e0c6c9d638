use crate::actions::{BrowserActions, SessionCookie};
use crate::error::{BrowserError, Result};
use crate::fingerprint::FingerprintConfig;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromeConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetTimezoneOverrideParams;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, SetUserAgentOverrideParams};
use chromiumoxide::Page;
use futures::StreamExt;
use registry_core::BrowserConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// One Chrome process shared by a bounded number of tabs.
pub struct BrowserEngine {
    browser: Browser,
    handler: JoinHandle<()>,
    tabs: Arc<Semaphore>,
    fingerprint: FingerprintConfig,
    navigation_timeout: Duration,
    render_timeout: Duration,
}

impl BrowserEngine {
    /// Launch Chrome with a randomized fingerprint.
    pub async fn new(config: &BrowserConfig) -> Result<Self> {
        Self::with_fingerprint(config, FingerprintConfig::randomized()).await
    }

    /// Launch Chrome presenting `fingerprint` on every tab.
    pub async fn with_fingerprint(
        config: &BrowserConfig,
        fingerprint: FingerprintConfig,
    ) -> Result<Self> {
        let mut builder = ChromeConfig::builder()
            .no_sandbox()
            .window_size(fingerprint.viewport_width, fingerprint.viewport_height)
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--lang={}", fingerprint.locale));
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &config.chrome_path {
            builder = builder.chrome_executable(path);
        }
        let chrome_config = builder.build().map_err(BrowserError::ChromiumError)?;

        let (browser, mut handler) = Browser::launch(chrome_config).await?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!("browser handler event error: {}", e);
                }
            }
        });

        tracing::info!(
            headless = config.headless,
            max_tabs = config.max_tabs,
            "Browser launched"
        );

        Ok(Self {
            browser,
            handler,
            tabs: Arc::new(Semaphore::new(config.max_tabs.max(1))),
            fingerprint,
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            render_timeout: Duration::from_secs(config.render_timeout_secs),
        })
    }

    /// Open a tab, waiting for a free slot when `max_tabs` are in use.
    pub async fn new_tab(&self) -> Result<BrowserTab> {
        let permit = self
            .tabs
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::PoolClosed)?;
        let page = self.browser.new_page("about:blank").await?;

        let mut user_agent = SetUserAgentOverrideParams::new(self.fingerprint.user_agent.clone());
        user_agent.accept_language = Some(self.fingerprint.locale.clone());
        page.execute(user_agent).await?;
        page.execute(SetTimezoneOverrideParams::new(self.fingerprint.timezone.clone()))
            .await?;

        Ok(BrowserTab {
            page,
            navigation_timeout: self.navigation_timeout,
            _permit: permit,
        })
    }

    /// How long DOM consumers should wait for rendered content.
    pub fn render_timeout(&self) -> Duration {
        self.render_timeout
    }

    /// Tabs that can still be opened without waiting.
    pub fn available_tabs(&self) -> usize {
        self.tabs.available_permits()
    }

    /// Shut the browser down.
    pub async fn close(mut self) -> Result<()> {
        self.tabs.close();
        self.browser.close().await?;
        self.handler.abort();
        tracing::info!("Browser closed");
        Ok(())
    }
}

/// A browser tab; its slot is returned to the engine when dropped.
pub struct BrowserTab {
    page: Page,
    navigation_timeout: Duration,
    _permit: OwnedSemaphorePermit,
}

impl BrowserTab {
    /// Close the tab and release its slot.
    pub async fn close(self) -> Result<()> {
        self.page.close().await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl BrowserActions for BrowserTab {
    async fn navigate(&self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.navigation_timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(BrowserError::NavigationError(format!("{url}: {e}"))),
            Err(_) => Err(BrowserError::Timeout(format!(
                "navigation to {url} after {}s",
                self.navigation_timeout.as_secs()
            ))),
        }
    }

    async fn current_url(&self) -> Result<Option<String>> {
        Ok(self.page.url().await?)
    }

    async fn fill_field(&self, selector: &str, value: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?.type_str(value).await?;
        Ok(())
    }

    async fn click(&self, selector: &str) -> Result<()> {
        let element = self
            .page
            .find_element(selector)
            .await
            .map_err(|_| BrowserError::SelectorNotFound(selector.to_string()))?;
        element.click().await?;
        Ok(())
    }

    async fn has_element(&self, selector: &str) -> Result<bool> {
        Ok(self.page.find_element(selector).await.is_ok())
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<()> {
        let started = Instant::now();
        loop {
            if self.has_element(selector).await? {
                return Ok(());
            }
            if started.elapsed() >= timeout {
                return Err(BrowserError::Timeout(format!(
                    "{selector} after {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn content(&self) -> Result<String> {
        Ok(self.page.content().await?)
    }

    async fn set_cookies(&self, cookies: &[SessionCookie]) -> Result<()> {
        let current = self.current_url().await?;
        let params = cookies
            .iter()
            .map(|cookie| to_cookie_param(cookie, current.as_deref()))
            .collect::<Result<Vec<_>>>()?;
        self.page.set_cookies(params).await?;
        Ok(())
    }

    async fn cookies(&self) -> Result<Vec<SessionCookie>> {
        let cookies = self.page.get_cookies().await?;
        Ok(cookies
            .into_iter()
            .map(|c| SessionCookie {
                name: c.name,
                value: c.value,
                domain: Some(c.domain),
                path: Some(c.path),
            })
            .collect())
    }
}

fn to_cookie_param(cookie: &SessionCookie, page_url: Option<&str>) -> Result<CookieParam> {
    let mut builder = CookieParam::builder()
        .name(cookie.name.clone())
        .value(cookie.value.clone());
    match (&cookie.domain, page_url) {
        (Some(domain), _) => {
            builder = builder
                .domain(domain.clone())
                .path(cookie.path.clone().unwrap_or_else(|| "/".to_string()));
        }
        (None, Some(url)) if url.starts_with("http") => {
            builder = builder.url(url.to_string());
        }
        (None, _) => {
            return Err(BrowserError::InvalidCookie {
                name: cookie.name.clone(),
                reason: "no domain and no page URL to scope it to".to_string(),
            });
        }
    }
    builder.build().map_err(|reason| BrowserError::InvalidCookie {
        name: cookie.name.clone(),
        reason,
    })
}
