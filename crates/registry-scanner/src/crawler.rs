//! Crawl bootstrap: storage, browser, session and orchestrator wiring.

use crate::error::Result;
use crate::orchestrator::CrawlOrchestrator;
use crate::report::CrawlReport;
use registry_auth::{AuthSession, Credentials, LoginSettings};
use registry_browser::{BrowserEngine, FingerprintConfig};
use registry_client::{PageRenderer, PlatformApi, PlatformClient};
use registry_core::AppConfig;
use registry_store::{RecordSink, RecordStore};
use std::sync::Arc;

/// Owns a validated configuration and runs crawls with it.
pub struct Crawler {
    config: AppConfig,
}

impl Crawler {
    /// Validate `config` and wrap it.
    pub fn new(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The configuration this crawler runs with.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run one crawl end to end.
    ///
    /// The store is always closed, so buffered records reach disk even when
    /// login or the browser fails part way.
    pub async fn start(&self) -> Result<CrawlReport> {
        let store = Arc::new(RecordStore::open(&self.config.storage).await?);
        let sink: Arc<dyn RecordSink> = store.clone();

        let outcome = self.crawl(sink).await;
        let closed = store.close().await;

        let report = outcome?;
        closed?;
        Ok(report)
    }

    async fn crawl(&self, sink: Arc<dyn RecordSink>) -> Result<CrawlReport> {
        let mut browser = if self.config.client.detail_source.uses_browser() {
            Some(Arc::new(self.launch_browser().await?))
        } else {
            None
        };

        let outcome = match self.session_client(&mut browser).await {
            Ok(client) => {
                let api: Arc<dyn PlatformApi> = Arc::new(client);
                Ok(CrawlOrchestrator::new(api, sink, self.config.crawl.clone())
                    .run()
                    .await)
            }
            Err(e) => Err(e),
        };

        if let Some(engine) = browser {
            shutdown_browser(engine).await;
        }
        outcome
    }

    /// Chrome presenting the same user agent as the HTTP client, so cookies
    /// captured during login stay valid for API requests.
    async fn launch_browser(&self) -> Result<BrowserEngine> {
        let fingerprint = FingerprintConfig::fixed(
            self.config.client.user_agent.clone(),
            self.config.browser.window_width,
            self.config.browser.window_height,
        );
        Ok(BrowserEngine::with_fingerprint(&self.config.browser, fingerprint).await?)
    }

    /// A client whose session passes the home-page probe, logging in through
    /// a browser tab when the configured cookie is missing or stale.
    async fn session_client(
        &self,
        browser: &mut Option<Arc<BrowserEngine>>,
    ) -> Result<PlatformClient> {
        let credentials = Credentials::from_config(&self.config.login);
        let renderer = browser
            .clone()
            .map(|engine| engine as Arc<dyn PageRenderer>);
        let client = PlatformClient::connect(
            self.config.client.clone(),
            credentials.cookie.as_ref(),
            renderer,
        )?;

        if client.pong().await {
            tracing::info!("Existing session is valid");
            return Ok(client);
        }

        tracing::info!(mode = %self.config.login.mode, "Session not authenticated, logging in");
        let engine = match browser {
            Some(engine) => Arc::clone(engine),
            None => {
                let engine = Arc::new(self.launch_browser().await?);
                *browser = Some(Arc::clone(&engine));
                engine
            }
        };

        let settings = LoginSettings::new(&self.config.client.base_url, &self.config.login)?;
        let mut session = AuthSession::new(engine.new_tab().await?, settings);
        let login = session.begin(self.config.login.mode, &credentials).await;
        if let Err(e) = session.into_surface().close().await {
            tracing::debug!("Failed to close login tab: {}", e);
        }

        let credential = login?;
        tracing::info!("Login complete");
        Ok(client.with_credential(&credential)?)
    }
}

async fn shutdown_browser(engine: Arc<BrowserEngine>) {
    match Arc::try_unwrap(engine) {
        Ok(engine) => {
            if let Err(e) = engine.close().await {
                tracing::warn!("Failed to close browser: {}", e);
            }
        }
        Err(_) => tracing::debug!("Browser still referenced, leaving it to drop"),
    }
}
