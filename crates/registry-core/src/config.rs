//! Configuration management for the registry crawler.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{CrawlMode, DetailSourceKind, LoginMode, SearchFilter, SearchFilters, SearchSort};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration.
///
/// This is loaded from `~/.config/registry-crawler/config.toml` (or platform
/// equivalent). If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// What to crawl and how wide
    pub crawl: CrawlConfig,
    /// Platform client settings
    pub client: ClientConfig,
    /// Login settings
    pub login: LoginConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Output settings
    pub storage: StorageConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults
    /// if the file does not exist.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an explicit file. The file must exist.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        tracing::debug!("Loading config from {}", path.display());
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// See [`AppConfig::apply_env`] for the recognised variables.
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Apply `REGISTRY_*` overrides using `lookup` to read variables.
    ///
    /// Supported variables:
    /// - `REGISTRY_MODE`: crawl mode (`search`, `detail`, `related`)
    /// - `REGISTRY_KEYWORDS`: comma-separated keywords
    /// - `REGISTRY_COMPANY_IDS`: comma-separated ids or detail URLs
    /// - `REGISTRY_MAX_CONCURRENCY`: worker pool size
    /// - `REGISTRY_MAX_RECORDS`: per-keyword record budget
    /// - `REGISTRY_LOGIN_MODE`: `qrcode`, `phone` or `cookie`
    /// - `REGISTRY_COOKIE`: cookie string for cookie login
    /// - `REGISTRY_PROXY`: proxy URL for the platform client
    /// - `REGISTRY_HEADLESS`: browser headless mode (true/false)
    /// - `REGISTRY_OUTPUT_DIR`: file sink directory
    /// - `REGISTRY_DATABASE_PATH`: SQLite database file
    ///
    /// Values that fail to parse are rejected rather than ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn invalid(field: &str, value: &str) -> ConfigError {
            ConfigError::InvalidValue {
                field: field.to_string(),
                reason: format!("cannot parse '{value}'"),
            }
        }

        if let Some(val) = lookup("REGISTRY_MODE") {
            self.crawl.mode = val.parse().map_err(|_| invalid("REGISTRY_MODE", &val))?;
            tracing::debug!("Override crawl.mode from env: {:?}", self.crawl.mode);
        }

        if let Some(val) = lookup("REGISTRY_KEYWORDS") {
            self.crawl.keywords = split_list(&val);
            tracing::debug!("Override crawl.keywords from env: {} keywords", self.crawl.keywords.len());
        }

        if let Some(val) = lookup("REGISTRY_COMPANY_IDS") {
            self.crawl.company_ids = split_list(&val);
            tracing::debug!(
                "Override crawl.company_ids from env: {} ids",
                self.crawl.company_ids.len()
            );
        }

        if let Some(val) = lookup("REGISTRY_MAX_CONCURRENCY") {
            self.crawl.max_concurrency = val
                .trim()
                .parse()
                .map_err(|_| invalid("REGISTRY_MAX_CONCURRENCY", &val))?;
            tracing::debug!("Override crawl.max_concurrency from env: {}", self.crawl.max_concurrency);
        }

        if let Some(val) = lookup("REGISTRY_MAX_RECORDS") {
            self.crawl.max_records = val
                .trim()
                .parse()
                .map_err(|_| invalid("REGISTRY_MAX_RECORDS", &val))?;
            tracing::debug!("Override crawl.max_records from env: {}", self.crawl.max_records);
        }

        if let Some(val) = lookup("REGISTRY_LOGIN_MODE") {
            self.login.mode = val.parse().map_err(|_| invalid("REGISTRY_LOGIN_MODE", &val))?;
            tracing::debug!("Override login.mode from env: {}", self.login.mode);
        }

        if let Some(val) = lookup("REGISTRY_COOKIE") {
            self.login.cookie = Some(val);
            tracing::debug!("Override login.cookie from env");
        }

        if let Some(val) = lookup("REGISTRY_PROXY") {
            self.client.proxy = Some(val).filter(|v| !v.trim().is_empty());
            tracing::debug!("Override client.proxy from env");
        }

        if let Some(val) = lookup("REGISTRY_HEADLESS") {
            self.browser.headless = val
                .trim()
                .parse()
                .map_err(|_| invalid("REGISTRY_HEADLESS", &val))?;
            tracing::debug!("Override browser.headless from env: {}", self.browser.headless);
        }

        if let Some(val) = lookup("REGISTRY_OUTPUT_DIR") {
            self.storage.output_dir = PathBuf::from(val);
            tracing::debug!("Override storage.output_dir from env: {}", self.storage.output_dir.display());
        }

        if let Some(val) = lookup("REGISTRY_DATABASE_PATH") {
            self.storage.database_path = PathBuf::from(val);
            tracing::debug!(
                "Override storage.database_path from env: {}",
                self.storage.database_path.display()
            );
        }

        Ok(())
    }

    /// Reject settings the crawler cannot run with.
    pub fn validate(&self) -> ConfigResult<()> {
        self.crawl.validate()?;
        self.client.validate()?;

        if self.client.detail_source.uses_browser()
            && self.crawl.max_concurrency > self.browser.max_tabs
        {
            return Err(ConfigError::InvalidValue {
                field: "crawl.max_concurrency".to_string(),
                reason: format!(
                    "{} workers need {} browser tabs but browser.max_tabs is {}",
                    self.crawl.max_concurrency, self.crawl.max_concurrency, self.browser.max_tabs
                ),
            });
        }

        if self.storage.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "storage.batch_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if self.login.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "login.poll_interval_ms".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/registry-crawler/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        Ok(project_dirs()?.config_dir().join("config.toml"))
    }
}

fn project_dirs() -> ConfigResult<ProjectDirs> {
    ProjectDirs::from("com", "registry-crawler", "registry-crawler").ok_or(ConfigError::NoConfigDir)
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Crawl scope and concurrency.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Crawl mode
    pub mode: CrawlMode,
    /// Search keywords (search mode)
    pub keywords: Vec<String>,
    /// Company ids or detail-page URLs (detail and related modes)
    pub company_ids: Vec<String>,
    /// First search page, 1-based
    pub start_page: u32,
    /// Items requested per search page
    pub page_size: u32,
    /// Per-keyword record budget, rounded up to a whole page
    pub max_records: u32,
    /// Detail fetches in flight at once
    pub max_concurrency: usize,
    /// Also fetch shareholders, legal cases and IP for each company
    pub fetch_sub_entities: bool,
    /// Search ordering
    pub sort: SearchSort,
    /// Field the keyword is matched against
    pub filter: SearchFilter,
    /// Optional narrowing parameters
    pub filters: SearchFilters,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            mode: CrawlMode::Search,
            keywords: Vec::new(),
            company_ids: Vec::new(),
            start_page: 1,
            page_size: 20,
            max_records: 20,
            max_concurrency: 4,
            fetch_sub_entities: false,
            sort: SearchSort::Relevance,
            filter: SearchFilter::All,
            filters: SearchFilters::default(),
        }
    }
}

impl CrawlConfig {
    /// Reject a zero-sized pool or page.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "crawl.max_concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "crawl.page_size".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.start_page == 0 {
            return Err(ConfigError::InvalidValue {
                field: "crawl.start_page".to_string(),
                reason: "pages are 1-based".to_string(),
            });
        }
        Ok(())
    }

    /// Record budget rounded up to at least one whole page.
    #[must_use]
    pub fn record_budget(&self) -> u32 {
        self.max_records.max(self.page_size)
    }
}

/// Platform client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Platform origin
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Lower bound of the pre-request delay
    pub jitter_min_ms: u64,
    /// Upper bound of the pre-request delay
    pub jitter_max_ms: u64,
    /// Attempts after the first for retryable failures
    pub max_retries: u32,
    /// Base delay for linear retry backoff
    pub retry_delay_ms: u64,
    /// Which backend produces company details
    pub detail_source: DetailSourceKind,
    /// User agent sent with every request
    pub user_agent: String,
    /// Proxy URL from the rotating-proxy provider
    pub proxy: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://aiqicha.baidu.com".to_string(),
            timeout_secs: 10,
            jitter_min_ms: 1000,
            jitter_max_ms: 3000,
            max_retries: 3,
            retry_delay_ms: 2000,
            detail_source: DetailSourceKind::Api,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
            proxy: None,
        }
    }
}

impl ClientConfig {
    /// Reject an inverted jitter range.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.jitter_min_ms > self.jitter_max_ms {
            return Err(ConfigError::InvalidValue {
                field: "client.jitter_min_ms".to_string(),
                reason: format!(
                    "{} is above jitter_max_ms {}",
                    self.jitter_min_ms, self.jitter_max_ms
                ),
            });
        }
        if url::Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                field: "client.base_url".to_string(),
                reason: format!("'{}' is not a URL", self.base_url),
            });
        }
        Ok(())
    }
}

/// Login settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginConfig {
    /// Login mode
    pub mode: LoginMode,
    /// Cookie string for cookie mode
    pub cookie: Option<String>,
    /// Phone number for phone mode
    pub phone: Option<String>,
    /// Wall-clock ceiling for the whole login
    pub timeout_secs: u64,
    /// Interval between login-state probes
    pub poll_interval_ms: u64,
    /// Wall-clock ceiling for a captcha to be cleared
    pub captcha_timeout_secs: u64,
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            mode: LoginMode::Qrcode,
            cookie: None,
            phone: None,
            timeout_secs: 180,
            poll_interval_ms: 2000,
            captcha_timeout_secs: 60,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Tabs open at once; DOM-backed crawls need one per worker
    pub max_tabs: usize,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// Wait for a rendered selector, in seconds
    pub render_timeout_secs: u64,
    /// Chrome executable; auto-detected when absent
    pub chrome_path: Option<PathBuf>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            max_tabs: 4,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            render_timeout_secs: 15,
            chrome_path: None,
        }
    }
}

/// Output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file
    pub database_path: PathBuf,
    /// Directory for `<kind>.json` and `<kind>.csv`
    pub output_dir: PathBuf,
    /// Records buffered before a file flush
    pub batch_size: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("data/aiqicha/registry.db"),
            output_dir: PathBuf::from("data/aiqicha"),
            batch_size: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.crawl.mode, CrawlMode::Search);
        assert_eq!(config.crawl.start_page, 1);
        assert_eq!(config.crawl.page_size, 20);
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.login.timeout_secs, 180);
        assert_eq!(config.login.captcha_timeout_secs, 60);
        assert_eq!(config.storage.batch_size, 100);
        assert!(config.browser.headless);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[crawl]"));
        assert!(toml_str.contains("[client]"));
        assert!(toml_str.contains("[storage]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.client.base_url, config.client.base_url);
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.crawl.keywords = vec!["百度".to_string()];
        config.crawl.max_concurrency = 2;
        fs::write(&config_path, toml::to_string_pretty(&config).expect("serialize"))
            .expect("write config file");

        let loaded = AppConfig::load_from(&config_path).expect("load config");
        assert_eq!(loaded.crawl.keywords, vec!["百度".to_string()]);
        assert_eq!(loaded.crawl.max_concurrency, 2);
    }

    #[test]
    fn test_load_from_missing_file() {
        let tmp = TempDir::new().expect("create temp dir");
        let result = AppConfig::load_from(&tmp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("REGISTRY_MODE", "detail"),
            ("REGISTRY_COMPANY_IDS", "111, 222 ,,https://aiqicha.baidu.com/company_detail_333"),
            ("REGISTRY_MAX_CONCURRENCY", "8"),
            ("REGISTRY_LOGIN_MODE", "cookie"),
            ("REGISTRY_COOKIE", "BDUSS=abc; STOKEN=def"),
            ("REGISTRY_HEADLESS", "false"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_env(|key| vars.get(key).map(ToString::to_string))
            .expect("apply env");

        assert_eq!(config.crawl.mode, CrawlMode::Detail);
        assert_eq!(config.crawl.company_ids.len(), 3);
        assert_eq!(config.crawl.max_concurrency, 8);
        assert_eq!(config.login.mode, LoginMode::Cookie);
        assert_eq!(config.login.cookie.as_deref(), Some("BDUSS=abc; STOKEN=def"));
        assert!(!config.browser.headless);
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let mut config = AppConfig::default();
        let result = config.apply_env(|key| {
            (key == "REGISTRY_MAX_CONCURRENCY").then(|| "many".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[crawl]
mode = "related"
company_ids = ["29453261288626"]

[client]
detail_source = "merged"
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.crawl.mode, CrawlMode::Related);
        assert_eq!(config.client.detail_source, DetailSourceKind::Merged);
        // defaults
        assert_eq!(config.crawl.max_concurrency, 4);
        assert_eq!(config.login.poll_interval_ms, 2000);
    }

    #[test]
    fn test_validation() {
        let mut config = AppConfig::default();
        config.crawl.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.client.jitter_min_ms = 5000;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.client.detail_source = DetailSourceKind::Dom;
        config.crawl.max_concurrency = 8;
        config.browser.max_tabs = 4;
        assert!(config.validate().is_err());

        // API-only crawls are not bounded by tabs
        config.client.detail_source = DetailSourceKind::Api;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_record_budget_rounds_up() {
        let mut crawl = CrawlConfig::default();
        crawl.max_records = 5;
        assert_eq!(crawl.record_budget(), 20);
        crawl.max_records = 45;
        assert_eq!(crawl.record_budget(), 45);
    }
}
