//! Registry crawler command-line entry point.
//!
//! Loads the TOML configuration (plus `REGISTRY_*` environment overrides),
//! applies command-line overrides, and runs one crawl.

use anyhow::{Context, Result};
use clap::Parser;
use registry_core::{AppConfig, CrawlMode, LoginMode};
use registry_scanner::Crawler;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "registry-crawler")]
#[command(version)]
#[command(about = "Crawl company records from the business registry platform")]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, env = "REGISTRY_CONFIG")]
    config: Option<PathBuf>,

    /// Crawl mode: search, detail or related
    #[arg(long)]
    mode: Option<CrawlMode>,

    /// Comma-separated search keywords
    #[arg(long, value_delimiter = ',')]
    keywords: Vec<String>,

    /// Comma-separated company ids or detail-page URLs
    #[arg(long, value_delimiter = ',')]
    company_ids: Vec<String>,

    /// Login mode when the stored session is not valid
    #[arg(long)]
    login_mode: Option<LoginMode>,

    /// Maximum records per keyword
    #[arg(long)]
    max_records: Option<u32>,

    /// Concurrent detail fetches
    #[arg(long)]
    concurrency: Option<usize>,

    /// Also fetch shareholders, legal cases and IP for each company
    #[arg(long)]
    sub_entities: bool,
}

impl Cli {
    fn load_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let mut config = AppConfig::load_from(path)
                    .with_context(|| format!("loading {}", path.display()))?;
                config.apply_env(|key| std::env::var(key).ok())?;
                config
            }
            None => AppConfig::load_with_env().context("loading configuration")?,
        };

        if let Some(mode) = self.mode {
            config.crawl.mode = mode;
        }
        if !self.keywords.is_empty() {
            config.crawl.keywords.clone_from(&self.keywords);
        }
        if !self.company_ids.is_empty() {
            config.crawl.company_ids.clone_from(&self.company_ids);
        }
        if let Some(mode) = self.login_mode {
            config.login.mode = mode;
        }
        if let Some(max_records) = self.max_records {
            config.crawl.max_records = max_records;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawl.max_concurrency = concurrency;
        }
        if self.sub_entities {
            config.crawl.fetch_sub_entities = true;
        }
        Ok(config)
    }
}

/// Initialize tracing subscriber for logging
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,registry=debug"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    info!("Starting registry crawler v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = cli.load_config()?;
    let crawler = Crawler::new(config).context("invalid configuration")?;

    let report = crawler.start().await?;
    report.log_summary();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_lists_and_modes() {
        let cli = Cli::parse_from([
            "registry-crawler",
            "--mode",
            "detail",
            "--company-ids",
            "123,https://aiqicha.baidu.com/company_detail_456",
            "--login-mode",
            "cookie",
            "--concurrency",
            "2",
            "--sub-entities",
        ]);

        assert_eq!(cli.mode, Some(CrawlMode::Detail));
        assert_eq!(cli.company_ids.len(), 2);
        assert_eq!(cli.login_mode, Some(LoginMode::Cookie));
        assert_eq!(cli.concurrency, Some(2));
        assert!(cli.sub_entities);
        assert!(cli.keywords.is_empty());
    }

    #[test]
    fn test_rejects_unknown_mode() {
        assert!(Cli::try_parse_from(["registry-crawler", "--mode", "spider"]).is_err());
    }
}
