//! Registry Core - Foundation crate for the registry crawler.
//!
//! This crate provides the shared vocabulary every other crate depends on:
//! typed identifiers and enums, the nine crawled record kinds, TOML-based
//! configuration, and the central error types.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths and env overrides
//! - [`types`] - Shared newtypes and enums (`CompanyId`, `EntityKind`, `CrawlMode`, ...)
//! - [`records`] - `CrawlRecord`, the tagged union over all crawled entity kinds
//!
//! # Example
//!
//! ```rust
//! use registry_core::{AppConfig, CrawlMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.crawl.mode, CrawlMode::Search);
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
#[allow(missing_docs)]
pub mod records;
pub mod types;

// Re-export commonly used types
pub use config::{
    AppConfig, BrowserConfig, ClientConfig, CrawlConfig, LoginConfig, StorageConfig,
};
pub use error::{ConfigError, ConfigResult, CoreError, Result};
pub use records::{
    AnnualReport, BiddingRecord, Branch, ChangeRecord, CompanyRecord, CrawlRecord,
    IntellectualProperty, LegalCase, RelatedCompany, Shareholder, stamp_platform_fields,
};
pub use types::{
    CompanyId, CompanyStatus, CrawlMode, DetailSourceKind, EntityKind, LoginMode, SearchFilter,
    SearchFilters, SearchSort, PLATFORM,
};
