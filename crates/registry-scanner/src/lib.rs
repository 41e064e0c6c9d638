//! Registry Scanner - crawl orchestration.
//!
//! Ties the platform client, the normalizer and the record store together:
//!
//! - Keyword search with sequential pagination bounded by a record budget
//! - Concurrent detail fetches limited by a counting semaphore
//! - Optional shareholder, litigation and IP sub-entity fetches
//! - One-hop related-company crawls
//! - Session bootstrap that falls back to an interactive browser login
//!
//! # Example
//!
//! ```rust,ignore
//! use registry_core::AppConfig;
//! use registry_scanner::Crawler;
//!
//! let crawler = Crawler::new(AppConfig::load_with_env()?)?;
//! let report = crawler.start().await?;
//! report.log_summary();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod crawler;
#[allow(missing_docs)]
pub mod error;
pub mod orchestrator;
pub mod report;

pub use crawler::Crawler;
pub use error::{Result, ScanError};
pub use orchestrator::CrawlOrchestrator;
pub use report::{BatchOutcome, CrawlReport, KeywordOutcome, StopReason};
