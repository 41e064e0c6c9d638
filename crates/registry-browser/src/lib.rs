//! Headless browser tabs for JavaScript-rendered registry pages.
//!
//! A [`BrowserEngine`] owns one Chrome instance and hands out at most
//! `max_tabs` [`BrowserTab`]s at a time. Each tab holds a semaphore permit
//! until it is dropped, so DOM-driven concurrency can never outgrow the
//! tabs the engine was sized for.

pub mod actions;
pub mod engine;
pub mod error;
pub mod fingerprint;

pub use actions::{BrowserActions, SessionCookie};
pub use engine::{BrowserEngine, BrowserTab};
pub use error::{BrowserError, Result};
pub use fingerprint::FingerprintConfig;
