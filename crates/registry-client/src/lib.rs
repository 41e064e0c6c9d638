//! Registry Client
//!
//! Authenticated access to the registry platform: keyword search, company
//! detail (JSON endpoint, rendered page, or both merged) and the sub-entity
//! lists hanging off a company.
//!
//! All traffic goes through one [`transport::Transport`] per session, which
//! attaches the session cookie, waits a random jitter before every request
//! and retries transient failures with linear backoff.
//!
//! # Example
//!
//! ```rust,no_run
//! use registry_client::{PlatformApi, PlatformClient, SearchQuery};
//! use registry_core::ClientConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = PlatformClient::connect(ClientConfig::default(), None, None)?;
//! let page = client.search_company(&SearchQuery::new("科技", 1, 20)).await?;
//! for item in page.items {
//!     let company = client.get_company_detail(&item.id).await?;
//!     println!("{:?}", company.company_name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod detail;
pub mod dom;
pub mod envelope;
pub mod error;
pub mod jitter;
pub mod models;
pub mod transport;

pub use api::{PlatformApi, PlatformClient};
pub use detail::{detail_page_url, ApiDetailSource, DetailSource, DomDetailSource, MergedDetailSource};
pub use dom::{is_captcha_page, DomCompanyFields, PageRenderer, RenderedPage};
pub use error::{ClientError, Result};
pub use jitter::Jitter;
pub use models::{SearchItem, SearchPage, SearchQuery};
pub use transport::{RetryPolicy, Transport};
