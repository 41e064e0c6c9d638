//! Company detail backends.
//!
//! The JSON endpoint is cheap but sometimes thin; the rendered page is
//! slow but carries fields the endpoint omits. [`MergedDetailSource`] runs
//! both and lets the page fill in what it found.

use crate::dom::{is_captcha_page, DomCompanyFields, PageRenderer, DETAIL_READY_SELECTOR};
use crate::error::{ClientError, Result};
use crate::jitter::Jitter;
use crate::transport::Transport;
use async_trait::async_trait;
use registry_browser::SessionCookie;
use registry_core::{CompanyId, CompanyRecord, CrawlRecord, DetailSourceKind, EntityKind};
use serde_json::Value;
use std::sync::Arc;

pub(crate) const DETAIL_PATH: &str = "/api/company/detail";

/// Public page of a company on the platform.
pub fn detail_page_url(base_url: &str, id: &CompanyId) -> String {
    format!("{}/company_detail_{id}", base_url.trim_end_matches('/'))
}

pub(crate) fn crawl_time_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Produces the profile of one company.
#[async_trait]
pub trait DetailSource: Send + Sync {
    async fn fetch_detail(&self, id: &CompanyId) -> Result<CompanyRecord>;

    fn kind(&self) -> DetailSourceKind;
}

/// Detail from the JSON endpoint.
pub struct ApiDetailSource {
    transport: Arc<Transport>,
}

impl ApiDetailSource {
    pub fn new(transport: Arc<Transport>) -> Self {
        Self { transport }
    }
}

#[async_trait]
impl DetailSource for ApiDetailSource {
    async fn fetch_detail(&self, id: &CompanyId) -> Result<CompanyRecord> {
        let data = self
            .transport
            .get_json(DETAIL_PATH, &[("id", id.to_string())])
            .await?;

        let object = match data {
            Value::Object(object) => object,
            Value::Null => return Err(ClientError::CompanyNotFound(id.to_string())),
            other => {
                return Err(ClientError::DataFetch(format!(
                    "detail of {id} is not an object: {other}"
                )))
            }
        };

        let record = CrawlRecord::from_platform_json(EntityKind::Company, id, object, crawl_time_now())
            .map_err(|e| ClientError::DataFetch(format!("detail of {id}: {e}")))?;
        let CrawlRecord::Company(mut company) = record else {
            return Err(ClientError::DataFetch(format!("detail of {id} decoded to another kind")));
        };
        // The endpoint sometimes echoes a different id format; the requested one wins.
        company.company_id = id.clone();
        company.source_url = Some(detail_page_url(self.transport.base_url(), id));
        Ok(company)
    }

    fn kind(&self) -> DetailSourceKind {
        DetailSourceKind::Api
    }
}

/// Detail scraped from the rendered page.
///
/// Page loads wait out the same jitter as HTTP requests.
pub struct DomDetailSource {
    renderer: Arc<dyn PageRenderer>,
    base_url: String,
    cookies: Vec<SessionCookie>,
    jitter: Jitter,
}

impl DomDetailSource {
    pub fn new(
        renderer: Arc<dyn PageRenderer>,
        base_url: &str,
        cookies: Vec<SessionCookie>,
        jitter: Jitter,
    ) -> Self {
        Self {
            renderer,
            base_url: base_url.trim_end_matches('/').to_string(),
            cookies,
            jitter,
        }
    }
}

#[async_trait]
impl DetailSource for DomDetailSource {
    async fn fetch_detail(&self, id: &CompanyId) -> Result<CompanyRecord> {
        let url = detail_page_url(&self.base_url, id);
        self.jitter.wait().await;
        let page = self
            .renderer
            .render(&url, &self.cookies, DETAIL_READY_SELECTOR)
            .await?;

        if is_captcha_page(&page.html) {
            return Err(ClientError::Captcha(format!("detail page of {id}")));
        }
        if page.final_url.contains("login") {
            return Err(ClientError::Permission(format!(
                "detail page of {id} redirected to login"
            )));
        }

        let fields = DomCompanyFields::extract(&page.html);
        if fields.is_empty() {
            return Err(ClientError::DataFetch(format!(
                "no company fields on detail page of {id}"
            )));
        }

        let mut company = CompanyRecord::new(id.clone());
        fields.overlay(&mut company);
        company.crawl_time = crawl_time_now();
        company.source_url = Some(url);
        Ok(company)
    }

    fn kind(&self) -> DetailSourceKind {
        DetailSourceKind::Dom
    }
}

/// JSON detail overlaid with the fields the rendered page had.
pub struct MergedDetailSource {
    api: ApiDetailSource,
    dom: DomDetailSource,
}

impl MergedDetailSource {
    pub fn new(api: ApiDetailSource, dom: DomDetailSource) -> Self {
        Self { api, dom }
    }
}

#[async_trait]
impl DetailSource for MergedDetailSource {
    async fn fetch_detail(&self, id: &CompanyId) -> Result<CompanyRecord> {
        let (api, dom) = tokio::join!(self.api.fetch_detail(id), self.dom.fetch_detail(id));

        match (api, dom) {
            (Ok(mut company), Ok(page)) => {
                DomCompanyFields {
                    company_name: page.company_name,
                    legal_person: page.legal_person,
                    register_capital: page.register_capital,
                    establish_date: page.establish_date,
                    status: page.status,
                    credit_code: page.credit_code,
                    business_scope: page.business_scope,
                    register_address: page.register_address,
                }
                .overlay(&mut company);
                Ok(company)
            }
            (Ok(company), Err(e)) => {
                tracing::warn!(company_id = %id, "Detail page unavailable, using API only: {}", e);
                Ok(company)
            }
            (Err(e), Ok(page)) => {
                tracing::warn!(company_id = %id, "Detail API failed, using page only: {}", e);
                Ok(page)
            }
            (Err(api_error), Err(dom_error)) => {
                tracing::debug!(company_id = %id, "Detail page also failed: {}", dom_error);
                Err(api_error)
            }
        }
    }

    fn kind(&self) -> DetailSourceKind {
        DetailSourceKind::Merged
    }
}
