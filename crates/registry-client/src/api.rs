//! Platform operations.
//!
//! Search and detail failures propagate. Sub-entity lookups are
//! best-effort: any failure is logged and yields an empty list so one
//! broken tab of a company page never sinks the company.

use crate::detail::{
    crawl_time_now, ApiDetailSource, DetailSource, DomDetailSource, MergedDetailSource,
};
use crate::dom::PageRenderer;
use crate::error::{ClientError, Result};
use crate::models::{alias, rows, SearchPage, SearchQuery};
use crate::transport::Transport;
use async_trait::async_trait;
use registry_auth::parse_cookie_string;
use registry_core::{
    ClientConfig, CompanyId, CompanyRecord, CrawlRecord, DetailSourceKind,
    EntityKind, IntellectualProperty, LegalCase, RelatedCompany, Shareholder,
};
use registry_normalizer::generate_search_id;
use serde_json::{Map, Value};
use std::sync::Arc;
use zeroize::Zeroizing;

const SEARCH_PATH: &str = "/search";
const SHAREHOLDERS_PATH: &str = "/api/company/shareholders";
const LEGAL_CASES_PATH: &str = "/api/company/legal_cases";
const RELATED_PATH: &str = "/api/company/related";
const IP_PATH: &str = "/api/company/intellectual_property";

/// Platform field names copied into the local key field when it is absent.
type Aliases = &'static [(&'static str, &'static [&'static str])];
const SHAREHOLDER_ALIASES: Aliases = &[("shareholder_name", &["name", "stockName"])];
const LEGAL_CASE_ALIASES: Aliases = &[("case_id", &["caseId", "id"])];
const IP_ALIASES: Aliases = &[("ip_id", &["id", "ipId"])];
const RELATED_ALIASES: Aliases = &[
    ("related_company_id", &["id", "pid", "company_id"]),
    ("related_company_name", &["name", "entName"]),
];

/// Operations the crawler needs from the platform.
#[async_trait]
pub trait PlatformApi: Send + Sync {
    /// Whether the session still reaches an authenticated page. Never fails.
    async fn pong(&self) -> bool;

    async fn search_company(&self, query: &SearchQuery) -> Result<SearchPage>;

    async fn get_company_detail(&self, id: &CompanyId) -> Result<CompanyRecord>;

    async fn get_shareholders(&self, id: &CompanyId) -> Vec<Shareholder>;

    /// One page (1-based) of litigation records.
    async fn get_legal_cases(&self, id: &CompanyId, page: u32) -> Vec<LegalCase>;

    async fn get_related_companies(&self, id: &CompanyId) -> Vec<RelatedCompany>;

    async fn get_intellectual_property(&self, id: &CompanyId) -> Vec<IntellectualProperty>;
}

/// HTTP-backed [`PlatformApi`].
#[derive(Clone)]
pub struct PlatformClient {
    config: ClientConfig,
    transport: Arc<Transport>,
    detail: Arc<dyn DetailSource>,
    renderer: Option<Arc<dyn PageRenderer>>,
}

impl PlatformClient {
    /// Build a client sending `credential` with every request.
    ///
    /// `renderer` is required when `config.detail_source` drives a browser.
    pub fn connect(
        config: ClientConfig,
        credential: Option<&Zeroizing<String>>,
        renderer: Option<Arc<dyn PageRenderer>>,
    ) -> Result<Self> {
        let transport = Arc::new(Transport::new(&config, credential)?);
        let detail = detail_source(&config, &transport, credential, renderer.clone())?;

        tracing::debug!(
            base_url = %transport.base_url(),
            detail_source = ?detail.kind(),
            authenticated = credential.is_some(),
            "Platform client ready"
        );

        Ok(Self {
            config,
            transport,
            detail,
            renderer,
        })
    }

    /// Same settings, new session credential.
    pub fn with_credential(&self, credential: &Zeroizing<String>) -> Result<Self> {
        Self::connect(self.config.clone(), Some(credential), self.renderer.clone())
    }

    /// Which backend serves company details.
    pub fn detail_source(&self) -> DetailSourceKind {
        self.detail.kind()
    }

    /// Fetch a list endpoint and decode its rows as `kind`.
    async fn sub_entities(
        &self,
        kind: EntityKind,
        path: &str,
        id: &CompanyId,
        extra: &[(&str, String)],
        aliases: Aliases,
    ) -> Vec<CrawlRecord> {
        let mut query = vec![("id", id.to_string())];
        query.extend(extra.iter().map(|(k, v)| (*k, v.clone())));

        let data = match self.transport.get_json(path, &query).await {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(company_id = %id, kind = %kind, "Failed to fetch {}: {}", kind.table_name(), e);
                return Vec::new();
            }
        };

        let crawl_time = crawl_time_now();
        rows(data)
            .into_iter()
            .filter_map(|mut object| {
                for &(target, candidates) in aliases {
                    alias(&mut object, target, candidates);
                }
                decode_row(kind, id, object, crawl_time)
            })
            .collect()
    }
}

fn decode_row(
    kind: EntityKind,
    id: &CompanyId,
    mut object: Map<String, Value>,
    crawl_time: i64,
) -> Option<CrawlRecord> {
    // Rows belong to the company they were requested for.
    object.insert("company_id".to_string(), Value::String(id.to_string()));
    match CrawlRecord::from_platform_json(kind, id, object, crawl_time) {
        Ok(record) => Some(record),
        Err(e) => {
            tracing::debug!(company_id = %id, kind = %kind, "Skipping undecodable row: {}", e);
            None
        }
    }
}

fn detail_source(
    config: &ClientConfig,
    transport: &Arc<Transport>,
    credential: Option<&Zeroizing<String>>,
    renderer: Option<Arc<dyn PageRenderer>>,
) -> Result<Arc<dyn DetailSource>> {
    let api = ApiDetailSource::new(Arc::clone(transport));
    if !config.detail_source.uses_browser() {
        return Ok(Arc::new(api));
    }

    let renderer = renderer.ok_or_else(|| {
        ClientError::Config(format!(
            "detail source {:?} needs a browser but none was started",
            config.detail_source
        ))
    })?;
    let domain = url::Url::parse(transport.base_url())
        .ok()
        .and_then(|u| u.host_str().map(|h| format!(".{h}")))
        .ok_or_else(|| ClientError::Config(format!("base URL '{}' has no host", transport.base_url())))?;
    let cookies = credential
        .map(|c| parse_cookie_string(c, &domain))
        .unwrap_or_default();
    let dom = DomDetailSource::new(renderer, transport.base_url(), cookies, transport.jitter());

    Ok(match config.detail_source {
        DetailSourceKind::Merged => Arc::new(MergedDetailSource::new(api, dom)),
        _ => Arc::new(dom),
    })
}

macro_rules! unwrap_kind {
    ($records:expr, $variant:ident) => {
        $records
            .into_iter()
            .filter_map(|record| match record {
                CrawlRecord::$variant(r) => Some(r),
                _ => None,
            })
            .collect()
    };
}

#[async_trait]
impl PlatformApi for PlatformClient {
    async fn pong(&self) -> bool {
        match self.transport.get_page("/").await {
            Ok(page) => {
                let alive = !page.final_url.contains("login");
                if !alive {
                    tracing::info!(url = %page.final_url, "Session redirected to login");
                }
                alive
            }
            Err(e) => {
                tracing::warn!("Platform unreachable: {}", e);
                false
            }
        }
    }

    async fn search_company(&self, query: &SearchQuery) -> Result<SearchPage> {
        let params = query.to_params(generate_search_id());
        let data = self.transport.get_json(SEARCH_PATH, &params).await?;
        let page = SearchPage::from_data(&data)?;
        tracing::debug!(
            keyword = %query.keyword,
            page = query.page,
            items = page.items.len(),
            total = ?page.total,
            "Search page fetched"
        );
        Ok(page)
    }

    async fn get_company_detail(&self, id: &CompanyId) -> Result<CompanyRecord> {
        self.detail.fetch_detail(id).await
    }

    async fn get_shareholders(&self, id: &CompanyId) -> Vec<Shareholder> {
        let records = self
            .sub_entities(
                EntityKind::Shareholder,
                SHAREHOLDERS_PATH,
                id,
                &[],
                SHAREHOLDER_ALIASES,
            )
            .await;
        unwrap_kind!(records, Shareholder)
    }

    async fn get_legal_cases(&self, id: &CompanyId, page: u32) -> Vec<LegalCase> {
        let records = self
            .sub_entities(
                EntityKind::LegalCase,
                LEGAL_CASES_PATH,
                id,
                &[("page", page.to_string())],
                LEGAL_CASE_ALIASES,
            )
            .await;
        unwrap_kind!(records, LegalCase)
    }

    async fn get_related_companies(&self, id: &CompanyId) -> Vec<RelatedCompany> {
        let records = self
            .sub_entities(
                EntityKind::RelatedCompany,
                RELATED_PATH,
                id,
                &[],
                RELATED_ALIASES,
            )
            .await;
        unwrap_kind!(records, RelatedCompany)
    }

    async fn get_intellectual_property(&self, id: &CompanyId) -> Vec<IntellectualProperty> {
        let records = self
            .sub_entities(
                EntityKind::IntellectualProperty,
                IP_PATH,
                id,
                &[("page", "1".to_string())],
                IP_ALIASES,
            )
            .await;
        unwrap_kind!(records, IntellectualProperty)
    }
}
