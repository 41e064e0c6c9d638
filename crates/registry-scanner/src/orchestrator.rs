//! Crawl orchestrator.
//!
//! Search mode walks result pages one at a time per keyword and fans the
//! detail fetches for each page out under a counting semaphore. The next page
//! is requested only after every company of the current page has been stored
//! or dropped. A failing company never aborts its siblings; a failing search
//! request only ends its own keyword.

use crate::report::{BatchOutcome, CrawlReport, KeywordOutcome, StopReason};
use chrono::NaiveDate;
use futures::stream::{FuturesUnordered, StreamExt};
use registry_client::{PlatformApi, SearchQuery};
use registry_core::{CompanyId, CrawlConfig, CrawlMode, CrawlRecord};
use registry_normalizer::{normalize, resolve_target};
use registry_store::RecordSink;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Legal-case page fetched alongside each company.
const LEGAL_CASE_PAGE: u32 = 1;

/// Drives one crawl run against a platform API and a record sink.
pub struct CrawlOrchestrator {
    /// Platform operations
    api: Arc<dyn PlatformApi>,
    /// Where normalized records go
    sink: Arc<dyn RecordSink>,
    /// What to crawl
    config: CrawlConfig,
    /// Reference date for derived fields
    today: NaiveDate,
}

impl CrawlOrchestrator {
    /// Create an orchestrator for `config`.
    #[must_use]
    pub fn new(api: Arc<dyn PlatformApi>, sink: Arc<dyn RecordSink>, config: CrawlConfig) -> Self {
        Self {
            api,
            sink,
            config,
            today: chrono::Local::now().date_naive(),
        }
    }

    /// Pin the date used for establishment-age scoring.
    #[must_use]
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Run the configured mode to completion.
    pub async fn run(&self) -> CrawlReport {
        tracing::info!(
            mode = %self.config.mode,
            concurrency = self.config.max_concurrency,
            "Starting crawl"
        );
        let mut report = CrawlReport::default();

        match self.config.mode {
            CrawlMode::Search => {
                for keyword in self.config.keywords.iter().map(|k| k.trim()) {
                    if keyword.is_empty() {
                        continue;
                    }
                    report.absorb_keyword(self.crawl_keyword(keyword).await);
                }
            }
            CrawlMode::Detail => {
                let ids = self.resolve_targets();
                report.totals = self.fetch_companies(ids, None).await;
            }
            CrawlMode::Related => {
                for seed in self.resolve_targets() {
                    report.totals.merge(self.crawl_related(&seed).await);
                }
            }
        }

        report
    }

    /// Ids from the configured id/URL list, deduplicated in input order.
    fn resolve_targets(&self) -> Vec<CompanyId> {
        let mut seen = HashSet::new();
        self.config
            .company_ids
            .iter()
            .filter_map(|item| resolve_target(item))
            .filter(|id| seen.insert(id.clone()))
            .collect()
    }

    async fn crawl_keyword(&self, keyword: &str) -> KeywordOutcome {
        let start = self.config.start_page;
        let page_size = self.config.page_size;
        let budget = self.config.record_budget();

        let mut pages_fetched = 0;
        let mut totals = BatchOutcome::default();
        let mut page = start;

        let stop = loop {
            if (page - start + 1).saturating_mul(page_size) > budget {
                break StopReason::BudgetReached;
            }

            let query = SearchQuery {
                keyword: keyword.to_string(),
                page,
                page_size,
                sort: self.config.sort,
                filter: self.config.filter,
                filters: self.config.filters.clone(),
            };
            tracing::info!(keyword, page, "Searching");

            let results = match self.api.search_company(&query).await {
                Ok(results) => results,
                Err(e) => {
                    tracing::error!(keyword, page, "Search failed, ending keyword: {}", e);
                    break StopReason::SearchFailed(e.to_string());
                }
            };
            pages_fetched += 1;

            if results.is_empty() {
                tracing::info!(keyword, page, "No more results");
                break StopReason::EmptyPage;
            }

            let ids = results.items.into_iter().map(|item| item.id).collect();
            totals.merge(self.fetch_companies(ids, Some(keyword)).await);
            page += 1;
        };

        KeywordOutcome {
            keyword: keyword.to_string(),
            pages_fetched,
            totals,
            stop,
        }
    }

    /// Fetch, normalize and store `ids`, at most `max_concurrency` at a time.
    async fn fetch_companies(&self, ids: Vec<CompanyId>, keyword: Option<&str>) -> BatchOutcome {
        let semaphore = Semaphore::new(self.config.max_concurrency.max(1));
        let semaphore = &semaphore;

        let mut tasks: FuturesUnordered<_> = ids
            .into_iter()
            .map(|id| async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return BatchOutcome::dropped();
                };
                self.process_company(id, keyword).await
            })
            .collect();

        let mut outcome = BatchOutcome::default();
        while let Some(result) = tasks.next().await {
            outcome.merge(result);
        }
        outcome
    }

    async fn process_company(&self, id: CompanyId, keyword: Option<&str>) -> BatchOutcome {
        let mut company = match self.api.get_company_detail(&id).await {
            Ok(company) => company,
            Err(e) => {
                tracing::warn!(company_id = %id, "Dropping company: {}", e);
                return BatchOutcome::dropped();
            }
        };
        company.keyword = keyword.map(str::to_string);

        if let Err(e) = self.persist(CrawlRecord::Company(company)).await {
            tracing::error!(company_id = %id, "Failed to store company: {}", e);
            return BatchOutcome::dropped();
        }

        let mut outcome = BatchOutcome::persisted();
        if self.config.fetch_sub_entities {
            outcome.sub_entities = self.fetch_sub_entities(&id).await;
        }
        outcome
    }

    async fn fetch_sub_entities(&self, id: &CompanyId) -> usize {
        let (shareholders, cases, ip) = tokio::join!(
            self.api.get_shareholders(id),
            self.api.get_legal_cases(id, LEGAL_CASE_PAGE),
            self.api.get_intellectual_property(id),
        );

        let records = shareholders
            .into_iter()
            .map(CrawlRecord::Shareholder)
            .chain(cases.into_iter().map(CrawlRecord::LegalCase))
            .chain(ip.into_iter().map(CrawlRecord::IntellectualProperty));

        let mut stored = 0;
        for record in records {
            let kind = record.kind();
            match self.persist(record).await {
                Ok(()) => stored += 1,
                Err(e) => tracing::warn!(company_id = %id, %kind, "Failed to store sub-entity: {}", e),
            }
        }
        tracing::debug!(company_id = %id, stored, "Sub-entities stored");
        stored
    }

    /// One hop of related companies for `seed`. Nothing is followed further.
    async fn crawl_related(&self, seed: &CompanyId) -> BatchOutcome {
        let related = self.api.get_related_companies(seed).await;
        tracing::info!(company_id = %seed, count = related.len(), "Related companies fetched");

        let mut outcome = BatchOutcome::default();
        for record in related {
            match self.persist(CrawlRecord::RelatedCompany(record)).await {
                Ok(()) => outcome.persisted += 1,
                Err(e) => {
                    tracing::warn!(company_id = %seed, "Failed to store related company: {}", e);
                    outcome.dropped += 1;
                }
            }
        }
        outcome
    }

    async fn persist(&self, record: CrawlRecord) -> registry_store::Result<()> {
        self.sink.store(normalize(record, self.today)).await
    }
}
