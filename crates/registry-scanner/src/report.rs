//! Counters collected while a crawl runs.

use serde::Serialize;
use std::fmt;

/// Why pagination for a keyword ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "detail")]
pub enum StopReason {
    /// A page came back with no items
    EmptyPage,
    /// The next page would exceed the record budget
    BudgetReached,
    /// The search request failed
    SearchFailed(String),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPage => f.write_str("empty page"),
            Self::BudgetReached => f.write_str("record budget reached"),
            Self::SearchFailed(e) => write!(f, "search failed: {e}"),
        }
    }
}

/// Persisted/dropped tallies for a batch of companies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchOutcome {
    /// Main records written to the sink
    pub persisted: usize,
    /// Companies whose fetch or store failed
    pub dropped: usize,
    /// Sub-entity rows written alongside the main records
    pub sub_entities: usize,
}

impl BatchOutcome {
    pub(crate) fn persisted() -> Self {
        Self {
            persisted: 1,
            ..Self::default()
        }
    }

    pub(crate) fn dropped() -> Self {
        Self {
            dropped: 1,
            ..Self::default()
        }
    }

    pub(crate) fn merge(&mut self, other: Self) {
        self.persisted += other.persisted;
        self.dropped += other.dropped;
        self.sub_entities += other.sub_entities;
    }
}

/// Outcome of paginating one keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeywordOutcome {
    /// The keyword searched
    pub keyword: String,
    /// Search pages successfully fetched
    pub pages_fetched: u32,
    /// Companies found, fetched and stored
    pub totals: BatchOutcome,
    /// Why pagination ended
    pub stop: StopReason,
}

/// Summary of a whole crawl run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Per-keyword outcomes, search mode only
    pub keywords: Vec<KeywordOutcome>,
    /// Search pages fetched across all keywords
    pub pages_fetched: u32,
    /// Totals across the run
    pub totals: BatchOutcome,
}

impl CrawlReport {
    pub(crate) fn absorb_keyword(&mut self, outcome: KeywordOutcome) {
        self.pages_fetched += outcome.pages_fetched;
        self.totals.merge(outcome.totals);
        self.keywords.push(outcome);
    }

    /// Main records persisted.
    #[must_use]
    pub fn records_persisted(&self) -> usize {
        self.totals.persisted
    }

    /// Main records dropped after a fetch or store failure.
    #[must_use]
    pub fn records_dropped(&self) -> usize {
        self.totals.dropped
    }

    /// Emit the summary through tracing.
    pub fn log_summary(&self) {
        for keyword in &self.keywords {
            tracing::info!(
                keyword = %keyword.keyword,
                pages = keyword.pages_fetched,
                persisted = keyword.totals.persisted,
                dropped = keyword.totals.dropped,
                "Keyword finished: {}",
                keyword.stop
            );
        }
        tracing::info!(
            pages = self.pages_fetched,
            persisted = self.totals.persisted,
            dropped = self.totals.dropped,
            sub_entities = self.totals.sub_entities,
            "Crawl finished"
        );
    }
}
