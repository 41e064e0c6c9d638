//! Shared types used across the registry crawler.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::CoreError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Platform tag stamped on every crawled record.
pub const PLATFORM: &str = "aiqicha";

/// Newtype for the platform's external company identifier (the natural key).
///
/// Company IDs are 1-64 characters of ASCII letters, digits, `_` or `-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompanyId(String);

impl CompanyId {
    /// Create a new `CompanyId` from a string.
    ///
    /// Surrounding whitespace is trimmed before validation.
    ///
    /// # Errors
    /// Returns error if the ID is empty or contains characters outside the allowed set.
    pub fn new(id: impl Into<String>) -> Result<Self, CoreError> {
        let id = id.into().trim().to_string();
        Self::validate(&id)?;
        Ok(Self(id))
    }

    /// Get the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(id: &str) -> Result<(), CoreError> {
        static ID_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex =
            ID_REGEX.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,64}$").expect("valid regex"));

        if regex.is_match(id) {
            Ok(())
        } else {
            Err(CoreError::Validation(format!(
                "invalid company ID: must be 1-64 alphanumeric, '_' or '-' characters, got '{id}'"
            )))
        }
    }
}

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for CompanyId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<CompanyId> for String {
    fn from(id: CompanyId) -> Self {
        id.0
    }
}

/// The nine entity kinds the crawler extracts and persists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Company profile
    Company,
    /// Shareholder of a company
    Shareholder,
    /// Litigation record
    LegalCase,
    /// Patent, trademark or copyright
    IntellectualProperty,
    /// Tender / bidding record
    Bidding,
    /// Annual report filing
    AnnualReport,
    /// Registration change record
    ChangeRecord,
    /// Branch office
    Branch,
    /// Related (invested / controlled) company
    RelatedCompany,
}

impl EntityKind {
    /// All entity kinds in declaration order.
    pub const ALL: [EntityKind; 9] = [
        Self::Company,
        Self::Shareholder,
        Self::LegalCase,
        Self::IntellectualProperty,
        Self::Bidding,
        Self::AnnualReport,
        Self::ChangeRecord,
        Self::Branch,
        Self::RelatedCompany,
    ];

    /// Stable snake_case name, used for file stems and log fields.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Shareholder => "shareholder",
            Self::LegalCase => "legal_case",
            Self::IntellectualProperty => "intellectual_property",
            Self::Bidding => "bidding",
            Self::AnnualReport => "annual_report",
            Self::ChangeRecord => "change_record",
            Self::Branch => "branch",
            Self::RelatedCompany => "related_company",
        }
    }

    /// Relational table holding this kind.
    #[must_use]
    pub fn table_name(&self) -> &'static str {
        match self {
            Self::Company => "companies",
            Self::Shareholder => "shareholders",
            Self::LegalCase => "legal_cases",
            Self::IntellectualProperty => "intellectual_properties",
            Self::Bidding => "biddings",
            Self::AnnualReport => "annual_reports",
            Self::ChangeRecord => "change_records",
            Self::Branch => "branches",
            Self::RelatedCompany => "related_companies",
        }
    }

    /// File stem for the `<stem>.json` / `<stem>.csv` outputs.
    #[must_use]
    pub fn file_stem(&self) -> &'static str {
        self.as_str()
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Registration status of a company, parsed from the platform's status text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompanyStatus {
    /// 存续 (in business)
    Active,
    /// 注销 (deregistered)
    Cancelled,
    /// 吊销 (licence revoked)
    Revoked,
    /// 迁出 (moved out)
    MovedOut,
    /// 停业 (suspended)
    Suspended,
    /// 合并 (merged)
    Merged,
    /// 解散 (dissolved)
    Dissolved,
    /// Anything else
    Other,
}

impl CompanyStatus {
    /// Parse the platform's free-text status.
    ///
    /// The text is matched by containment so that decorated values such as
    /// `"存续（在营、开业、在册）"` still resolve.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        // Order matters: 吊销 texts often also mention 注销 ("吊销，未注销").
        if text.contains("吊销") {
            Self::Revoked
        } else if text.contains("注销") {
            Self::Cancelled
        } else if text.contains("存续") || text.contains("在营") || text.contains("开业") {
            Self::Active
        } else if text.contains("迁出") {
            Self::MovedOut
        } else if text.contains("停业") {
            Self::Suspended
        } else if text.contains("合并") {
            Self::Merged
        } else if text.contains("解散") {
            Self::Dissolved
        } else {
            Self::Other
        }
    }

    /// Whether the company is still operating.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }

    /// Whether the company has been cancelled or had its licence revoked.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Revoked)
    }
}

/// What a crawl run does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlMode {
    /// Keyword search with pagination, then detail fetch per hit
    #[default]
    Search,
    /// Detail fetch for an explicit list of ids/URLs
    Detail,
    /// One hop of related companies for each seed id
    Related,
}

impl FromStr for CrawlMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "search" => Ok(Self::Search),
            "detail" => Ok(Self::Detail),
            "related" => Ok(Self::Related),
            other => Err(CoreError::Validation(format!("unknown crawl mode '{other}'"))),
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Search => "search",
            Self::Detail => "detail",
            Self::Related => "related",
        };
        write!(f, "{s}")
    }
}

/// How the session authenticates against the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoginMode {
    /// Scan a QR code with the mobile app
    #[default]
    Qrcode,
    /// SMS verification code
    Phone,
    /// Pre-obtained cookie string
    Cookie,
}

impl FromStr for LoginMode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "qrcode" => Ok(Self::Qrcode),
            "phone" => Ok(Self::Phone),
            "cookie" => Ok(Self::Cookie),
            other => Err(CoreError::Validation(format!("unknown login mode '{other}'"))),
        }
    }
}

impl fmt::Display for LoginMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Qrcode => "qrcode",
            Self::Phone => "phone",
            Self::Cookie => "cookie",
        };
        write!(f, "{s}")
    }
}

/// Which backend produces company detail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailSourceKind {
    /// JSON detail endpoint only
    #[default]
    Api,
    /// Rendered detail page only
    Dom,
    /// JSON record overlaid with the DOM fields that were found
    Merged,
}

impl DetailSourceKind {
    /// Whether this source drives browser tabs.
    #[must_use]
    pub fn uses_browser(&self) -> bool {
        matches!(self, Self::Dom | Self::Merged)
    }
}

/// Search result ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSort {
    /// Relevance ranking
    #[default]
    Relevance,
    /// Registration date
    RegisterTime,
    /// Registered capital
    Capital,
}

impl SearchSort {
    /// Query-string value sent to the platform.
    #[must_use]
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::RegisterTime => "register_time",
            Self::Capital => "capital",
        }
    }
}

/// Which field the search keyword is matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchFilter {
    /// Any field
    #[default]
    All,
    /// Company name
    CompanyName,
    /// Unified social credit code
    CreditCode,
    /// Legal representative
    LegalPerson,
    /// Phone number
    Phone,
    /// Email
    Email,
    /// Brand
    Brand,
    /// Product
    Product,
}

impl SearchFilter {
    /// Query-string value sent to the platform.
    #[must_use]
    pub fn as_param(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::CompanyName => "company_name",
            Self::CreditCode => "credit_code",
            Self::LegalPerson => "legal_person",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Brand => "brand",
            Self::Product => "product",
        }
    }
}

/// Optional narrowing parameters for a search.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
    /// Province name
    pub province: Option<String>,
    /// City name
    pub city: Option<String>,
    /// Industry
    pub industry: Option<String>,
    /// Registration status text
    pub status: Option<String>,
}

impl SearchFilters {
    /// Non-empty filters as query pairs.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        [
            ("province", &self.province),
            ("city", &self.city),
            ("industry", &self.industry),
            ("status", &self.status),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (name, v.to_string()))
        })
        .collect()
    }
}
