//! Crawled record types.
//!
//! Every record carries the owning `company_id`, the `platform` tag and the
//! `crawl_time` (epoch seconds). Raw text fields are kept exactly as the
//! platform returned them; derived fields (`*_value`, `*_iso`, score, scope
//! list) are filled by the normalizer and stay `None` when parsing fails.
//!
//! [`CrawlRecord`] is the tagged union over the nine kinds. Persistence
//! matches on it exhaustively instead of dispatching on type names.

use crate::error::CoreError;
use crate::types::{CompanyId, EntityKind, PLATFORM};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

fn default_platform() -> String {
    PLATFORM.to_string()
}

/// Accept strings, numbers and booleans as text; the platform is not consistent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Like [`lenient_text`] but the field is required and must be non-blank.
fn required_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_text(deserializer)?
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| serde::de::Error::custom("entity key must not be blank"))
}

/// Company profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub company_name: Option<String>,
    pub legal_person: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub register_capital: Option<String>,
    pub register_capital_amount: Option<f64>,
    pub establish_date: Option<String>,
    pub establish_date_iso: Option<String>,
    pub status: Option<String>,
    pub credit_code: Option<String>,
    pub business_scope: Option<String>,
    #[serde(default)]
    pub business_scope_list: Vec<String>,
    pub register_address: Option<String>,
    pub company_type: Option<String>,
    pub industry: Option<String>,
    pub province: Option<String>,
    pub city: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub company_score: Option<u8>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
    pub keyword: Option<String>,
    pub source_url: Option<String>,
}

impl CompanyRecord {
    /// Empty profile for `company_id`.
    #[must_use]
    pub fn new(company_id: CompanyId) -> Self {
        Self {
            company_id,
            company_name: None,
            legal_person: None,
            register_capital: None,
            register_capital_amount: None,
            establish_date: None,
            establish_date_iso: None,
            status: None,
            credit_code: None,
            business_scope: None,
            business_scope_list: Vec::new(),
            register_address: None,
            company_type: None,
            industry: None,
            province: None,
            city: None,
            phone: None,
            email: None,
            website: None,
            company_score: None,
            platform: default_platform(),
            crawl_time: 0,
            keyword: None,
            source_url: None,
        }
    }
}

/// Shareholder of a company, keyed by (`company_id`, `shareholder_name`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shareholder {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub shareholder_name: String,
    pub shareholder_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub investment_amount: Option<String>,
    pub investment_amount_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub investment_ratio: Option<String>,
    pub investment_ratio_value: Option<f64>,
    pub investment_date: Option<String>,
    pub investment_date_iso: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Litigation record, keyed by (`company_id`, `case_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalCase {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub case_id: String,
    pub case_title: Option<String>,
    pub case_type: Option<String>,
    pub case_status: Option<String>,
    pub case_date: Option<String>,
    pub case_date_iso: Option<String>,
    pub court_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub case_amount: Option<String>,
    pub case_amount_value: Option<f64>,
    pub plaintiff: Option<String>,
    pub defendant: Option<String>,
    pub case_result: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Patent, trademark or copyright, keyed by (`company_id`, `ip_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntellectualProperty {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub ip_id: String,
    pub ip_name: Option<String>,
    pub ip_type: Option<String>,
    pub ip_status: Option<String>,
    pub application_date: Option<String>,
    pub application_date_iso: Option<String>,
    pub authorization_date: Option<String>,
    pub authorization_date_iso: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub application_number: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub authorization_number: Option<String>,
    pub ip_category: Option<String>,
    pub applicant: Option<String>,
    pub inventor: Option<String>,
    pub description: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Tender / bidding record, keyed by (`company_id`, `bidding_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiddingRecord {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub bidding_id: String,
    pub bidding_title: Option<String>,
    pub bidding_type: Option<String>,
    pub bidding_status: Option<String>,
    pub publish_date: Option<String>,
    pub publish_date_iso: Option<String>,
    pub bidding_date: Option<String>,
    pub bidding_date_iso: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub project_amount: Option<String>,
    pub project_amount_value: Option<f64>,
    pub purchaser: Option<String>,
    pub supplier: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub winning_amount: Option<String>,
    pub winning_amount_value: Option<f64>,
    pub project_description: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Annual report filing, keyed by (`company_id`, `report_year`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnualReport {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub report_year: String,
    pub report_type: Option<String>,
    pub report_status: Option<String>,
    pub report_date: Option<String>,
    pub report_date_iso: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub revenue: Option<String>,
    pub revenue_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub profit: Option<String>,
    pub profit_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub assets: Option<String>,
    pub assets_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub liabilities: Option<String>,
    pub liabilities_value: Option<f64>,
    pub employee_count: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub tax_amount: Option<String>,
    pub tax_amount_value: Option<f64>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Registration change, keyed by (`company_id`, `change_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub change_id: String,
    pub change_type: Option<String>,
    pub change_date: Option<String>,
    pub change_date_iso: Option<String>,
    pub change_before: Option<String>,
    pub change_after: Option<String>,
    pub change_description: Option<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Branch office, keyed by (`company_id`, `branch_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub branch_id: String,
    pub branch_name: Option<String>,
    pub branch_type: Option<String>,
    pub branch_status: Option<String>,
    pub establish_date: Option<String>,
    pub establish_date_iso: Option<String>,
    pub legal_person: Option<String>,
    pub register_address: Option<String>,
    pub business_scope: Option<String>,
    #[serde(default)]
    pub business_scope_list: Vec<String>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Related company edge, keyed by (`company_id`, `related_company_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedCompany {
    pub company_id: CompanyId,
    #[serde(deserialize_with = "required_text")]
    pub related_company_id: String,
    pub related_company_name: Option<String>,
    pub relation_type: Option<String>,
    pub relation_description: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub investment_ratio: Option<String>,
    pub investment_ratio_value: Option<f64>,
    #[serde(default = "default_platform")]
    pub platform: String,
    #[serde(default)]
    pub crawl_time: i64,
}

/// Fill the fields every record carries: `company_id` (when the platform
/// omitted it), `platform` (when absent) and `crawl_time` (always).
pub fn stamp_platform_fields(
    object: &mut Map<String, Value>,
    company_id: &CompanyId,
    crawl_time: i64,
) {
    match object.get("company_id") {
        None | Some(Value::Null) => {
            object.insert(
                "company_id".to_string(),
                Value::String(company_id.to_string()),
            );
        }
        Some(Value::Number(n)) => {
            let id = n.to_string();
            object.insert("company_id".to_string(), Value::String(id));
        }
        Some(_) => {}
    }
    object
        .entry("platform")
        .or_insert_with(|| Value::String(PLATFORM.to_string()));
    object.insert("crawl_time".to_string(), Value::from(crawl_time));
}

/// Tagged union over every record kind the crawler produces.
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlRecord {
    /// Company profile
    Company(CompanyRecord),
    /// Shareholder
    Shareholder(Shareholder),
    /// Litigation
    LegalCase(LegalCase),
    /// Intellectual property
    IntellectualProperty(IntellectualProperty),
    /// Bidding
    Bidding(BiddingRecord),
    /// Annual report
    AnnualReport(AnnualReport),
    /// Change record
    ChangeRecord(ChangeRecord),
    /// Branch
    Branch(Branch),
    /// Related company
    RelatedCompany(RelatedCompany),
}

impl CrawlRecord {
    /// Decode one platform JSON object into a record of `kind`.
    ///
    /// `company_id` is injected into the object when the platform omitted it,
    /// and missing platform/crawl-time fields are stamped.
    pub fn from_platform_json(
        kind: EntityKind,
        company_id: &CompanyId,
        mut object: Map<String, Value>,
        crawl_time: i64,
    ) -> Result<Self, CoreError> {
        stamp_platform_fields(&mut object, company_id, crawl_time);
        let value = Value::Object(object);

        let record = match kind {
            EntityKind::Company => Self::Company(serde_json::from_value(value)?),
            EntityKind::Shareholder => Self::Shareholder(serde_json::from_value(value)?),
            EntityKind::LegalCase => Self::LegalCase(serde_json::from_value(value)?),
            EntityKind::IntellectualProperty => {
                Self::IntellectualProperty(serde_json::from_value(value)?)
            }
            EntityKind::Bidding => Self::Bidding(serde_json::from_value(value)?),
            EntityKind::AnnualReport => Self::AnnualReport(serde_json::from_value(value)?),
            EntityKind::ChangeRecord => Self::ChangeRecord(serde_json::from_value(value)?),
            EntityKind::Branch => Self::Branch(serde_json::from_value(value)?),
            EntityKind::RelatedCompany => Self::RelatedCompany(serde_json::from_value(value)?),
        };
        Ok(record)
    }

    /// Kind tag of this record.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            Self::Company(_) => EntityKind::Company,
            Self::Shareholder(_) => EntityKind::Shareholder,
            Self::LegalCase(_) => EntityKind::LegalCase,
            Self::IntellectualProperty(_) => EntityKind::IntellectualProperty,
            Self::Bidding(_) => EntityKind::Bidding,
            Self::AnnualReport(_) => EntityKind::AnnualReport,
            Self::ChangeRecord(_) => EntityKind::ChangeRecord,
            Self::Branch(_) => EntityKind::Branch,
            Self::RelatedCompany(_) => EntityKind::RelatedCompany,
        }
    }

    /// Owning company.
    #[must_use]
    pub fn company_id(&self) -> &CompanyId {
        match self {
            Self::Company(r) => &r.company_id,
            Self::Shareholder(r) => &r.company_id,
            Self::LegalCase(r) => &r.company_id,
            Self::IntellectualProperty(r) => &r.company_id,
            Self::Bidding(r) => &r.company_id,
            Self::AnnualReport(r) => &r.company_id,
            Self::ChangeRecord(r) => &r.company_id,
            Self::Branch(r) => &r.company_id,
            Self::RelatedCompany(r) => &r.company_id,
        }
    }

    /// Natural key values, in the order of [`EntityKind::key_columns`].
    #[must_use]
    pub fn natural_key(&self) -> Vec<&str> {
        let company = self.company_id().as_str();
        let local = match self {
            Self::Company(_) => return vec![company],
            Self::Shareholder(r) => r.shareholder_name.as_str(),
            Self::LegalCase(r) => r.case_id.as_str(),
            Self::IntellectualProperty(r) => r.ip_id.as_str(),
            Self::Bidding(r) => r.bidding_id.as_str(),
            Self::AnnualReport(r) => r.report_year.as_str(),
            Self::ChangeRecord(r) => r.change_id.as_str(),
            Self::Branch(r) => r.branch_id.as_str(),
            Self::RelatedCompany(r) => r.related_company_id.as_str(),
        };
        vec![company, local]
    }

    /// Flatten into a column-name → value map.
    ///
    /// Keys are exactly [`EntityKind::columns`] for this record's kind.
    pub fn to_row(&self) -> Result<Map<String, Value>, CoreError> {
        let value = match self {
            Self::Company(r) => serde_json::to_value(r)?,
            Self::Shareholder(r) => serde_json::to_value(r)?,
            Self::LegalCase(r) => serde_json::to_value(r)?,
            Self::IntellectualProperty(r) => serde_json::to_value(r)?,
            Self::Bidding(r) => serde_json::to_value(r)?,
            Self::AnnualReport(r) => serde_json::to_value(r)?,
            Self::ChangeRecord(r) => serde_json::to_value(r)?,
            Self::Branch(r) => serde_json::to_value(r)?,
            Self::RelatedCompany(r) => serde_json::to_value(r)?,
        };
        match value {
            Value::Object(map) => Ok(map),
            other => Err(CoreError::Validation(format!(
                "{} record did not serialize to an object: {other}",
                self.kind()
            ))),
        }
    }
}

impl EntityKind {
    /// Columns of this kind, in table / CSV order.
    #[must_use]
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Company => &[
                "company_id",
                "company_name",
                "legal_person",
                "register_capital",
                "register_capital_amount",
                "establish_date",
                "establish_date_iso",
                "status",
                "credit_code",
                "business_scope",
                "business_scope_list",
                "register_address",
                "company_type",
                "industry",
                "province",
                "city",
                "phone",
                "email",
                "website",
                "company_score",
                "platform",
                "crawl_time",
                "keyword",
                "source_url",
            ],
            Self::Shareholder => &[
                "company_id",
                "shareholder_name",
                "shareholder_type",
                "investment_amount",
                "investment_amount_value",
                "investment_ratio",
                "investment_ratio_value",
                "investment_date",
                "investment_date_iso",
                "platform",
                "crawl_time",
            ],
            Self::LegalCase => &[
                "company_id",
                "case_id",
                "case_title",
                "case_type",
                "case_status",
                "case_date",
                "case_date_iso",
                "court_name",
                "case_amount",
                "case_amount_value",
                "plaintiff",
                "defendant",
                "case_result",
                "platform",
                "crawl_time",
            ],
            Self::IntellectualProperty => &[
                "company_id",
                "ip_id",
                "ip_name",
                "ip_type",
                "ip_status",
                "application_date",
                "application_date_iso",
                "authorization_date",
                "authorization_date_iso",
                "application_number",
                "authorization_number",
                "ip_category",
                "applicant",
                "inventor",
                "description",
                "platform",
                "crawl_time",
            ],
            Self::Bidding => &[
                "company_id",
                "bidding_id",
                "bidding_title",
                "bidding_type",
                "bidding_status",
                "publish_date",
                "publish_date_iso",
                "bidding_date",
                "bidding_date_iso",
                "project_amount",
                "project_amount_value",
                "purchaser",
                "supplier",
                "winning_amount",
                "winning_amount_value",
                "project_description",
                "platform",
                "crawl_time",
            ],
            Self::AnnualReport => &[
                "company_id",
                "report_year",
                "report_type",
                "report_status",
                "report_date",
                "report_date_iso",
                "revenue",
                "revenue_value",
                "profit",
                "profit_value",
                "assets",
                "assets_value",
                "liabilities",
                "liabilities_value",
                "employee_count",
                "tax_amount",
                "tax_amount_value",
                "platform",
                "crawl_time",
            ],
            Self::ChangeRecord => &[
                "company_id",
                "change_id",
                "change_type",
                "change_date",
                "change_date_iso",
                "change_before",
                "change_after",
                "change_description",
                "platform",
                "crawl_time",
            ],
            Self::Branch => &[
                "company_id",
                "branch_id",
                "branch_name",
                "branch_type",
                "branch_status",
                "establish_date",
                "establish_date_iso",
                "legal_person",
                "register_address",
                "business_scope",
                "business_scope_list",
                "platform",
                "crawl_time",
            ],
            Self::RelatedCompany => &[
                "company_id",
                "related_company_id",
                "related_company_name",
                "relation_type",
                "relation_description",
                "investment_ratio",
                "investment_ratio_value",
                "platform",
                "crawl_time",
            ],
        }
    }

    /// Natural-key columns: `company_id` plus the entity-local id for sub-entities.
    #[must_use]
    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Self::Company => &["company_id"],
            Self::Shareholder => &["company_id", "shareholder_name"],
            Self::LegalCase => &["company_id", "case_id"],
            Self::IntellectualProperty => &["company_id", "ip_id"],
            Self::Bidding => &["company_id", "bidding_id"],
            Self::AnnualReport => &["company_id", "report_year"],
            Self::ChangeRecord => &["company_id", "change_id"],
            Self::Branch => &["company_id", "branch_id"],
            Self::RelatedCompany => &["company_id", "related_company_id"],
        }
    }
}
