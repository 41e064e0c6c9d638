//! Registry Normalizer
//!
//! Pure, total conversions from the platform's free text to typed fields.
//! Nothing here fails: malformed input yields `None` or an empty list and the
//! raw field it came from is left exactly as it was.

pub mod currency;
pub mod date;
pub mod scope;
pub mod score;
pub mod text;

pub use currency::parse_amount;
pub use date::{normalize_date, parse_date};
pub use scope::split_scope;
pub use score::company_score;
pub use text::{
    clean_company_name, extract_company_id, generate_search_id, parse_ratio, resolve_target,
    validate_credit_code,
};

use chrono::NaiveDate;
use registry_core::CrawlRecord;

fn amount(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|s| parse_amount(s))
}

fn ratio(raw: Option<&String>) -> Option<f64> {
    raw.and_then(|s| parse_ratio(s))
}

fn iso(raw: Option<&String>) -> Option<String> {
    raw.and_then(|s| normalize_date(s))
}

fn scope_list(raw: Option<&String>) -> Vec<String> {
    raw.map(|s| split_scope(s)).unwrap_or_default()
}

/// Fill every derived field of `record` from its raw fields.
///
/// Derived fields are overwritten with the parse result, so a value that no
/// longer parses becomes `None`. `today` anchors the company-age score tier.
pub fn normalize(record: CrawlRecord, today: NaiveDate) -> CrawlRecord {
    match record {
        CrawlRecord::Company(mut r) => {
            r.register_capital_amount = amount(r.register_capital.as_ref());
            r.establish_date_iso = iso(r.establish_date.as_ref());
            r.business_scope_list = scope_list(r.business_scope.as_ref());
            r.company_score = Some(company_score(
                r.register_capital_amount,
                r.status.as_deref(),
                r.establish_date.as_deref().and_then(parse_date),
                today,
            ));
            if let Some(code) = r.credit_code.as_deref() {
                if !validate_credit_code(code.trim()) {
                    tracing::debug!(company_id = %r.company_id, code, "Credit code has unexpected format");
                }
            }
            CrawlRecord::Company(r)
        }
        CrawlRecord::Shareholder(mut r) => {
            r.investment_amount_value = amount(r.investment_amount.as_ref());
            r.investment_ratio_value = ratio(r.investment_ratio.as_ref());
            r.investment_date_iso = iso(r.investment_date.as_ref());
            CrawlRecord::Shareholder(r)
        }
        CrawlRecord::LegalCase(mut r) => {
            r.case_amount_value = amount(r.case_amount.as_ref());
            r.case_date_iso = iso(r.case_date.as_ref());
            CrawlRecord::LegalCase(r)
        }
        CrawlRecord::IntellectualProperty(mut r) => {
            r.application_date_iso = iso(r.application_date.as_ref());
            r.authorization_date_iso = iso(r.authorization_date.as_ref());
            CrawlRecord::IntellectualProperty(r)
        }
        CrawlRecord::Bidding(mut r) => {
            r.project_amount_value = amount(r.project_amount.as_ref());
            r.winning_amount_value = amount(r.winning_amount.as_ref());
            r.publish_date_iso = iso(r.publish_date.as_ref());
            r.bidding_date_iso = iso(r.bidding_date.as_ref());
            CrawlRecord::Bidding(r)
        }
        CrawlRecord::AnnualReport(mut r) => {
            r.revenue_value = amount(r.revenue.as_ref());
            r.profit_value = amount(r.profit.as_ref());
            r.assets_value = amount(r.assets.as_ref());
            r.liabilities_value = amount(r.liabilities.as_ref());
            r.tax_amount_value = amount(r.tax_amount.as_ref());
            r.report_date_iso = iso(r.report_date.as_ref());
            CrawlRecord::AnnualReport(r)
        }
        CrawlRecord::ChangeRecord(mut r) => {
            r.change_date_iso = iso(r.change_date.as_ref());
            CrawlRecord::ChangeRecord(r)
        }
        CrawlRecord::Branch(mut r) => {
            r.establish_date_iso = iso(r.establish_date.as_ref());
            r.business_scope_list = scope_list(r.business_scope.as_ref());
            CrawlRecord::Branch(r)
        }
        CrawlRecord::RelatedCompany(mut r) => {
            r.investment_ratio_value = ratio(r.investment_ratio.as_ref());
            CrawlRecord::RelatedCompany(r)
        }
    }
}
