//! Rendered detail pages.
//!
//! Extraction is best-effort per field: a selector that matches nothing, or
//! matches only whitespace, leaves that one field `None`.

use crate::error::{ClientError, Result};
use async_trait::async_trait;
use registry_browser::{BrowserActions, BrowserEngine, SessionCookie};
use registry_core::CompanyRecord;
use registry_normalizer::clean_company_name;
use scraper::{Html, Selector};

/// Element that marks a fully rendered company detail page.
pub const DETAIL_READY_SELECTOR: &str = ".company-name";

const CAPTCHA_SELECTOR: &str = ".captcha-container";

/// Company fields found on a rendered detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DomCompanyFields {
    pub company_name: Option<String>,
    pub legal_person: Option<String>,
    pub register_capital: Option<String>,
    pub establish_date: Option<String>,
    pub status: Option<String>,
    pub credit_code: Option<String>,
    pub business_scope: Option<String>,
    pub register_address: Option<String>,
}

impl DomCompanyFields {
    /// Extract every known field from `html`.
    pub fn extract(html: &str) -> Self {
        let document = Html::parse_document(html);
        Self {
            company_name: text(&document, ".company-name"),
            legal_person: text(&document, ".legal-person"),
            register_capital: text(&document, ".register-capital"),
            establish_date: text(&document, ".establish-date"),
            status: text(&document, ".company-status"),
            credit_code: text(&document, ".credit-code"),
            business_scope: text(&document, ".business-scope"),
            register_address: text(&document, ".register-address"),
        }
    }

    /// Whether no field was found.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Write the fields that were found over `record`, leaving the others alone.
    pub fn overlay(self, record: &mut CompanyRecord) {
        fn put(slot: &mut Option<String>, value: Option<String>) {
            if value.is_some() {
                *slot = value;
            }
        }
        put(&mut record.company_name, self.company_name);
        put(&mut record.legal_person, self.legal_person);
        put(&mut record.register_capital, self.register_capital);
        put(&mut record.establish_date, self.establish_date);
        put(&mut record.status, self.status);
        put(&mut record.credit_code, self.credit_code);
        put(&mut record.business_scope, self.business_scope);
        put(&mut record.register_address, self.register_address);
    }
}

fn text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    let element = document.select(&selector).next()?;
    let raw: String = element.text().collect();
    let cleaned = clean_company_name(&raw);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Whether `html` is showing a captcha instead of content.
pub fn is_captcha_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    Selector::parse(CAPTCHA_SELECTOR)
        .map(|s| document.select(&s).next().is_some())
        .unwrap_or(false)
}

/// HTML of a page after client-side rendering.
#[derive(Debug, Clone)]
pub struct RenderedPage {
    /// URL after redirects
    pub final_url: String,
    pub html: String,
}

/// Something that can load a URL in a real browser and hand back the DOM.
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Load `url` with `cookies` installed and wait (bounded) for `ready_selector`.
    async fn render(
        &self,
        url: &str,
        cookies: &[SessionCookie],
        ready_selector: &str,
    ) -> Result<RenderedPage>;
}

#[async_trait]
impl PageRenderer for BrowserEngine {
    async fn render(
        &self,
        url: &str,
        cookies: &[SessionCookie],
        ready_selector: &str,
    ) -> Result<RenderedPage> {
        let tab = self.new_tab().await?;

        let rendered = async {
            if !cookies.is_empty() {
                tab.set_cookies(cookies).await?;
            }
            tab.navigate(url).await?;
            if let Err(e) = tab.wait_for_selector(ready_selector, self.render_timeout()).await {
                // Still return the DOM; extraction decides what is missing.
                tracing::debug!(url, "Ready selector did not appear: {}", e);
            }
            let html = tab.content().await?;
            let final_url = tab.current_url().await?.unwrap_or_else(|| url.to_string());
            Ok::<_, ClientError>(RenderedPage { final_url, html })
        }
        .await;

        if let Err(e) = tab.close().await {
            tracing::debug!("Failed to close tab: {}", e);
        }
        rendered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use registry_core::CompanyId;

    const DETAIL_HTML: &str = r#"
        <html><body>
          <h2 class="company-name">
              北京百度网讯科技有限公司
          </h2>
          <div class="legal-person">梁志祥</div>
          <div class="register-capital">1342128.000000万人民币</div>
          <div class="establish-date">2001-06-05</div>
          <div class="company-status">存续</div>
          <div class="credit-code">91110000802100433B</div>
          <div class="register-address">   </div>
        </body></html>
    "#;

    #[test]
    fn test_extract_found_and_missing_fields() {
        let fields = DomCompanyFields::extract(DETAIL_HTML);
        assert_eq!(fields.company_name.as_deref(), Some("北京百度网讯科技有限公司"));
        assert_eq!(fields.legal_person.as_deref(), Some("梁志祥"));
        assert_eq!(fields.register_capital.as_deref(), Some("1342128.000000万人民币"));
        assert_eq!(fields.credit_code.as_deref(), Some("91110000802100433B"));
        // absent and whitespace-only fields are omitted individually
        assert_eq!(fields.business_scope, None);
        assert_eq!(fields.register_address, None);
        assert!(!fields.is_empty());
    }

    #[test]
    fn test_overlay_keeps_unfound_fields() {
        let mut record = CompanyRecord::new(CompanyId::new("1").unwrap());
        record.business_scope = Some("from api".to_string());
        record.legal_person = Some("api person".to_string());

        DomCompanyFields::extract(DETAIL_HTML).overlay(&mut record);

        assert_eq!(record.business_scope.as_deref(), Some("from api"));
        assert_eq!(record.legal_person.as_deref(), Some("梁志祥"));
    }

    #[test]
    fn test_empty_page() {
        assert!(DomCompanyFields::extract("<html></html>").is_empty());
    }

    #[test]
    fn test_captcha_detection() {
        assert!(is_captcha_page(
            r#"<div class="captcha-container"><img src="x"></div>"#
        ));
        assert!(!is_captcha_page(DETAIL_HTML));
    }
}
