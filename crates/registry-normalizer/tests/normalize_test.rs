use chrono::NaiveDate;
use registry_core::{
    AnnualReport, CompanyId, CompanyRecord, CrawlRecord, Shareholder,
};
use registry_normalizer::normalize;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

fn company_id() -> CompanyId {
    CompanyId::new("29453261288626").unwrap()
}

#[test]
fn test_company_derivations_keep_raw_fields() {
    let mut company = CompanyRecord::new(company_id());
    company.company_name = Some("北京百度网讯科技有限公司".to_string());
    company.register_capital = Some("注册资本 500万元".to_string());
    company.establish_date = Some("2001年6月5日".to_string());
    company.status = Some("存续".to_string());
    company.business_scope = Some("技术开发；技术咨询、软件销售".to_string());

    let CrawlRecord::Company(normalized) = normalize(CrawlRecord::Company(company), today()) else {
        panic!("kind changed");
    };

    assert_eq!(normalized.register_capital.as_deref(), Some("注册资本 500万元"));
    assert_eq!(normalized.register_capital_amount, Some(5_000_000.0));
    assert_eq!(normalized.establish_date.as_deref(), Some("2001年6月5日"));
    assert_eq!(normalized.establish_date_iso.as_deref(), Some("2001-06-05"));
    assert_eq!(
        normalized.business_scope_list,
        vec!["技术开发", "技术咨询", "软件销售"]
    );
    // 60 base + 15 capital + 15 active + 10 age
    assert_eq!(normalized.company_score, Some(100));
}

#[test]
fn test_unparseable_fields_stay_absent() {
    let mut company = CompanyRecord::new(company_id());
    company.register_capital = Some("未公开".to_string());
    company.establish_date = Some("未知".to_string());
    company.register_capital_amount = Some(1.0);

    let CrawlRecord::Company(normalized) = normalize(CrawlRecord::Company(company), today()) else {
        panic!("kind changed");
    };

    assert_eq!(normalized.register_capital.as_deref(), Some("未公开"));
    assert_eq!(normalized.register_capital_amount, None);
    assert_eq!(normalized.establish_date_iso, None);
    assert!(normalized.business_scope_list.is_empty());
    assert_eq!(normalized.company_score, Some(60));
}

#[test]
fn test_shareholder_derivations() {
    let shareholder = Shareholder {
        company_id: company_id(),
        shareholder_name: "李彦宏".to_string(),
        shareholder_type: Some("自然人股东".to_string()),
        investment_amount: Some("1,000万人民币".to_string()),
        investment_amount_value: None,
        investment_ratio: Some("35.5%".to_string()),
        investment_ratio_value: None,
        investment_date: Some("2006/01/25".to_string()),
        investment_date_iso: None,
        platform: "aiqicha".to_string(),
        crawl_time: 1,
    };

    let CrawlRecord::Shareholder(normalized) =
        normalize(CrawlRecord::Shareholder(shareholder), today())
    else {
        panic!("kind changed");
    };

    assert_eq!(normalized.investment_amount_value, Some(10_000_000.0));
    assert_eq!(normalized.investment_ratio_value, Some(35.5));
    assert_eq!(normalized.investment_date_iso.as_deref(), Some("2006-01-25"));
}

#[test]
fn test_annual_report_amounts() {
    let report = AnnualReport {
        company_id: company_id(),
        report_year: "2022".to_string(),
        report_type: None,
        report_status: None,
        report_date: Some("2023-06-30".to_string()),
        report_date_iso: None,
        revenue: Some("2亿".to_string()),
        revenue_value: None,
        profit: Some("企业选择不公示".to_string()),
        profit_value: None,
        assets: Some("3千万".to_string()),
        assets_value: None,
        liabilities: None,
        liabilities_value: None,
        employee_count: Some(120),
        tax_amount: Some("15.5万".to_string()),
        tax_amount_value: None,
        platform: "aiqicha".to_string(),
        crawl_time: 1,
    };

    let CrawlRecord::AnnualReport(normalized) =
        normalize(CrawlRecord::AnnualReport(report), today())
    else {
        panic!("kind changed");
    };

    assert_eq!(normalized.revenue_value, Some(200_000_000.0));
    assert_eq!(normalized.profit_value, None);
    // 万 is checked before 千
    assert_eq!(normalized.assets_value, Some(30_000.0));
    assert_eq!(normalized.liabilities_value, None);
    assert_eq!(normalized.tax_amount_value, Some(155_000.0));
    assert_eq!(normalized.report_date_iso.as_deref(), Some("2023-06-30"));
}
