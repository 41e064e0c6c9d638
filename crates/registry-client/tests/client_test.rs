use async_trait::async_trait;
use registry_browser::SessionCookie;
use registry_client::{
    ClientError, PageRenderer, PlatformApi, PlatformClient, RenderedPage, SearchQuery,
};
use registry_core::{ClientConfig, CompanyId, DetailSourceKind};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zeroize::Zeroizing;

fn config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        base_url: server.uri(),
        jitter_min_ms: 0,
        jitter_max_ms: 0,
        max_retries: 2,
        retry_delay_ms: 10,
        ..ClientConfig::default()
    }
}

fn client(server: &MockServer) -> PlatformClient {
    PlatformClient::connect(config(server), None, None).expect("client")
}

fn ok(data: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({"errno": 0, "errmsg": "", "data": data}))
}

fn id(raw: &str) -> CompanyId {
    CompanyId::new(raw).unwrap()
}

#[tokio::test]
async fn test_search_sends_params_and_parses_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "百度"))
        .and(query_param("p", "2"))
        .and(query_param("size", "10"))
        .respond_with(ok(json!({
            "total": 2,
            "items": [{"id": "111", "name": "甲"}, {"pid": 222, "entName": "乙"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .search_company(&SearchQuery::new("百度", 2, 10))
        .await
        .expect("search");

    assert_eq!(page.total, Some(2));
    let ids: Vec<_> = page.items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["111", "222"]);
}

#[tokio::test]
async fn test_session_cookie_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(wiremock::matchers::header("cookie", "BDUSS=abc"))
        .respond_with(ok(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let credential = Zeroizing::new("BDUSS=abc".to_string());
    let client = PlatformClient::connect(config(&server), Some(&credential), None).unwrap();
    let page = client
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .expect("search");
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_nonzero_errno_is_data_fetch_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"errno": 2001, "errmsg": "busy"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server)
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::DataFetch(ref m) if m.contains("2001")));
}

#[tokio::test]
async fn test_detail_errno_mapping() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/company/detail"))
        .and(query_param("id", "404404"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 1004})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/company/detail"))
        .and(query_param("id", "403403"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errno": 403})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.get_company_detail(&id("404404")).await,
        Err(ClientError::CompanyNotFound(_))
    ));
    assert!(matches!(
        client.get_company_detail(&id("403403")).await,
        Err(ClientError::Permission(_))
    ));
}

#[tokio::test]
async fn test_detail_from_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/company/detail"))
        .and(query_param("id", "123"))
        .respond_with(ok(json!({
            "company_name": "测试科技有限公司",
            "register_capital": "500万人民币",
            "status": "存续",
            "phone": 1234567
        })))
        .mount(&server)
        .await;

    let company = client(&server)
        .get_company_detail(&id("123"))
        .await
        .expect("detail");

    assert_eq!(company.company_id.as_str(), "123");
    assert_eq!(company.company_name.as_deref(), Some("测试科技有限公司"));
    assert_eq!(company.register_capital.as_deref(), Some("500万人民币"));
    assert_eq!(company.phone.as_deref(), Some("1234567"));
    assert_eq!(company.platform, "aiqicha");
    assert!(company.crawl_time > 0);
    assert_eq!(
        company.source_url,
        Some(format!("{}/company_detail_123", server.uri()))
    );
    // derived fields are left to the normalizer
    assert_eq!(company.register_capital_amount, None);
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ok(json!({"items": [{"id": "1"}]})))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .expect("retried search");
    assert_eq!(page.items.len(), 1);
}

#[tokio::test]
async fn test_rate_limit_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ok(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let page = client(&server)
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .expect("search after rate limit");
    assert!(page.is_empty());
}

#[tokio::test]
async fn test_long_retry_after_is_capped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "86400"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ok(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let started = std::time::Instant::now();
    let page = tokio::time::timeout(
        std::time::Duration::from_secs(10),
        client(&server).search_company(&SearchQuery::new("x", 1, 20)),
    )
    .await
    .expect("Retry-After wait is bounded")
    .expect("search after rate limit");

    assert!(page.is_empty());
    // retry_delay 10ms x3 x2 retries
    assert!(started.elapsed() >= std::time::Duration::from_millis(60));
}

#[tokio::test]
async fn test_retries_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let err = client(&server)
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Network { status: Some(503), .. }));
}

#[tokio::test]
async fn test_sub_entity_failure_yields_empty_list() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/company/shareholders"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/company/related"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.get_shareholders(&id("1")).await.is_empty());
    assert!(client.get_related_companies(&id("1")).await.is_empty());
}

#[tokio::test]
async fn test_sub_entities_decode_with_aliases() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/company/shareholders"))
        .and(query_param("id", "77"))
        .respond_with(ok(json!({"list": [
            {"name": "张三", "investment_ratio": "60%"},
            {"shareholder_name": "李四"},
            {"investment_ratio": "10%"}
        ]})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/company/legal_cases"))
        .and(query_param("page", "2"))
        .respond_with(ok(json!([{"caseId": "C-9", "case_title": "合同纠纷"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/company/related"))
        .respond_with(ok(json!({"items": [{"pid": 555, "entName": "子公司", "company_id": "999"}]})))
        .mount(&server)
        .await;

    let client = client(&server);

    let holders = client.get_shareholders(&id("77")).await;
    assert_eq!(holders.len(), 2);
    assert_eq!(holders[0].shareholder_name, "张三");
    assert_eq!(holders[0].company_id.as_str(), "77");

    let cases = client.get_legal_cases(&id("77"), 2).await;
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].case_id, "C-9");

    let related = client.get_related_companies(&id("77")).await;
    assert_eq!(related.len(), 1);
    assert_eq!(related[0].related_company_id, "555");
    assert_eq!(related[0].related_company_name.as_deref(), Some("子公司"));
    assert_eq!(related[0].company_id.as_str(), "77");
}

#[tokio::test]
async fn test_pong() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>home</html>"))
        .mount(&server)
        .await;
    assert!(client(&server).pong().await);

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("Location", format!("{}/login", server.uri())),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    assert!(!client(&server).pong().await);
}

#[tokio::test]
async fn test_with_credential_keeps_settings() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(wiremock::matchers::header("cookie", "BDUSS=new"))
        .respond_with(ok(json!({"items": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server)
        .with_credential(&Zeroizing::new("BDUSS=new".to_string()))
        .unwrap();
    client
        .search_company(&SearchQuery::new("x", 1, 20))
        .await
        .expect("search");
}

/// Serves one fixed detail page without a browser.
struct FixedPage;

#[async_trait]
impl PageRenderer for FixedPage {
    async fn render(
        &self,
        url: &str,
        _cookies: &[SessionCookie],
        _ready_selector: &str,
    ) -> registry_client::Result<RenderedPage> {
        Ok(RenderedPage {
            final_url: url.to_string(),
            html: r#"<div class="company-name">测试科技有限公司</div>"#.to_string(),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn test_dom_detail_waits_for_jitter() {
    let config = ClientConfig {
        detail_source: DetailSourceKind::Dom,
        jitter_min_ms: 1000,
        jitter_max_ms: 1000,
        ..ClientConfig::default()
    };
    let renderer: Arc<dyn PageRenderer> = Arc::new(FixedPage);
    let client = PlatformClient::connect(config, None, Some(renderer)).unwrap();

    let started = tokio::time::Instant::now();
    let company = client.get_company_detail(&id("123")).await.expect("dom detail");

    assert_eq!(company.company_name.as_deref(), Some("测试科技有限公司"));
    assert!(started.elapsed() >= std::time::Duration::from_millis(1000));
}
