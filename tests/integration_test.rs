//! Integration tests for urlmin
//!
//! These tests drive the analyzer end to end with scripted renderers, and
//! exercise the HTTP renderer and API against local axum servers.

use async_trait::async_trait;
use axum::{extract::Query, response::Html, routing::get, Router};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use url::Url;
use urlmin::{
    analysis::{Analyzer, ContentNormalizer, HttpRenderer, RenderedPage, Renderer},
    config::{AnalysisConfig, HttpConfig, RendererConfig, SearchStrategyKind},
    http::HttpServer,
    store::{MemoryResultStore, ResultStore},
    AnalysisResult, AnalysisStatus, FetchError,
};

type Script = dyn Fn(&Url, u32) -> Result<RenderedPage, FetchError> + Send + Sync;

/// Renderer answering from a closure of (url, call number for that url)
struct ScriptedRenderer {
    script: Box<Script>,
    delay: Option<Duration>,
    calls: Mutex<HashMap<String, u32>>,
}

impl std::fmt::Debug for ScriptedRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedRenderer").finish_non_exhaustive()
    }
}

impl ScriptedRenderer {
    fn new(script: impl Fn(&Url, u32) -> Result<RenderedPage, FetchError> + Send + Sync + 'static) -> Self {
        Self {
            script: Box::new(script),
            delay: None,
            calls: Mutex::new(HashMap::new()),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self, url: &str) -> u32 {
        self.calls.lock().get(url).copied().unwrap_or(0)
    }

    fn total_calls(&self) -> u32 {
        self.calls.lock().values().sum()
    }
}

#[async_trait]
impl Renderer for ScriptedRenderer {
    async fn render(&self, url: &Url, _timeout: Duration) -> Result<RenderedPage, FetchError> {
        let call = {
            let mut calls = self.calls.lock();
            let count = calls.entry(url.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.script)(url, call)
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

fn html(body: &str) -> String {
    format!(
        "<html><head><title>Shop</title><script>var t = Date.now();</script></head>\
         <body><nav>Home | Products | Cart</nav><main>{}</main><footer>(c) Shop</footer></body></html>",
        body
    )
}

fn page(body: &str) -> Result<RenderedPage, FetchError> {
    Ok(RenderedPage::new(200, html(body)))
}

const PRODUCT: &str = "<h1>Blue Widget</h1><p>The best widget money can buy, hand made from recycled \
                       aluminium. Price 42 dollars. Ships worldwide within three days.</p>";
const LANDING: &str = "<h1>Welcome</h1><p>Browse our catalogue of gadgets, gizmos and other fine \
                       household things. New arrivals every week.</p>";

fn has(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(k, _)| k == name)
}

fn fast_config() -> AnalysisConfig {
    AnalysisConfig {
        max_concurrency: 4,
        max_requests_per_domain: 60_000,
        domain_burst: 1_000,
        max_request_retries: 2,
        retry_backoff_ms: 1,
        ..AnalysisConfig::default()
    }
}

fn analyzer(renderer: Arc<ScriptedRenderer>, config: AnalysisConfig) -> (Analyzer, Arc<MemoryResultStore>) {
    let store = Arc::new(MemoryResultStore::new());
    let analyzer = Analyzer::new(config, renderer, ContentNormalizer::default(), store.clone());
    (analyzer, store)
}

/// Content depends on `id` only
fn product_site() -> Arc<ScriptedRenderer> {
    Arc::new(ScriptedRenderer::new(|url, _| {
        if has(url, "id") {
            page(PRODUCT)
        } else {
            page(LANDING)
        }
    }))
}

const SCENARIO_A: &str = "https://example.com/page?id=123&utm_source=google&lang=en";

#[tokio::test]
async fn test_tracking_parameters_are_dropped() {
    let renderer = product_site();
    let (analyzer, store) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze(SCENARIO_A).await;

    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.required_params, vec!["id"]);
    assert_eq!(result.minimal_url, "https://example.com/page?id=123");
    assert_eq!(result.similarity_score, 1.0);
    assert_eq!(result.all_params.get("utm_source").map(String::as_str), Some("google"));
    assert_eq!(result.original_url, SCENARIO_A);
    assert_eq!(store.export_all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_all_parameters_required() {
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        match (has(url, "a"), has(url, "b")) {
            (true, true) => page(PRODUCT),
            (true, false) => page("<p>Category listing page</p>"),
            (false, true) => page("<p>Search results for nothing</p>"),
            (false, false) => page(LANDING),
        }
    }));
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let url = "https://shop.com/item?a=1&b=2";
    let result = analyzer.analyze(url).await;

    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.required_params, vec!["a", "b"]);
    assert_eq!(result.minimal_url, url);
}

#[tokio::test]
async fn test_baseline_unavailable_fetches_no_candidates() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| Err(FetchError::Transport("connection refused".into()))));
    let (analyzer, store) = analyzer(Arc::clone(&renderer), fast_config());

    let url = "https://down.example/page?a=1&b=2";
    let result = analyzer.analyze(url).await;

    assert_eq!(result.status, AnalysisStatus::Failed);
    assert!(result.error_message.as_deref().unwrap().starts_with("BaselineUnavailable"));
    assert_eq!(result.minimal_url, url);
    assert!(result.required_params.is_empty());
    assert_eq!(result.similarity_score, 0.0);

    // One attempt and two retries, all on the baseline
    assert_eq!(renderer.calls(url), 3);
    assert_eq!(renderer.total_calls(), 3);
    assert_eq!(store.export_all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_baseline_client_error_is_final() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| Ok(RenderedPage::new(404, "missing"))));
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze("https://a.com/?x=1").await;
    assert_eq!(result.status, AnalysisStatus::Failed);
    assert!(result.error_message.unwrap().contains("404"));
    assert_eq!(renderer.total_calls(), 1);
}

#[tokio::test]
async fn test_batch_keeps_input_order_and_isolates_failures() {
    let renderer = product_site();
    let (analyzer, store) = analyzer(Arc::clone(&renderer), fast_config());

    let urls = vec![
        "not a url".to_string(),
        SCENARIO_A.to_string(),
        "https://example.com/about".to_string(),
    ];
    let results = analyzer.analyze_batch(&urls).await;

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].original_url, "not a url");
    assert_eq!(results[0].status, AnalysisStatus::Failed);
    assert!(results[0].error_message.as_deref().unwrap().starts_with("MalformedURL"));

    assert_eq!(results[1].original_url, SCENARIO_A);
    assert_eq!(results[1].required_params, vec!["id"]);

    assert_eq!(results[2].status, AnalysisStatus::Success);
    assert!(results[2].required_params.is_empty());

    assert_eq!(store.export_all().unwrap().len(), 3);
}

#[tokio::test]
async fn test_zero_parameters_need_no_fetch() {
    let renderer = product_site();
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze("https://example.com/static/page.html").await;

    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.minimal_url, "https://example.com/static/page.html");
    assert!(result.required_params.is_empty());
    assert_eq!(renderer.total_calls(), 0);
}

#[tokio::test]
async fn test_same_responses_give_same_result() {
    let renderer = product_site();
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let first = analyzer.analyze(SCENARIO_A).await;
    let second = analyzer.analyze(SCENARIO_A).await;
    assert!(first.same_outcome(&second));
}

#[tokio::test]
async fn test_smaller_subset_wins_over_superset() {
    // {b} and every superset of it reproduce the page, as does {a, c}
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        if has(url, "b") || (has(url, "a") && has(url, "c")) {
            page(PRODUCT)
        } else {
            page(LANDING)
        }
    }));

    for _ in 0..5 {
        let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());
        let result = analyzer.analyze("https://x.com/p?a=1&b=2&c=3").await;
        assert_eq!(result.required_params, vec!["b"]);
        assert_eq!(result.minimal_url, "https://x.com/p?b=2");
    }
}

#[tokio::test]
async fn test_cardinality_beats_parameter_order() {
    // {a, b} and {c} both reproduce the page; {c} is smaller
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        if has(url, "c") || (has(url, "a") && has(url, "b")) {
            page(PRODUCT)
        } else {
            page(LANDING)
        }
    }));
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze("https://x.com/p?a=1&b=2&c=3").await;
    assert_eq!(result.required_params, vec!["c"]);
}

#[tokio::test]
async fn test_transient_candidate_failures_are_retried() {
    let renderer = Arc::new(ScriptedRenderer::new(|url, call| {
        if url.as_str() == "https://example.com/page?id=123" && call <= 2 {
            return Ok(RenderedPage::new(503, "busy"));
        }
        if has(url, "id") {
            page(PRODUCT)
        } else {
            page(LANDING)
        }
    }));
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze(SCENARIO_A).await;
    assert_eq!(result.required_params, vec!["id"]);
    assert_eq!(renderer.calls("https://example.com/page?id=123"), 3);
}

#[tokio::test]
async fn test_failed_candidates_count_as_non_matching() {
    // The id-only URL keeps failing, so the next best subset containing id wins
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        if url.as_str() == "https://example.com/page?id=123" {
            return Err(FetchError::Timeout(Duration::from_millis(10)));
        }
        if has(url, "id") {
            page(PRODUCT)
        } else {
            page(LANDING)
        }
    }));
    let (analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());

    let result = analyzer.analyze(SCENARIO_A).await;
    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.required_params, vec!["id", "utm_source"]);
    assert_eq!(renderer.calls("https://example.com/page?id=123"), 3);
}

#[tokio::test]
async fn test_threshold_controls_equivalence() {
    // Every page differs from the baseline by a visitor counter
    let renderer = Arc::new(ScriptedRenderer::new(|url, _| {
        let counter = url.query_pairs().count();
        if has(url, "id") {
            page(&format!("{} Visitors today: 10{}", PRODUCT, counter))
        } else {
            page(LANDING)
        }
    }));

    let strict = AnalysisConfig {
        similarity_threshold: 1.0,
        ..fast_config()
    };
    let (strict_analyzer, _) = analyzer(Arc::clone(&renderer), strict);
    let result = strict_analyzer.analyze(SCENARIO_A).await;
    assert_eq!(result.required_params, vec!["id", "utm_source", "lang"]);

    let (lenient_analyzer, _) = analyzer(Arc::clone(&renderer), fast_config());
    let result = lenient_analyzer.analyze(SCENARIO_A).await;
    assert_eq!(result.required_params, vec!["id"]);
    assert!(result.similarity_score >= 0.95 && result.similarity_score < 1.0);
}

#[tokio::test]
async fn test_greedy_strategy() {
    let renderer = product_site();
    let config = AnalysisConfig {
        strategy: SearchStrategyKind::Greedy,
        ..fast_config()
    };
    let (analyzer, _) = analyzer(Arc::clone(&renderer), config);

    let result = analyzer.analyze(SCENARIO_A).await;
    assert_eq!(result.status, AnalysisStatus::Success);
    assert_eq!(result.required_params, vec!["id"]);
}

#[tokio::test]
async fn test_bare_url_probe() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| page(PRODUCT)));
    let config = AnalysisConfig {
        probe_bare_url: true,
        ..fast_config()
    };
    let (analyzer, _) = analyzer(Arc::clone(&renderer), config);

    let result = analyzer.analyze("https://example.com/page?ref=mail&sid=99").await;
    assert!(result.required_params.is_empty());
    assert_eq!(result.minimal_url, "https://example.com/page");
}

#[tokio::test]
async fn test_url_deadline() {
    let renderer = Arc::new(ScriptedRenderer::new(|_, _| page(PRODUCT)).with_delay(Duration::from_secs(5)));
    let config = AnalysisConfig {
        url_deadline_secs: 1,
        ..fast_config()
    };
    let (analyzer, store) = analyzer(Arc::clone(&renderer), config);

    let result = analyzer.analyze("https://slow.example/?a=1").await;
    assert_eq!(result.status, AnalysisStatus::Failed);
    assert!(result.error_message.unwrap().starts_with("DeadlineExceeded"));
    assert_eq!(store.export_all().unwrap().len(), 1);
}

#[tokio::test]
async fn test_too_many_parameters() {
    let renderer = product_site();
    let config = AnalysisConfig {
        max_parameter_count: 3,
        ..fast_config()
    };
    let (analyzer, _) = analyzer(Arc::clone(&renderer), config);

    let result = analyzer.analyze("https://x.com/?a=1&b=2&c=3&d=4").await;
    assert_eq!(result.status, AnalysisStatus::Failed);
    assert!(result.error_message.unwrap().starts_with("TooManyParameters"));
    assert_eq!(renderer.total_calls(), 0);
}

// ============================================================================
// Against real HTTP servers
// ============================================================================

async fn product(Query(params): Query<HashMap<String, String>>) -> Html<String> {
    match params.get("id") {
        Some(id) => Html(html(&format!(
            "<h1>Product {id}</h1><p>Detailed description of product number {id}, \
             with specifications, reviews and shipping information.</p>"
        ))),
        None => Html(html(LANDING)),
    }
}

async fn spawn_site(router: Router) -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

fn http_analyzer() -> Analyzer {
    let renderer = HttpRenderer::new(RendererConfig::default()).unwrap();
    Analyzer::new(
        fast_config(),
        Arc::new(renderer),
        ContentNormalizer::default(),
        Arc::new(MemoryResultStore::new()),
    )
}

#[tokio::test]
async fn test_http_renderer_against_local_site() {
    let addr = spawn_site(Router::new().route("/product", get(product))).await;
    let analyzer = http_analyzer();

    let url = format!("http://{}/product?utm_source=news&id=7&ref=home", addr);
    let result = analyzer.analyze(&url).await;

    assert_eq!(result.status, AnalysisStatus::Success, "{:?}", result.error_message);
    assert_eq!(result.required_params, vec!["id"]);
    assert_eq!(result.minimal_url, format!("http://{}/product?id=7", addr));
}

#[tokio::test]
async fn test_http_renderer_reports_status() {
    let addr = spawn_site(Router::new().route("/product", get(product))).await;
    let renderer = HttpRenderer::new(RendererConfig::default()).unwrap();

    let missing = Url::parse(&format!("http://{}/nowhere", addr)).unwrap();
    let page = renderer.render(&missing, Duration::from_secs(5)).await.unwrap();
    assert_eq!(page.status, 404);

    let found = Url::parse(&format!("http://{}/product?id=1", addr)).unwrap();
    let page = renderer.render(&found, Duration::from_secs(5)).await.unwrap();
    assert_eq!(page.status, 200);
    assert!(page.body.contains("Product 1"));
}

async fn spawn_api(analyzer: Analyzer) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(
        HttpConfig {
            max_batch_size: 3,
            ..HttpConfig::default()
        },
        Arc::new(analyzer),
    );
    tokio::spawn(async move {
        server.serve(listener, std::future::pending()).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_api_endpoints() {
    let (analyzer, _) = analyzer(product_site(), fast_config());
    let base = spawn_api(analyzer).await;
    let client = reqwest::Client::new();

    let health: serde_json::Value = client.get(format!("{}/health", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(health["status"], "healthy");
    assert_eq!(health["version"], env!("CARGO_PKG_VERSION"));

    let root: serde_json::Value = client.get(&base).send().await.unwrap().json().await.unwrap();
    assert!(root["message"].is_string());

    let response = client
        .post(format!("{}/analyze", base))
        .json(&serde_json::json!({ "url": SCENARIO_A, "similarity_threshold": 0.9 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let result: AnalysisResult = response.json().await.unwrap();
    assert_eq!(result.required_params, vec!["id"]);

    let response = client
        .post(format!("{}/analyze-batch", base))
        .json(&serde_json::json!({ "urls": ["not a url", SCENARIO_A] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let results: Vec<AnalysisResult> = response.json().await.unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].status, AnalysisStatus::Failed);
    assert_eq!(results[1].status, AnalysisStatus::Success);

    let stored: Vec<AnalysisResult> = client.get(format!("{}/results", base)).send().await.unwrap().json().await.unwrap();
    assert_eq!(stored.len(), 3);
}

#[tokio::test]
async fn test_api_rejects_invalid_options() {
    let (analyzer, _) = analyzer(product_site(), fast_config());
    let base = spawn_api(analyzer).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/analyze", base))
        .json(&serde_json::json!({ "url": SCENARIO_A, "similarity_threshold": 2.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["code"], "INVALID_OPTIONS");

    let response = client
        .post(format!("{}/analyze-batch", base))
        .json(&serde_json::json!({ "urls": ["https://a.com/", "https://b.com/", "https://c.com/", "https://d.com/"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let error: serde_json::Value = response.json().await.unwrap();
    assert_eq!(error["code"], "BATCH_TOO_LARGE");
}
