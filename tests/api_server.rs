//! The HTTP API exercised over a real socket.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use webseccheck::analyzers::Analyzer;
use webseccheck::fetch::{Fetcher, HttpFetcher};
use webseccheck::initialization::init_client;
use webseccheck::payments::{ExternalReference, PaymentProvider, STATUS_APPROVED};
use webseccheck::{Config, ScanService};

use helpers::{count_rows, spawn_server, test_state, HangingAnalyzer, StubFetcher, StubProvider};

const ADMIN_SECRET: &str = "let-me-in";

fn client() -> reqwest::Client {
    reqwest::Client::new()
}

#[tokio::test]
async fn banner_and_health() {
    let (state, _) = test_state().await;
    let server = spawn_server(state).await;

    let banner: Value = client()
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(banner["status"], "ok");
    assert_eq!(banner["service"], "WebSecCheck API");
    assert!(banner["version"].is_string());

    let health: Value = client()
        .get(format!("{}/health", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health, json!({"status": "healthy"}));
}

#[tokio::test]
async fn scan_is_rate_limited_per_client() {
    let (state, sender) = test_state().await;
    let pool = Arc::clone(&state.pool);
    let notifier = Arc::clone(&state.notifier);
    let server = spawn_server(state).await;

    for i in 0..5u32 {
        let response = client()
            .post(format!("{}/scan", server.base_url))
            .header("X-Forwarded-For", "203.0.113.10")
            .json(&json!({"url": "example.com"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "30");
        assert_eq!(
            response.headers()["x-ratelimit-remaining"],
            (29 - i).to_string().as_str()
        );
        let report: Value = response.json().await.unwrap();
        assert_eq!(report["hostname"], "example.com");
        assert_eq!(report["url"], "https://example.com");
        assert_eq!(report["total_checks"], 3);
        assert_eq!(report["score"], 83);
        assert_eq!(report["grade"], "B");
    }

    let rejected = client()
        .post(format!("{}/scan", server.base_url))
        .header("X-Forwarded-For", "203.0.113.10")
        .json(&json!({"url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = rejected.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!(retry_after > 0);
    let body: Value = rejected.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("Rate limit"));

    // Another client is unaffected
    let other = client()
        .post(format!("{}/scan", server.base_url))
        .header("X-Forwarded-For", "203.0.113.11")
        .json(&json!({"url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);

    assert_eq!(count_rows(&pool, "scans").await, 6);
    notifier.shutdown().await;
    assert_eq!(sender.messages_to("ops@example.com").len(), 6);
}

#[tokio::test]
async fn bad_scan_input_is_400() {
    let (state, _) = test_state().await;
    let server = spawn_server(state).await;

    let response = client()
        .post(format!("{}/scan", server.base_url))
        .json(&json!({"url": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());

    let response = client()
        .post(format!("{}/scan", server.base_url))
        .header("Content-Type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

fn scanner_with(fetcher: Arc<dyn Fetcher>, analyzers: Vec<Arc<dyn Analyzer>>) -> ScanService {
    ScanService::new(fetcher, analyzers)
        .with_deadlines(Duration::from_millis(200), Duration::from_millis(200))
}

#[tokio::test]
async fn scan_timeouts_are_504_and_nothing_is_stored() {
    let (mut state, sender) = test_state().await;
    let pool = Arc::clone(&state.pool);
    let notifier = Arc::clone(&state.notifier);
    state.scanner = scanner_with(
        Arc::new(StubFetcher::slow(Duration::from_secs(30))),
        vec![Arc::new(HangingAnalyzer)],
    );
    let slow_fetch = spawn_server(state.clone()).await;

    let response = client()
        .post(format!("{}/scan", slow_fetch.base_url))
        .json(&json!({"url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());

    state.scanner = scanner_with(Arc::new(StubFetcher::new()), vec![Arc::new(HangingAnalyzer)]);
    let hung_checks = spawn_server(state).await;
    let response = client()
        .post(format!("{}/scan", hung_checks.base_url))
        .json(&json!({"url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

    assert_eq!(count_rows(&pool, "scans").await, 0);
    notifier.shutdown().await;
    assert!(sender.messages_to("ops@example.com").is_empty());
}

#[tokio::test]
async fn unreachable_target_is_502_and_nothing_is_stored() {
    let (mut state, _) = test_state().await;
    let pool = Arc::clone(&state.pool);
    let client_for_targets = init_client(&Config::default()).unwrap();
    state.scanner = ScanService::new(Arc::new(HttpFetcher::new(client_for_targets)), vec![]);
    let server = spawn_server(state).await;

    let response = client()
        .post(format!("{}/scan", server.base_url))
        .json(&json!({"url": "http://127.0.0.1:1/"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body: Value = response.json().await.unwrap();
    assert!(body["detail"].is_string());
    assert_eq!(count_rows(&pool, "scans").await, 0);
}

#[tokio::test]
async fn report_request_emails_a_working_link() {
    let (state, sender) = test_state().await;
    let notifier = Arc::clone(&state.notifier);
    let server = spawn_server(state).await;

    let response = client()
        .post(format!("{}/report", server.base_url))
        .json(&json!({"url": "example.com", "email": "not-an-email"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client()
        .post(format!("{}/report", server.base_url))
        .json(&json!({"url": "example.com", "email": "ana@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["status"], "queued");
    assert!(body["message"].as_str().unwrap().contains("ana@example.com"));

    notifier.shutdown().await;
    let emails = sender.messages_to("ana@example.com");
    assert_eq!(emails.len(), 1);
    let html = &emails[0].html;
    let start = html.find("/report/").expect("report link") + "/report/".len();
    let token: String = html[start..]
        .chars()
        .take_while(|c| c.is_ascii_hexdigit())
        .collect();
    assert_eq!(token.len(), 48);

    let response = client()
        .get(format!("{}/report/{token}", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let scan: Value = response.json().await.unwrap();
    assert_eq!(scan["hostname"], "example.com");
    assert_eq!(scan["checks"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn static_reports_and_lookup_errors() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("report-demo.html"),
        "<html><body>Demo report</body></html>",
    )
    .unwrap();

    let (state, _) = test_state().await;
    let server = spawn_server(state.with_static_dir(dir.path())).await;

    let response = client()
        .get(format!("{}/report-demo", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"]
        .to_str()
        .unwrap()
        .starts_with("text/html"));
    assert!(response.text().await.unwrap().contains("Demo report"));

    let response = client()
        .get(format!("{}/report/demo", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client()
        .get(format!("{}/report/bad.name", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client()
        .get(format!("{}/report/unknown-report", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn admin_requires_the_configured_secret() {
    let (state, _) = test_state().await;
    let unconfigured = spawn_server(state.clone()).await;
    let response = client()
        .get(format!("{}/admin/scans", unconfigured.base_url))
        .header("X-Admin-Secret", "anything")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let server = spawn_server(state.with_admin_secret(Some(ADMIN_SECRET.to_string()))).await;
    for path in [
        "/admin/scans",
        "/admin/scans/1",
        "/admin/reports",
        "/admin/payments",
        "/admin/stats",
    ] {
        let missing = client()
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::FORBIDDEN, "{path}");

        let wrong = client()
            .get(format!("{}{path}", server.base_url))
            .header("X-Admin-Secret", "nope")
            .send()
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::FORBIDDEN, "{path}");
    }
}

#[tokio::test]
async fn admin_checks_the_secret_before_parsing_the_request() {
    let (state, _) = test_state().await;
    let server = spawn_server(state.with_admin_secret(Some(ADMIN_SECRET.to_string()))).await;

    for path in ["/admin/scans/abc", "/admin/scans?page=x", "/admin/reports?limit=-"] {
        let anonymous = client()
            .get(format!("{}{path}", server.base_url))
            .send()
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::FORBIDDEN, "{path}");

        let admin = client()
            .get(format!("{}{path}", server.base_url))
            .header("X-Admin-Secret", ADMIN_SECRET)
            .send()
            .await
            .unwrap();
        assert_eq!(admin.status(), StatusCode::BAD_REQUEST, "{path}");
        let body: Value = admin.json().await.unwrap();
        assert!(body["detail"].is_string(), "{path}");
    }
}

#[tokio::test]
async fn admin_lists_scans_with_pagination_and_filter() {
    let (state, _) = test_state().await;
    let server = spawn_server(state.with_admin_secret(Some(ADMIN_SECRET.to_string()))).await;

    for url in ["alpha.example.com", "beta.example.com", "alpha.example.org"] {
        let response = client()
            .post(format!("{}/scan", server.base_url))
            .json(&json!({ "url": url }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let page: Value = client()
        .get(format!("{}/admin/scans?page=1&limit=2", server.base_url))
        .header("X-Admin-Secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(page["total"], 3);
    assert_eq!(page["page"], 1);
    assert_eq!(page["limit"], 2);
    assert_eq!(page["items"].as_array().unwrap().len(), 2);
    // Newest first
    assert_eq!(page["items"][0]["hostname"], "alpha.example.org");

    let filtered: Value = client()
        .get(format!("{}/admin/scans?hostname=alpha", server.base_url))
        .header("X-Admin-Secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(filtered["total"], 2);

    let id = page["items"][0]["id"].as_i64().unwrap();
    let one = client()
        .get(format!("{}/admin/scans/{id}", server.base_url))
        .header("X-Admin-Secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(one.status(), StatusCode::OK);

    let missing = client()
        .get(format!("{}/admin/scans/999999", server.base_url))
        .header("X-Admin-Secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let stats: Value = client()
        .get(format!("{}/admin/stats", server.base_url))
        .header("X-Admin-Secret", ADMIN_SECRET)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_scans"], 3);
    assert_eq!(stats["conversion_rate"], 0.0);
}

#[tokio::test]
async fn track_records_page_views() {
    let (state, _) = test_state().await;
    let pool = Arc::clone(&state.pool);
    let server = spawn_server(state).await;

    let response = client()
        .post(format!("{}/track", server.base_url))
        .json(&json!({"path": "/pricing", "referrer": "https://search.example"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = client()
        .post(format!("{}/track", server.base_url))
        .json(&json!({"referrer": "https://search.example"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(count_rows(&pool, "page_views").await, 1);
}

#[tokio::test]
async fn checkout_needs_a_provider() {
    let (state, _) = test_state().await;
    let server = spawn_server(state).await;

    let response = client()
        .post(format!("{}/checkout", server.base_url))
        .json(&json!({"url": "example.com", "email": "ana@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn checkout_creates_a_pending_payment() {
    let (state, _) = test_state().await;
    let pool = Arc::clone(&state.pool);
    let provider = Arc::new(StubProvider::default());
    let server =
        spawn_server(state.with_payment_provider(provider.clone() as Arc<dyn PaymentProvider>))
            .await;

    let response = client()
        .post(format!("{}/checkout", server.base_url))
        .json(&json!({"url": "example.com", "email": "ana@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["checkout_url"], "https://pay.example.com/checkout/pref-1");
    let reference = ExternalReference::parse(body["external_reference"].as_str().unwrap()).unwrap();
    assert_eq!(reference.email, "ana@example.com");
    assert_eq!(reference.url, "https://example.com");

    assert_eq!(provider.checkouts.lock().unwrap().len(), 1);
    assert_eq!(count_rows(&pool, "payments").await, 1);

    let response = client()
        .post(format!("{}/checkout", server.base_url))
        .json(&json!({"url": "example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unreachable_provider_is_502() {
    let (state, _) = test_state().await;
    let provider = Arc::new(StubProvider {
        fail_checkout: true,
        ..Default::default()
    });
    let server = spawn_server(state.with_payment_provider(provider as Arc<dyn PaymentProvider>)).await;

    let response = client()
        .post(format!("{}/checkout", server.base_url))
        .json(&json!({"url": "example.com", "email": "ana@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn webhook_always_answers_200() {
    let (state, sender) = test_state().await;
    let notifier = Arc::clone(&state.notifier);
    let provider = Arc::new(StubProvider::default());
    let reference = ExternalReference::new("ana@example.com", "https://example.com").encode();
    provider.set_payment("77", STATUS_APPROVED, &reference);
    let server =
        spawn_server(state.with_payment_provider(provider as Arc<dyn PaymentProvider>)).await;

    let garbage = client()
        .post(format!("{}/webhooks/payment", server.base_url))
        .body("definitely not json")
        .send()
        .await
        .unwrap();
    assert_eq!(garbage.status(), StatusCode::OK);
    let body: Value = garbage.json().await.unwrap();
    assert_eq!(body["status"], "ignored");

    let mut statuses = Vec::new();
    for _ in 0..2 {
        let response = client()
            .post(format!(
                "{}/webhooks/payment?type=payment&data.id=77",
                server.base_url
            ))
            .json(&json!({"type": "payment", "data": {"id": "77"}}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = response.json().await.unwrap();
        statuses.push(body["status"].as_str().unwrap().to_string());
    }
    assert_eq!(statuses, vec!["fulfilled", "unchanged"]);

    let unknown = client()
        .post(format!(
            "{}/webhooks/payment?type=payment&data.id=404",
            server.base_url
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), StatusCode::OK);
    let body: Value = unknown.json().await.unwrap();
    assert_eq!(body["status"], "error");

    notifier.shutdown().await;
    assert_eq!(sender.messages_to("ana@example.com").len(), 1);
}

#[tokio::test]
async fn cors_preflight_is_answered() {
    let (state, _) = test_state().await;
    let server = spawn_server(state).await;

    let response = client()
        .request(reqwest::Method::OPTIONS, format!("{}/scan", server.base_url))
        .header("Origin", "https://webseccheck.example")
        .header("Access-Control-Request-Method", "POST")
        .header("Access-Control-Request-Headers", "content-type")
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    assert_eq!(response.headers()["access-control-allow-headers"], "*");
    let methods = response.headers()["access-control-allow-methods"]
        .to_str()
        .unwrap()
        .to_string();
    assert!(methods.contains("POST"));
}

#[tokio::test]
async fn cross_origin_responses_expose_rate_limit_headers() {
    let (state, _) = test_state().await;
    let server = spawn_server(state).await;

    let response = client()
        .get(format!("{}/health", server.base_url))
        .header("Origin", "https://webseccheck.example")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let exposed = response.headers()["access-control-expose-headers"]
        .to_str()
        .unwrap()
        .to_lowercase();
    assert!(exposed.contains("x-ratelimit-remaining"));
    assert!(exposed.contains("retry-after"));
}
