use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use tabguard::{build_router, BridgeState, Config, Gate};
use tabguard_core_types::{ClassificationRequest, Verdict};
use tabguard_gate::SettleOutcome;
use tabguard_oracle::{OracleClient, OracleError};

/// Blocks any page whose sample mentions games.
#[derive(Default)]
struct KeywordOracle {
    calls: AtomicUsize,
}

#[async_trait]
impl OracleClient for KeywordOracle {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Verdict {
            should_block: request.content.to_lowercase().contains("games"),
        })
    }
}

struct Harness {
    app: Router,
    gate: Arc<Gate>,
    oracle: Arc<KeywordOracle>,
}

impl Harness {
    fn new() -> Self {
        let oracle = Arc::new(KeywordOracle::default());
        let gate = Arc::new(Gate::start(&Config::default(), oracle.clone()));
        let app = build_router(BridgeState::new(gate.clone()), true);
        Self { app, gate, oracle }
    }

    async fn call(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    async fn post(&self, uri: &str, body: Value) -> StatusCode {
        self.call(Method::POST, uri, Some(body)).await.0
    }

    async fn sample(&self, tab: u64, url: &str, text: &str) {
        let uri = format!("/v1/tabs/{tab}/content");
        assert_eq!(
            self.post(&uri, json!({ "url": url, "text": text })).await,
            StatusCode::NO_CONTENT
        );
    }

    async fn load(&self, tab: u64, url: &str) {
        let uri = format!("/v1/tabs/{tab}/updated");
        assert_eq!(
            self.post(&uri, json!({ "status": "loading", "url": url }))
                .await,
            StatusCode::ACCEPTED
        );
        assert_eq!(
            self.post(&uri, json!({ "status": "complete", "url": url }))
                .await,
            StatusCode::ACCEPTED
        );
    }

    async fn directives(&self) -> Vec<Value> {
        let (status, body) = self.call(Method::GET, "/v1/directives", None).await;
        assert_eq!(status, StatusCode::OK);
        body.as_array().cloned().unwrap_or_default()
    }
}

#[tokio::test]
async fn health_reports_ok() {
    let harness = Harness::new();
    let (status, body) = harness.call(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
    harness.gate.shutdown();
}

#[tokio::test(start_paused = true)]
async fn blocked_page_yields_one_directive() {
    let harness = Harness::new();
    harness
        .sample(7, "https://game-site.com", "Play now! Free games")
        .await;
    harness.load(7, "https://game-site.com").await;

    tokio::time::sleep(Duration::from_secs(6)).await;

    let directives = harness.directives().await;
    assert_eq!(directives.len(), 1);
    assert_eq!(directives[0]["tab"], json!(7));
    assert_eq!(directives[0]["target"], json!("tabguard://blocked"));
    assert!(harness.directives().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn allowed_page_is_served_from_cache_on_reload() {
    let harness = Harness::new();
    harness
        .sample(3, "https://example.com/docs", "API reference")
        .await;

    harness.load(3, "https://example.com/docs").await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    harness.load(3, "https://example.com/docs").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert!(harness.directives().await.is_empty());
    assert_eq!(harness.oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn closing_a_tab_cancels_its_window() {
    let harness = Harness::new();
    harness
        .sample(9, "https://game-site.com", "Free games")
        .await;
    harness.load(9, "https://game-site.com").await;
    tokio::time::sleep(Duration::from_secs(1)).await;

    let (status, _) = harness
        .call(Method::POST, "/v1/tabs/9/removed", None)
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(harness.oracle.calls.load(Ordering::SeqCst), 0);
    assert!(harness.directives().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn previous_page_text_is_not_classified_for_the_next_page() {
    let harness = Harness::new();
    let mut reports = harness.gate.subscribe_reports();
    harness
        .sample(2, "https://game-site.com", "Play free games")
        .await;
    harness.load(2, "https://game-site.com").await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(harness.directives().await.len(), 1);
    reports.recv().await.unwrap();

    // Same tab moves on before the extension posts text for the new page.
    harness.load(2, "https://docs.rs").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(
        reports.recv().await.unwrap().outcome,
        SettleOutcome::ExtractionFailed
    );
    assert_eq!(harness.oracle.calls.load(Ordering::SeqCst), 1);
    assert!(harness.directives().await.is_empty());
    assert_eq!(
        harness
            .gate
            .orchestrator()
            .cache()
            .lookup("https://docs.rs")
            .decision(),
        None
    );
}

#[tokio::test(start_paused = true)]
async fn untagged_text_does_not_survive_a_load_start() {
    let harness = Harness::new();
    let mut reports = harness.gate.subscribe_reports();
    harness.load(5, "https://game-site.com").await;
    harness
        .post("/v1/tabs/5/content", json!({ "text": "Play free games" }))
        .await;
    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(harness.directives().await.len(), 1);
    reports.recv().await.unwrap();

    harness.load(5, "https://docs.rs").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(
        reports.recv().await.unwrap().outcome,
        SettleOutcome::ExtractionFailed
    );
    assert_eq!(harness.oracle.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unpolled_redirect_is_dropped_when_the_tab_navigates() {
    let harness = Harness::new();
    harness
        .sample(2, "https://game-site.com", "Play free games")
        .await;
    harness.load(2, "https://game-site.com").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    let status = harness
        .post(
            "/v1/tabs/2/updated",
            json!({ "status": "loading", "url": "https://docs.rs" }),
        )
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(harness.directives().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn missing_sample_fails_open() {
    let harness = Harness::new();
    harness.load(4, "https://game-site.com").await;
    tokio::time::sleep(Duration::from_secs(6)).await;

    assert_eq!(harness.oracle.calls.load(Ordering::SeqCst), 0);
    assert!(harness.directives().await.is_empty());
}

#[tokio::test]
async fn events_after_shutdown_are_rejected() {
    let harness = Harness::new();
    harness.gate.shutdown();
    let status = harness
        .post(
            "/v1/tabs/1/updated",
            json!({ "status": "complete", "url": "https://example.com" }),
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn preflight_is_allowed_from_any_origin() {
    let harness = Harness::new();
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/v1/tabs/1/content")
        .header("origin", "moz-extension://abc")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .map(|value| value.to_str().unwrap()),
        Some("*")
    );
    harness.gate.shutdown();
}
