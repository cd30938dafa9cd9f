use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tabguard_core_types::{ClassificationRequest, NavigationEvent, TabId, Verdict};
use tabguard_decision_cache::DecisionCache;
use tabguard_gate::{
    handle_event, ContentExtractor, ExtractionError, GateConfig, Orchestrator, Redirector,
    SettleOutcome,
};
use tabguard_oracle::{OracleClient, OracleError};
use tabguard_scheduler::DebounceRegistry;
use tokio::time::sleep;

/// Oracle answering from a per-URL table; URLs listed in `failing` error out.
#[derive(Default)]
struct TableOracle {
    answers: HashMap<String, bool>,
    failing: Mutex<Vec<String>>,
    calls: Mutex<Vec<ClassificationRequest>>,
}

#[async_trait]
impl OracleClient for TableOracle {
    async fn classify(&self, request: &ClassificationRequest) -> Result<Verdict, OracleError> {
        self.calls.lock().push(request.clone());
        if self.failing.lock().contains(&request.url) {
            return Err(OracleError::Transport("connection refused".to_string()));
        }
        self.answers
            .get(&request.url)
            .map(|block| Verdict {
                should_block: *block,
            })
            .ok_or_else(|| OracleError::Response("unknown url".to_string()))
    }
}

#[derive(Default)]
struct PageText(Mutex<HashMap<TabId, String>>);

#[async_trait]
impl ContentExtractor for PageText {
    async fn extract(&self, tab: TabId, _url: &str) -> Result<String, ExtractionError> {
        self.0
            .lock()
            .get(&tab)
            .cloned()
            .ok_or(ExtractionError::Unavailable(tab))
    }
}

#[derive(Default)]
struct Redirects(Mutex<Vec<(TabId, String)>>);

impl Redirector for Redirects {
    fn redirect(&self, tab: TabId, target: &str) {
        self.0.lock().push((tab, target.to_string()));
    }
}

struct World {
    orchestrator: Arc<Orchestrator>,
    oracle: Arc<TableOracle>,
    pages: Arc<PageText>,
    redirects: Arc<Redirects>,
}

impl World {
    fn new() -> Self {
        let mut answers = HashMap::new();
        answers.insert("https://example.com/docs".to_string(), false);
        answers.insert("https://game-site.com".to_string(), true);
        let oracle = Arc::new(TableOracle {
            answers,
            ..TableOracle::default()
        });
        let pages = Arc::new(PageText::default());
        let redirects = Arc::new(Redirects::default());
        let orchestrator = Orchestrator::new(
            Arc::new(DecisionCache::default()),
            Arc::new(DebounceRegistry::new()),
            oracle.clone(),
            pages.clone(),
            redirects.clone(),
            GateConfig::default(),
        );
        Self {
            orchestrator,
            oracle,
            pages,
            redirects,
        }
    }

    fn show(&self, tab: TabId, text: &str) {
        self.pages.0.lock().insert(tab, text.to_string());
    }

    fn send(&self, event: NavigationEvent) {
        handle_event(&self.orchestrator, event).expect("adapter accepts event");
    }

    fn load(&self, tab: TabId, url: &str) {
        self.send(NavigationEvent::loading(tab, url));
        self.send(NavigationEvent::complete(tab, url));
    }

    fn oracle_calls(&self) -> usize {
        self.oracle.calls.lock().len()
    }
}

const TAB: TabId = TabId(42);

#[tokio::test(start_paused = true)]
async fn scenario_a_allowed_page_is_cached() {
    let world = World::new();
    let mut reports = world.orchestrator.subscribe();
    world.show(TAB, "API reference");
    world.load(TAB, "https://example.com/docs");

    sleep(Duration::from_millis(5_100)).await;

    let report = reports.recv().await.unwrap();
    assert_eq!(report.outcome, SettleOutcome::Classified { blocked: false });
    assert!(world.redirects.0.lock().is_empty());
    assert_eq!(world.oracle.calls.lock()[0].content, "API reference");
    assert_eq!(
        world
            .orchestrator
            .cache()
            .lookup("https://example.com/docs")
            .decision(),
        Some(false)
    );
}

#[tokio::test(start_paused = true)]
async fn scenario_b_reload_within_ttl_uses_cache() {
    let world = World::new();
    let mut reports = world.orchestrator.subscribe();
    world.show(TAB, "API reference");

    world.load(TAB, "https://example.com/docs");
    sleep(Duration::from_secs(6)).await;
    assert_eq!(world.oracle_calls(), 1);

    sleep(Duration::from_secs(30 * 60)).await;
    world.load(TAB, "https://example.com/docs");
    sleep(Duration::from_secs(6)).await;

    reports.recv().await.unwrap();
    let second = reports.recv().await.unwrap();
    assert_eq!(second.outcome, SettleOutcome::CacheHit { blocked: false });
    assert_eq!(world.oracle_calls(), 1);
    assert!(world.redirects.0.lock().is_empty());
}

#[tokio::test(start_paused = true)]
async fn scenario_c_blocked_page_redirects() {
    let world = World::new();
    world.show(TAB, "Play now! Free games");
    world.load(TAB, "https://game-site.com");

    sleep(Duration::from_secs(6)).await;

    assert_eq!(
        world.redirects.0.lock().as_slice(),
        &[(TAB, "tabguard://blocked".to_string())]
    );
    assert_eq!(
        world
            .orchestrator
            .cache()
            .lookup("https://game-site.com")
            .decision(),
        Some(true)
    );

    // Cached block also redirects, without another oracle call.
    world.load(TAB, "https://game-site.com");
    sleep(Duration::from_secs(6)).await;
    assert_eq!(world.redirects.0.lock().len(), 2);
    assert_eq!(world.oracle_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn scenario_d_renavigation_inside_quiet_period_suppresses_first_settle() {
    let world = World::new();
    let mut reports = world.orchestrator.subscribe();
    world.show(TAB, "Play now! Free games");

    world.load(TAB, "https://game-site.com");
    sleep(Duration::from_secs(2)).await;
    world.load(TAB, "https://example.com/docs");

    // The first window would have closed at t=5.
    sleep(Duration::from_millis(3_500)).await;
    assert_eq!(world.oracle_calls(), 0);
    assert!(world.orchestrator.registry().is_pending(TAB));

    sleep(Duration::from_secs(2)).await;
    let report = reports.recv().await.unwrap();
    assert_eq!(report.url.as_deref(), Some("https://example.com/docs"));
    assert_eq!(world.oracle_calls(), 1);
    assert_eq!(world.oracle.calls.lock()[0].url, "https://example.com/docs");
    assert!(world.redirects.0.lock().is_empty());
    assert!(reports.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn scenario_e_oracle_failure_is_retried_on_next_load() {
    let world = World::new();
    let mut reports = world.orchestrator.subscribe();
    world.show(TAB, "Play now! Free games");
    world
        .oracle
        .failing
        .lock()
        .push("https://game-site.com".to_string());

    world.load(TAB, "https://game-site.com");
    sleep(Duration::from_secs(6)).await;
    assert_eq!(
        reports.recv().await.unwrap().outcome,
        SettleOutcome::OracleFailed
    );
    assert!(world.redirects.0.lock().is_empty());
    assert!(world.orchestrator.cache().is_empty());

    world.oracle.failing.lock().clear();
    world.load(TAB, "https://game-site.com");
    sleep(Duration::from_secs(6)).await;
    assert_eq!(
        reports.recv().await.unwrap().outcome,
        SettleOutcome::Classified { blocked: true }
    );
    assert_eq!(world.oracle_calls(), 2);
    assert_eq!(world.redirects.0.lock().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn closing_tab_before_settle_prevents_classification() {
    let world = World::new();
    world.show(TAB, "Play now! Free games");
    world.load(TAB, "https://game-site.com");
    sleep(Duration::from_secs(1)).await;
    world.send(NavigationEvent::removed(TAB));

    sleep(Duration::from_secs(10)).await;
    assert_eq!(world.oracle_calls(), 0);
    assert_eq!(world.orchestrator.registry().pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn at_most_one_window_per_tab() {
    let world = World::new();
    world.show(TAB, "API reference");
    for _ in 0..5 {
        world.send(NavigationEvent::complete(TAB, "https://example.com/docs"));
        assert_eq!(world.orchestrator.registry().pending_count(), 1);
        sleep(Duration::from_secs(1)).await;
    }
    sleep(Duration::from_secs(6)).await;
    assert_eq!(world.oracle_calls(), 1);
}
