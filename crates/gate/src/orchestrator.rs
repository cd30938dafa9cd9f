use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use tabguard_core_types::{
    truncate_chars, ClassificationRequest, GateError, TabId, UrlEligibility,
};
use tabguard_decision_cache::{DecisionCache, Lookup};
use tabguard_oracle::OracleClient;
use tabguard_scheduler::DebounceRegistry;

use crate::metrics;
use crate::model::{GateConfig, SettleOutcome, SettleReport};
use crate::ports::{ContentExtractor, Redirector};

/// Owns the per-navigation flow: arm, settle, extract, consult the cache or
/// the oracle, then redirect when the decision is to block.
///
/// Each tab carries a generation token. Arming, renavigating and closing a
/// tab all replace or drop the token, and a decision is applied only while
/// the token captured at arm time is still current. A late oracle response
/// for a superseded navigation is cached but never redirects.
pub struct Orchestrator {
    cache: Arc<DecisionCache>,
    registry: Arc<DebounceRegistry>,
    oracle: Arc<dyn OracleClient>,
    extractor: Arc<dyn ContentExtractor>,
    redirector: Arc<dyn Redirector>,
    config: GateConfig,
    eligibility: UrlEligibility,
    generations: Mutex<HashMap<TabId, u64>>,
    next_generation: AtomicU64,
    reports: broadcast::Sender<SettleReport>,
}

impl Orchestrator {
    pub fn new(
        cache: Arc<DecisionCache>,
        registry: Arc<DebounceRegistry>,
        oracle: Arc<dyn OracleClient>,
        extractor: Arc<dyn ContentExtractor>,
        redirector: Arc<dyn Redirector>,
        config: GateConfig,
    ) -> Arc<Self> {
        let eligibility = config.eligibility();
        let (reports, _) = broadcast::channel(64);
        Arc::new(Self {
            cache,
            registry,
            oracle,
            extractor,
            redirector,
            config,
            eligibility,
            generations: Mutex::new(HashMap::new()),
            next_generation: AtomicU64::new(0),
            reports,
        })
    }

    pub fn cache(&self) -> &Arc<DecisionCache> {
        &self.cache
    }

    pub fn registry(&self) -> &Arc<DebounceRegistry> {
        &self.registry
    }

    /// Receives one report per settled navigation.
    pub fn subscribe(&self) -> broadcast::Receiver<SettleReport> {
        self.reports.subscribe()
    }

    /// Page finished loading: open (or restart) the quiet period.
    pub fn on_load_complete(
        self: &Arc<Self>,
        tab: TabId,
        url: Option<String>,
    ) -> Result<(), GateError> {
        let token = self.begin_generation(tab);
        let this = Arc::clone(self);
        self.registry
            .arm(tab, self.config.quiet_period, move || async move {
                this.settle(tab, url, token).await;
            })?;
        debug!(%tab, token, "set debounce timer");
        Ok(())
    }

    /// Page started loading: drop the pending window and invalidate any
    /// flow still suspended for the previous navigation.
    pub fn on_load_start(&self, tab: TabId) {
        self.begin_generation(tab);
        if self.registry.cancel(tab) {
            debug!(%tab, "cleared timer for renavigated tab");
        }
    }

    pub fn on_tab_removed(&self, tab: TabId) {
        self.generations.lock().remove(&tab);
        if self.registry.cancel(tab) {
            debug!(%tab, "cleared timer for removed tab");
        }
    }

    fn begin_generation(&self, tab: TabId) -> u64 {
        let token = self.next_generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.generations.lock().insert(tab, token);
        token
    }

    fn is_current(&self, tab: TabId, token: u64) -> bool {
        self.generations.lock().get(&tab) == Some(&token)
    }

    /// Runs once per fired debounce window. Never fails: every error ends
    /// the flow for this navigation with the tab left unblocked.
    pub async fn settle(&self, tab: TabId, url: Option<String>, token: u64) -> SettleOutcome {
        let outcome = self.run_settle(tab, url.as_deref(), token).await;
        metrics::record_outcome(outcome.label());
        let _ = self.reports.send(SettleReport { tab, url, outcome });
        outcome
    }

    async fn run_settle(&self, tab: TabId, url: Option<&str>, token: u64) -> SettleOutcome {
        if let Err(skip) = self.eligibility.check(url) {
            debug!(%tab, %skip, "skipping classification");
            return SettleOutcome::Ineligible;
        }
        let Some(url) = url else {
            return SettleOutcome::Ineligible;
        };

        debug!(%tab, url, "fetching page content");
        let content = match self.extractor.extract(tab, url).await {
            Ok(content) => content,
            Err(err) => {
                let err = GateError::from(err);
                warn!(%tab, url, %err, "error extracting content for tab");
                return SettleOutcome::ExtractionFailed;
            }
        };
        if !self.is_current(tab, token) {
            debug!(%tab, url, "navigation superseded during extraction");
            return SettleOutcome::Superseded;
        }
        let content = truncate_chars(&content, self.config.max_content_chars);

        if let Lookup::Hit(blocked) = self.cache.lookup(url) {
            debug!(%tab, url, "using cached decision");
            self.apply(tab, url, blocked, true);
            return SettleOutcome::CacheHit { blocked };
        }

        let request = ClassificationRequest::new(tab, url, content);
        debug!(%tab, url, "checking with oracle");
        let verdict = match self.oracle.classify(&request).await {
            Ok(verdict) => verdict,
            Err(err) => {
                let err = GateError::from(err);
                warn!(%tab, url, %err, "oracle classification failed");
                return SettleOutcome::OracleFailed;
            }
        };

        self.cache.store(url, verdict.should_block);
        if !self.is_current(tab, token) {
            info!(
                %tab,
                url,
                decision = verdict.should_block,
                "discarding decision for superseded navigation"
            );
            return SettleOutcome::Superseded;
        }
        self.apply(tab, url, verdict.should_block, false);
        SettleOutcome::Classified {
            blocked: verdict.should_block,
        }
    }

    fn apply(&self, tab: TabId, url: &str, block: bool, cached: bool) {
        if block {
            info!(%tab, url, cached, "blocking");
            self.redirector.redirect(tab, &self.config.blocked_page);
            metrics::record_redirect();
        } else {
            info!(%tab, url, cached, "allowing");
        }
    }
}
