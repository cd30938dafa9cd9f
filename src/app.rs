//! Process-level owner of the gate components.

use std::sync::Arc;

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tracing::{debug, info};

use tabguard_core_types::{GateError, NavigationEvent, TabId, TabInfo, TabStatus};
use tabguard_decision_cache::DecisionCache;
use tabguard_event_bus::InMemoryBus;
use tabguard_extension_bridge::{
    BridgeEvent, BridgeEventBus, DirectiveQueue, PageSampleStore, RedirectDirective,
};
use tabguard_gate::{NavigationAdapter, Orchestrator, SettleReport};
use tabguard_oracle::{ChatOracle, OracleClient};
use tabguard_scheduler::DebounceRegistry;

use crate::config::Config;

const NAVIGATION_BUS_CAPACITY: usize = 1024;
const BRIDGE_EVENT_CAPACITY: usize = 256;

/// Owns the cache, debounce registry, orchestrator, bus and adapter for the
/// lifetime of the process. Must be started inside a tokio runtime.
pub struct Gate {
    bus: Arc<InMemoryBus<NavigationEvent>>,
    orchestrator: Arc<Orchestrator>,
    samples: Arc<PageSampleStore>,
    directives: Arc<DirectiveQueue>,
    bridge_events: BridgeEventBus,
    adapter: Mutex<Option<NavigationAdapter>>,
}

impl Gate {
    /// Builds the chat oracle from configuration and starts the gate.
    pub fn from_config(config: &Config) -> Result<Self> {
        let oracle_config = config.oracle_config().context("invalid oracle configuration")?;
        let oracle = ChatOracle::new(oracle_config).context("failed to build oracle client")?;
        Ok(Self::start(config, Arc::new(oracle)))
    }

    pub fn start(config: &Config, oracle: Arc<dyn OracleClient>) -> Self {
        let (bridge_events, _) = broadcast::channel(BRIDGE_EVENT_CAPACITY);
        let samples = PageSampleStore::new(&config.bridge, bridge_events.clone());
        let directives = DirectiveQueue::new(&config.bridge, bridge_events.clone());

        let orchestrator = Orchestrator::new(
            Arc::new(DecisionCache::new(config.cache_config())),
            Arc::new(DebounceRegistry::new()),
            oracle,
            samples.clone(),
            directives.clone(),
            config.gate_config(),
        );

        let bus = InMemoryBus::new(NAVIGATION_BUS_CAPACITY);
        let adapter = NavigationAdapter::spawn(bus.clone(), orchestrator.clone());
        info!(
            quiet_period = ?config.gate.quiet_period,
            cache_ttl = ?config.gate.cache_ttl,
            "gate started"
        );

        Self {
            bus,
            orchestrator,
            samples,
            directives,
            bridge_events,
            adapter: Mutex::new(Some(adapter)),
        }
    }

    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }

    pub fn subscribe_reports(&self) -> broadcast::Receiver<SettleReport> {
        self.orchestrator.subscribe()
    }

    pub fn subscribe_bridge_events(&self) -> broadcast::Receiver<BridgeEvent> {
        self.bridge_events.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.adapter
            .lock()
            .as_ref()
            .map(NavigationAdapter::is_running)
            .unwrap_or(false)
    }

    /// Forwards a tab update. A load start also drops host state that
    /// belongs to the previous page: its sample and any unpolled redirect.
    pub fn tab_updated(
        &self,
        tab: TabId,
        status: TabStatus,
        url: Option<String>,
    ) -> Result<(), GateError> {
        if status == TabStatus::Loading {
            self.samples.invalidate(tab, url.as_deref());
            let discarded = self.directives.discard_tab(tab);
            if discarded > 0 {
                debug!(%tab, discarded, "dropped directives for renavigated tab");
            }
        }
        self.publish(NavigationEvent::Updated {
            tab,
            status,
            info: TabInfo { url },
        })
    }

    /// Forgets everything the host keeps for the tab and cancels its window.
    pub fn tab_removed(&self, tab: TabId) -> Result<(), GateError> {
        self.samples.forget(tab);
        let discarded = self.directives.discard_tab(tab);
        if discarded > 0 {
            debug!(%tab, discarded, "dropped directives for closed tab");
        }
        self.publish(NavigationEvent::Removed { tab })
    }

    /// Stores the page text for `tab`. `url` names the page it was read from.
    pub fn record_sample(&self, tab: TabId, url: Option<&str>, text: &str) {
        self.samples.record(tab, url, text);
    }

    pub fn drain_directives(&self) -> Vec<RedirectDirective> {
        self.directives.drain()
    }

    fn publish(&self, event: NavigationEvent) -> Result<(), GateError> {
        if !self.is_running() {
            return Err(GateError::internal("gate is shut down"));
        }
        self.bus.send(event).map(|_| ())
    }

    /// Stops the adapter and cancels every pending window. Returns the
    /// number of windows cancelled.
    pub fn shutdown(&self) -> usize {
        if let Some(adapter) = self.adapter.lock().take() {
            adapter.shutdown();
        }
        let cancelled = self.orchestrator.registry().cancel_all();
        info!(cancelled, "gate stopped");
        cancelled
    }
}
