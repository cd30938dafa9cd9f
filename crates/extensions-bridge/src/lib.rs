//! Host side of the browser extension bridge.
//!
//! The extension pushes page samples and tab signals to the host and polls
//! for redirect directives. [`PageSampleStore`] backs the gate's content
//! extractor and [`DirectiveQueue`] backs its redirector.

pub mod config;

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, warn};
use uuid::Uuid;

use tabguard_core_types::{truncate_chars, TabId};
use tabguard_gate::{ContentExtractor, ExtractionError, Redirector};

pub use config::BridgeConfig;

/// Instruction for the extension to navigate a tab.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectDirective {
    pub id: Uuid,
    pub tab: TabId,
    pub target: String,
}

/// Events emitted by the bridge to observers.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BridgeEvent {
    SampleRecorded { tab: TabId, chars: usize },
    SampleDropped { tab: TabId },
    RedirectQueued { directive: RedirectDirective },
}

pub type BridgeEventBus = broadcast::Sender<BridgeEvent>;

#[derive(Clone, Debug)]
struct PageSample {
    text: String,
    /// Page the text was captured on, when the extension reports it.
    url: Option<String>,
    captured_at: Instant,
}

/// Latest page sample per tab as pushed by the extension.
pub struct PageSampleStore {
    samples: DashMap<TabId, PageSample>,
    max_chars: usize,
    events: BridgeEventBus,
}

impl PageSampleStore {
    pub fn new(config: &BridgeConfig, events: BridgeEventBus) -> Arc<Self> {
        Arc::new(Self {
            samples: DashMap::new(),
            max_chars: config.max_sample_chars.max(1),
            events,
        })
    }

    pub fn record(&self, tab: TabId, url: Option<&str>, text: &str) {
        let text = truncate_chars(text, self.max_chars).to_string();
        let chars = text.chars().count();
        self.samples.insert(
            tab,
            PageSample {
                text,
                url: url.map(str::to_string),
                captured_at: Instant::now(),
            },
        );
        debug!(%tab, chars, "page sample recorded");
        let _ = self.events.send(BridgeEvent::SampleRecorded { tab, chars });
    }

    pub fn forget(&self, tab: TabId) -> bool {
        let removed = self.samples.remove(&tab).is_some();
        if removed {
            let _ = self.events.send(BridgeEvent::SampleDropped { tab });
        }
        removed
    }

    /// Tab started loading `url`: drops any sample not captured on that URL.
    pub fn invalidate(&self, tab: TabId, url: Option<&str>) -> bool {
        let removed = self
            .samples
            .remove_if(&tab, |_, sample| url.is_none() || sample.url.as_deref() != url)
            .is_some();
        if removed {
            debug!(%tab, "dropped page sample for previous navigation");
            let _ = self.events.send(BridgeEvent::SampleDropped { tab });
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[async_trait]
impl ContentExtractor for PageSampleStore {
    async fn extract(&self, tab: TabId, url: &str) -> Result<String, ExtractionError> {
        let sample = self
            .samples
            .get(&tab)
            .map(|entry| entry.value().clone())
            .ok_or(ExtractionError::Unavailable(tab))?;
        if let Some(captured) = sample.url {
            if captured != url {
                return Err(ExtractionError::StaleSample { tab, captured });
            }
        }
        debug!(
            %tab,
            age_ms = sample.captured_at.elapsed().as_millis() as u64,
            "serving page sample"
        );
        Ok(sample.text)
    }
}

/// Redirects waiting to be collected by the extension.
pub struct DirectiveQueue {
    pending: Mutex<VecDeque<RedirectDirective>>,
    capacity: usize,
    events: BridgeEventBus,
}

impl DirectiveQueue {
    pub fn new(config: &BridgeConfig, events: BridgeEventBus) -> Arc<Self> {
        Arc::new(Self {
            pending: Mutex::new(VecDeque::new()),
            capacity: config.max_pending_directives.max(1),
            events,
        })
    }

    pub fn drain(&self) -> Vec<RedirectDirective> {
        self.pending.lock().drain(..).collect()
    }

    /// Removes queued directives for a tab that no longer exists.
    pub fn discard_tab(&self, tab: TabId) -> usize {
        let mut pending = self.pending.lock();
        let before = pending.len();
        pending.retain(|directive| directive.tab != tab);
        before - pending.len()
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}

impl Redirector for DirectiveQueue {
    fn redirect(&self, tab: TabId, target: &str) {
        let directive = RedirectDirective {
            id: Uuid::new_v4(),
            tab,
            target: target.to_string(),
        };
        {
            let mut pending = self.pending.lock();
            // A newer redirect for the same tab supersedes the older one.
            pending.retain(|queued| queued.tab != tab);
            if pending.len() >= self.capacity {
                if let Some(dropped) = pending.pop_front() {
                    warn!(tab = %dropped.tab, "directive queue full; dropping oldest");
                }
            }
            pending.push_back(directive.clone());
        }
        let _ = self.events.send(BridgeEvent::RedirectQueued { directive });
    }
}
