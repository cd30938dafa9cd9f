use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::debug;

use tabguard_core_types::TabId;

use crate::error::SchedulerError;
use crate::metrics;

#[derive(Debug)]
struct PendingTimer {
    id: u64,
    handle: JoinHandle<()>,
}

/// Per-tab debounce timers with last-arm-wins semantics.
///
/// A tab has an entry iff its window is open. The timer task removes its own
/// entry under the lock before running the callback, and only if the entry
/// still carries the task's id, so a window that was cancelled or replaced
/// can never fire even when its sleep already elapsed.
#[derive(Debug, Default)]
pub struct DebounceRegistry {
    pending: Arc<Mutex<HashMap<TabId, PendingTimer>>>,
    seq: AtomicU64,
}

impl DebounceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens (or reopens) the window for `tab`. Returns `true` when a
    /// previous window was replaced.
    pub fn arm<F, Fut>(&self, tab: TabId, delay: Duration, on_fire: F) -> Result<bool, SchedulerError>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| SchedulerError::NoRuntime)?;
        let id = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let pending = Arc::clone(&self.pending);

        // Held across the spawn so the timer task cannot inspect the map
        // before its own entry is inserted.
        let mut guard = self.pending.lock();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let owned = {
                let mut map = pending.lock();
                match map.get(&tab) {
                    Some(entry) if entry.id == id => {
                        map.remove(&tab);
                        metrics::set_pending(map.len());
                        true
                    }
                    _ => false,
                }
            };
            if !owned {
                return;
            }
            metrics::record_fired();
            debug!(%tab, "debounce window settled");
            on_fire().await;
        });

        let previous = guard.insert(tab, PendingTimer { id, handle });
        metrics::set_pending(guard.len());
        drop(guard);

        metrics::record_armed();
        let replaced = match previous {
            Some(previous) => {
                previous.handle.abort();
                metrics::record_cancelled();
                true
            }
            None => false,
        };
        debug!(%tab, delay_ms = delay.as_millis() as u64, replaced, "armed debounce window");
        Ok(replaced)
    }

    /// Closes the window for `tab` if one is open. Returns `true` when a
    /// pending timer was cancelled.
    pub fn cancel(&self, tab: TabId) -> bool {
        let removed = {
            let mut guard = self.pending.lock();
            let removed = guard.remove(&tab);
            metrics::set_pending(guard.len());
            removed
        };
        match removed {
            Some(timer) => {
                timer.handle.abort();
                metrics::record_cancelled();
                debug!(%tab, "cancelled debounce window");
                true
            }
            None => false,
        }
    }

    /// Cancels every open window. Used on shutdown.
    pub fn cancel_all(&self) -> usize {
        let drained: Vec<PendingTimer> = {
            let mut guard = self.pending.lock();
            let drained = guard.drain().map(|(_, timer)| timer).collect();
            metrics::set_pending(0);
            drained
        };
        for timer in &drained {
            timer.handle.abort();
            metrics::record_cancelled();
        }
        drained.len()
    }

    pub fn is_pending(&self, tab: TabId) -> bool {
        self.pending.lock().contains_key(&tab)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }
}

impl Drop for DebounceRegistry {
    fn drop(&mut self) {
        for (_, timer) in self.pending.lock().drain() {
            timer.handle.abort();
        }
    }
}
