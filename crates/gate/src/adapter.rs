use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use tabguard_core_types::{GateError, NavigationEvent, TabStatus};
use tabguard_event_bus::{EventBus, InMemoryBus};

use crate::orchestrator::Orchestrator;

/// Translates one raw tab signal into orchestrator calls.
///
/// `loading` cancels, `complete` arms, removal cancels. Any other status is
/// ignored.
pub fn handle_event(
    orchestrator: &Arc<Orchestrator>,
    event: NavigationEvent,
) -> Result<(), GateError> {
    match event {
        NavigationEvent::Updated {
            tab,
            status: TabStatus::Loading,
            ..
        } => {
            orchestrator.on_load_start(tab);
            Ok(())
        }
        NavigationEvent::Updated {
            tab,
            status: TabStatus::Complete,
            info,
        } => orchestrator.on_load_complete(tab, info.url),
        NavigationEvent::Updated {
            tab,
            status: TabStatus::Other,
            ..
        } => {
            debug!(%tab, "ignoring tab update");
            Ok(())
        }
        NavigationEvent::Removed { tab } => {
            orchestrator.on_tab_removed(tab);
            Ok(())
        }
    }
}

/// Background task feeding bus events to the orchestrator in arrival order.
pub struct NavigationAdapter {
    task: JoinHandle<()>,
}

impl NavigationAdapter {
    pub fn spawn(bus: Arc<InMemoryBus<NavigationEvent>>, orchestrator: Arc<Orchestrator>) -> Self {
        let mut rx = bus.subscribe();
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        if let Err(err) = handle_event(&orchestrator, event) {
                            warn!("navigation adapter error: {err}");
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "navigation adapter lagged; events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn shutdown(self) {
        self.task.abort();
    }
}
