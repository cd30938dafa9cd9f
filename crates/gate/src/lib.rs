//! Scheduling and decision-caching core of the content gate.
//!
//! Navigation events flow through the [`adapter`] into the [`Orchestrator`],
//! which debounces each tab, extracts a page sample once the tab settles,
//! consults the decision cache and falls back to the oracle. The only visible
//! side effect is a redirect through the [`Redirector`] port.

pub mod adapter;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod ports;

pub use adapter::{handle_event, NavigationAdapter};
pub use model::{GateConfig, SettleOutcome, SettleReport};
pub use orchestrator::Orchestrator;
pub use ports::{ContentExtractor, ExtractionError, Redirector};
