//! HTTP surface used by the browser extension.

mod router;
mod state;

pub use router::build_router;
pub use state::BridgeState;
