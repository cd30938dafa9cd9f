//! TabGuard host library.
//!
//! Wires the gate crates into a running process: configuration, the
//! [`Gate`] owner, prometheus metrics and the HTTP bridge the browser
//! extension talks to.

pub mod app;
pub mod config;
pub mod metrics;
pub mod server;

pub use app::Gate;
pub use config::{Config, ConfigError};
pub use server::{build_router, BridgeState};

pub const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TABGUARD_GIT_HASH"),
    " ",
    env!("TABGUARD_BUILD_DATE"),
    ")"
);
