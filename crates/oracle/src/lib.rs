//! Client side of the classification oracle.
//!
//! The oracle is any OpenAI-compatible chat-completions endpoint (a local LM
//! Studio server by default) that answers with `{"should_block": bool}`.

pub mod client;
pub mod error;
pub mod metrics;
pub mod policy;
mod utils;
mod wire;

pub use client::{ChatOracle, OracleClient, OracleConfig, DEFAULT_ENDPOINT, DEFAULT_MODEL};
pub use error::OracleError;
pub use policy::{PolicyKind, PromptPolicy};
pub use wire::{build_request_body, parse_completion};
