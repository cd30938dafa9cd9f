use async_trait::async_trait;
use tabguard_core_types::{GateError, TabId};
use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no page sample available for {0}")]
    Unavailable(TabId),
    #[error("page sample for {tab} was captured on {captured}")]
    StaleSample { tab: TabId, captured: String },
    #[error("extraction timed out")]
    Timeout,
    #[error("{0}")]
    Failed(String),
}

impl From<ExtractionError> for GateError {
    fn from(value: ExtractionError) -> Self {
        GateError::ExtractionFailure(value.to_string())
    }
}

/// Samples the structurally significant text of the page shown in a tab.
///
/// `url` is the navigation being settled. Implementations must not return
/// text captured from a different page.
#[async_trait]
pub trait ContentExtractor: Send + Sync {
    async fn extract(&self, tab: TabId, url: &str) -> Result<String, ExtractionError>;
}

/// Navigates a tab to the blocked resource. Fire-and-forget.
pub trait Redirector: Send + Sync {
    fn redirect(&self, tab: TabId, target: &str);
}
