use std::time::Duration;

use tabguard_core_types::{TabId, UrlEligibility, DEFAULT_MAX_CONTENT_CHARS};
use tabguard_scheduler::DEFAULT_QUIET_PERIOD;

pub const DEFAULT_BLOCKED_PAGE: &str = "tabguard://blocked";

#[derive(Clone, Debug)]
pub struct GateConfig {
    pub quiet_period: Duration,
    pub max_content_chars: usize,
    /// Redirect target for blocked tabs. Never classified itself.
    pub blocked_page: String,
    pub extra_ineligible_prefixes: Vec<String>,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
            max_content_chars: DEFAULT_MAX_CONTENT_CHARS,
            blocked_page: DEFAULT_BLOCKED_PAGE.to_string(),
            extra_ineligible_prefixes: Vec::new(),
        }
    }
}

impl GateConfig {
    pub fn eligibility(&self) -> UrlEligibility {
        UrlEligibility::new(self.blocked_page.clone())
            .with_extra_prefixes(self.extra_ineligible_prefixes.iter().cloned())
    }
}

/// How a settled navigation ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SettleOutcome {
    Ineligible,
    ExtractionFailed,
    CacheHit { blocked: bool },
    Classified { blocked: bool },
    OracleFailed,
    /// The tab renavigated or closed while the flow was suspended.
    Superseded,
}

impl SettleOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            SettleOutcome::Ineligible => "ineligible",
            SettleOutcome::ExtractionFailed => "extraction_failed",
            SettleOutcome::CacheHit { .. } => "cache_hit",
            SettleOutcome::Classified { .. } => "classified",
            SettleOutcome::OracleFailed => "oracle_failed",
            SettleOutcome::Superseded => "superseded",
        }
    }

    pub fn redirected(&self) -> bool {
        matches!(
            self,
            SettleOutcome::CacheHit { blocked: true } | SettleOutcome::Classified { blocked: true }
        )
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SettleReport {
    pub tab: TabId,
    pub url: Option<String>,
    pub outcome: SettleOutcome,
}
