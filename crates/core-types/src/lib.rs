use std::fmt;

use thiserror::Error;

/// Default upper bound for the page sample handed to the oracle.
pub const DEFAULT_MAX_CONTENT_CHARS: usize = 1000;

/// Shared error type for the gate crates.
///
/// Every variant is local to a single navigation's flow; none of them is
/// allowed to escape into the host process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GateError {
    #[error("content extraction failed: {0}")]
    ExtractionFailure(String),
    #[error("oracle transport failed: {0}")]
    OracleTransport(String),
    #[error("oracle response invalid: {0}")]
    OracleResponse(String),
    #[error("url not eligible for classification: {0}")]
    Ineligible(String),
    #[error("{0}")]
    Internal(String),
}

impl GateError {
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Opaque tab handle assigned by the host browser.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(transparent))]
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u64);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab:{}", self.0)
    }
}

impl From<u64> for TabId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(rename_all = "lowercase"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TabStatus {
    Loading,
    Complete,
    #[cfg_attr(feature = "serde-full", serde(other))]
    Other,
}

impl TabStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "loading" => TabStatus::Loading,
            "complete" => TabStatus::Complete,
            _ => TabStatus::Other,
        }
    }
}

#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TabInfo {
    #[cfg_attr(feature = "serde-full", serde(default))]
    pub url: Option<String>,
}

impl TabInfo {
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
        }
    }
}

/// Raw tab lifecycle signal as emitted by the browser.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-full", serde(tag = "kind", rename_all = "snake_case"))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NavigationEvent {
    Updated {
        tab: TabId,
        status: TabStatus,
        info: TabInfo,
    },
    Removed {
        tab: TabId,
    },
}

impl NavigationEvent {
    pub fn loading(tab: TabId, url: impl Into<String>) -> Self {
        NavigationEvent::Updated {
            tab,
            status: TabStatus::Loading,
            info: TabInfo::with_url(url),
        }
    }

    pub fn complete(tab: TabId, url: impl Into<String>) -> Self {
        NavigationEvent::Updated {
            tab,
            status: TabStatus::Complete,
            info: TabInfo::with_url(url),
        }
    }

    pub fn removed(tab: TabId) -> Self {
        NavigationEvent::Removed { tab }
    }

    pub fn tab(&self) -> TabId {
        match self {
            NavigationEvent::Updated { tab, .. } | NavigationEvent::Removed { tab } => *tab,
        }
    }
}

/// Ephemeral request produced once per settled navigation.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClassificationRequest {
    pub tab: TabId,
    pub url: String,
    pub content: String,
}

impl ClassificationRequest {
    pub fn new(tab: TabId, url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tab,
            url: url.into(),
            content: content.into(),
        }
    }
}

/// Oracle answer. `should_block == true` means the page is non-productive.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Verdict {
    pub should_block: bool,
}

impl Verdict {
    pub const BLOCK: Verdict = Verdict { should_block: true };
    pub const ALLOW: Verdict = Verdict {
        should_block: false,
    };
}

const INTERNAL_SCHEMES: &[&str] = &[
    "about:",
    "moz-extension://",
    "chrome-extension://",
    "chrome://",
    "edge://",
    "view-source:",
];

/// Rules deciding whether a settled URL may be sent to the oracle.
#[derive(Clone, Debug, Default)]
pub struct UrlEligibility {
    blocked_page: Option<String>,
    extra_prefixes: Vec<String>,
}

impl UrlEligibility {
    pub fn new(blocked_page: impl Into<String>) -> Self {
        Self {
            blocked_page: Some(blocked_page.into()),
            extra_prefixes: Vec::new(),
        }
    }

    pub fn with_extra_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_prefixes
            .extend(prefixes.into_iter().map(Into::into));
        self
    }

    pub fn check(&self, url: Option<&str>) -> Result<(), GateError> {
        let Some(raw) = url else {
            return Err(GateError::Ineligible("<missing>".to_string()));
        };
        let url = raw.trim();
        if url.is_empty() || url == "undefined" || url == "null" {
            return Err(GateError::Ineligible(raw.to_string()));
        }
        if self.blocked_page.as_deref() == Some(url) {
            return Err(GateError::Ineligible(raw.to_string()));
        }
        let lowered = url.to_ascii_lowercase();
        let internal = INTERNAL_SCHEMES
            .iter()
            .any(|scheme| lowered.starts_with(scheme))
            || self
                .extra_prefixes
                .iter()
                .any(|prefix| url.starts_with(prefix.as_str()));
        if internal {
            return Err(GateError::Ineligible(raw.to_string()));
        }
        Ok(())
    }
}

/// Cuts `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
