use serde::{Deserialize, Serialize};

const STRICT_SYSTEM_PROMPT: &str = "You are a strict productivity guardian designed to prevent distractions. \
Your role is to analyze websites with the sole purpose of blocking any that are not directly related to \
studying, programming, or productivity.\n\n**Guidelines:**\n\
1. If the website has any association with social media, entertainment, gaming, or unrelated content, block it.\n\
2. If there is uncertainty about its relevance to work or studying, block it.\n\
3. Only allow websites clearly dedicated to work, research, or learning tools for students and programmers. \
Err on the side of blocking to ensure focus.";

const BALANCED_SYSTEM_PROMPT: &str = "You help a student or programmer stay focused. \
Decide whether a website is a distraction.\n\n**Guidelines:**\n\
1. Block social media feeds, entertainment, video streaming, gaming and shopping sites.\n\
2. Allow documentation, reference material, code hosting, research, news about technology and learning platforms.\n\
3. When the page is plausibly useful for work or study, allow it.";

const DEFAULT_USER_TEMPLATE: &str =
    "Should this website be blocked for a student or programmer?\nURL: {url}\nContent: {content}";

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyKind {
    #[default]
    Strict,
    Balanced,
    Custom,
}

/// Prompt text sent to the oracle. The core only treats it as opaque data.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PromptPolicy {
    pub name: String,
    pub system_prompt: String,
    /// Rendered with `{url}` and `{content}` substituted.
    pub user_template: String,
}

impl Default for PromptPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

impl PromptPolicy {
    pub fn strict() -> Self {
        Self {
            name: "strict".to_string(),
            system_prompt: STRICT_SYSTEM_PROMPT.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }

    pub fn balanced() -> Self {
        Self {
            name: "balanced".to_string(),
            system_prompt: BALANCED_SYSTEM_PROMPT.to_string(),
            user_template: DEFAULT_USER_TEMPLATE.to_string(),
        }
    }

    pub fn custom(system_prompt: impl Into<String>, user_template: Option<String>) -> Self {
        Self {
            name: "custom".to_string(),
            system_prompt: system_prompt.into(),
            user_template: user_template.unwrap_or_else(|| DEFAULT_USER_TEMPLATE.to_string()),
        }
    }

    pub fn preset(kind: PolicyKind) -> Option<Self> {
        match kind {
            PolicyKind::Strict => Some(Self::strict()),
            PolicyKind::Balanced => Some(Self::balanced()),
            PolicyKind::Custom => None,
        }
    }

    pub fn render_user_message(&self, url: &str, content: &str) -> String {
        render_template(&self.user_template, url, content)
    }
}

/// Single-pass substitution so placeholder text inside the page content is
/// never expanded a second time.
fn render_template(template: &str, url: &str, content: &str) -> String {
    let mut out = String::with_capacity(template.len() + url.len() + content.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        if let Some(after) = tail.strip_prefix("{url}") {
            out.push_str(url);
            rest = after;
        } else if let Some(after) = tail.strip_prefix("{content}") {
            out.push_str(content);
            rest = after;
        } else {
            out.push('{');
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}
