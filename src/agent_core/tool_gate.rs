//! Tool gate — decides per turn whether tool declarations are offered.
//!
//! Offering tools on every request makes the model reach for them on plain
//! questions. The keyword gate only enables them when the utterance sounds
//! like a device action.

/// Keywords that enable tools. Matched as lower-case substrings.
pub const DEFAULT_TOOL_KEYWORDS: &[&str] = &[
    "open", "launch", "start", "call", "dial", "search", "find", "look up", "alarm", "timer",
    "wake me",
];

/// Heuristic deciding whether a user turn gets tool declarations.
pub trait ToolGate: Send + Sync {
    fn tools_enabled(&self, input: &str) -> bool;
}

/// Substring match against a keyword list.
#[derive(Debug, Clone)]
pub struct KeywordGate {
    keywords: Vec<String>,
}

impl KeywordGate {
    /// Gate with the built-in keyword list.
    pub fn new() -> Self {
        Self::from_keywords(DEFAULT_TOOL_KEYWORDS.iter().copied())
    }

    /// Gate with a custom keyword list. Blank entries are dropped.
    pub fn from_keywords<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let keywords = keywords
            .into_iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .collect();
        Self { keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }
}

impl Default for KeywordGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolGate for KeywordGate {
    fn tools_enabled(&self, input: &str) -> bool {
        let lower = input.to_lowercase();
        let hit = self.keywords.iter().find(|k| lower.contains(k.as_str()));
        if let Some(keyword) = hit {
            tracing::debug!(keyword = %keyword, "tool gate: tools enabled");
        }
        hit.is_some()
    }
}
