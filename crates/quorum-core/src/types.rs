//! Shared types for quorum-core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which dispatch strategy handled a request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DispatchMode {
    Single,
    Compare,
    BestAnswer,
}

impl std::fmt::Display for DispatchMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::Compare => write!(f, "compare"),
            Self::BestAnswer => write!(f, "best-answer"),
        }
    }
}

/// Identifies the conversation a request belongs to.
/// Prior turns and knowledge entries are read through the ports;
/// the core treats both as read-only snapshots.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub session_id: String,
    pub user_name: String,
    /// Caller-specific knowledge layers, in addition to the universal
    /// "company" layer which is always included.
    pub knowledge_layers: Vec<String>,
}

impl RequestContext {
    pub fn new(session_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            user_name: user_name.into(),
            knowledge_layers: Vec::new(),
        }
    }

    pub fn with_layers(mut self, layers: Vec<String>) -> Self {
        self.knowledge_layers = layers;
        self
    }
}

/// A transcript row read back from the store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredMessage {
    pub role: String,
    pub content: String,
    pub model: String,
    pub mode: String,
    pub created_at: DateTime<Utc>,
}

/// One knowledge-base entry eligible for prompt injection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub layer: String,
    pub title: String,
    pub content: String,
}

/// A single web search hit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_mode_display() {
        assert_eq!(DispatchMode::Single.to_string(), "single");
        assert_eq!(DispatchMode::Compare.to_string(), "compare");
        assert_eq!(DispatchMode::BestAnswer.to_string(), "best-answer");
    }

    #[test]
    fn test_request_context_builder() {
        let ctx = RequestContext::new("s1", "alice")
            .with_layers(vec!["engineering".to_string()]);
        assert_eq!(ctx.session_id, "s1");
        assert_eq!(ctx.user_name, "alice");
        assert_eq!(ctx.knowledge_layers, vec!["engineering"]);
    }
}
