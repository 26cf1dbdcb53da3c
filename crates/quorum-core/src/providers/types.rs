//! Provider-agnostic chat types and the backend adapter contract

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::registry::ProviderFamily;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl std::fmt::Display for ChatRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Provider-agnostic chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// What a backend returned for one call
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub text: String,
    /// Whether the backend actually grounded the answer in live search.
    pub searched_web: bool,
}

/// Uniform contract every vendor adapter satisfies. The orchestrator
/// depends only on this trait, never on a concrete family.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Which provider family this adapter serves
    fn family(&self) -> ProviderFamily;

    /// Send one chat request. `want_web_search` is a request, not a
    /// promise: adapters for families without native search ignore it
    /// and report `searched_web = false`.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        system: &str,
        want_web_search: bool,
    ) -> Result<ChatReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_role_display() {
        assert_eq!(ChatRole::User.to_string(), "user");
        assert_eq!(ChatRole::Assistant.to_string(), "assistant");
        assert_eq!(ChatRole::System.to_string(), "system");
    }

    #[test]
    fn test_message_helpers() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, ChatRole::User);
        assert_eq!(msg.content, "hello");

        let msg = ChatMessage::assistant("hi");
        assert_eq!(msg.role, ChatRole::Assistant);
    }

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatRole::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }
}
