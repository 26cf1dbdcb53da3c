//! Anthropic Claude adapter

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::registry::ProviderFamily;

use super::types::{ChatBackend, ChatMessage, ChatReply, ChatRole};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic chat adapter. No native web search; the orchestrator
/// injects search context into the system prompt instead.
pub struct AnthropicBackend {
    client: Client,
    api_key: String,
    max_tokens: u32,
}

impl std::fmt::Debug for AnthropicBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicBackend")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AnthropicBackend {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key,
            max_tokens: 2048,
        }
    }

    /// The messages API takes the system prompt out-of-band; system-role
    /// rows in the history are dropped.
    fn to_anthropic_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
        messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ChatBackend for AnthropicBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Anthropic
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        system: &str,
        _want_web_search: bool,
    ) -> Result<ChatReply> {
        let body = MessagesRequest {
            model: model.to_string(),
            max_tokens: self.max_tokens,
            system: system.to_string(),
            messages: Self::to_anthropic_messages(messages),
        };

        debug!("anthropic request: model={}, messages={}", model, body.messages.len());

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Anthropic API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!(
                "Anthropic API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Anthropic API response")?;

        let text = api_response
            .content
            .into_iter()
            .find_map(|b| match b {
                ContentBlock::Text { text } => Some(text),
            })
            .unwrap_or_else(|| "No response generated.".to_string());

        Ok(ChatReply { text, searched_web: false })
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_rows_dropped_from_history() {
        let messages = vec![
            ChatMessage { role: ChatRole::System, content: "sys".to_string() },
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let wire = AnthropicBackend::to_anthropic_messages(&messages);
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "user");
        assert_eq!(wire[1].role, "assistant");
    }

    #[test]
    fn test_parse_text_block() {
        let json = r#"{"content":[{"type":"text","text":"Hello!"}]}"#;
        let resp: MessagesResponse = serde_json::from_str(json).unwrap();
        assert!(matches!(&resp.content[0], ContentBlock::Text { text } if text == "Hello!"));
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = AnthropicBackend::new("sk-ant-secret".to_string());
        assert!(!format!("{:?}", backend).contains("sk-ant-secret"));
    }
}
