//! Groq adapter (OpenAI-compatible chat completions API)

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::registry::ProviderFamily;

use super::types::{ChatBackend, ChatMessage, ChatReply, ChatRole};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Groq chat adapter. No native web search; the orchestrator injects
/// search context into the system prompt instead.
pub struct GroqBackend {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for GroqBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqBackend").finish()
    }
}

impl GroqBackend {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }

    /// System prompt goes first as a system-role message, then the
    /// conversation in order.
    fn to_wire_messages(messages: &[ChatMessage], system: &str) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(messages.len() + 1);
        if !system.is_empty() {
            wire.push(WireMessage {
                role: "system".to_string(),
                content: system.to_string(),
            });
        }
        for m in messages.iter().filter(|m| m.role != ChatRole::System) {
            wire.push(WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
            });
        }
        wire
    }
}

#[async_trait]
impl ChatBackend for GroqBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Groq
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        system: &str,
        _want_web_search: bool,
    ) -> Result<ChatReply> {
        let body = CompletionRequest {
            model: model.to_string(),
            messages: Self::to_wire_messages(messages, system),
            max_tokens: 2048,
            temperature: 0.7,
        };

        debug!("groq request: model={}, messages={}", model, body.messages.len());

        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Groq API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Groq API request failed with status {}: {}", status, error_text));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse Groq API response")?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_else(|| "No response generated.".to_string());

        Ok(ChatReply { text, searched_web: false })
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: WireMessage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_prepended() {
        let messages = vec![ChatMessage::user("hello")];
        let wire = GroqBackend::to_wire_messages(&messages, "be brief");
        assert_eq!(wire.len(), 2);
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[0].content, "be brief");
        assert_eq!(wire[1].role, "user");
    }

    #[test]
    fn test_empty_system_prompt_omitted() {
        let messages = vec![ChatMessage::user("hello")];
        let wire = GroqBackend::to_wire_messages(&messages, "");
        assert_eq!(wire.len(), 1);
        assert_eq!(wire[0].role, "user");
    }

    #[test]
    fn test_system_role_messages_filtered_from_history() {
        let messages = vec![
            ChatMessage { role: ChatRole::System, content: "old".to_string() },
            ChatMessage::user("hi"),
            ChatMessage::assistant("hello"),
        ];
        let wire = GroqBackend::to_wire_messages(&messages, "sys");
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[1].role, "user");
        assert_eq!(wire[2].role, "assistant");
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = GroqBackend::new("gsk-secret".to_string());
        assert!(!format!("{:?}", backend).contains("gsk-secret"));
    }
}
