//! OpenAI adapter
//!
//! Web search is served by swapping to the matching `-search-preview`
//! model variant; those models reject sampling parameters, so the
//! request body carries none.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::registry::ProviderFamily;

use super::types::{ChatBackend, ChatMessage, ChatReply, ChatRole};

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

pub struct OpenAiBackend {
    client: Client,
    api_key: String,
}

impl std::fmt::Debug for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiBackend").finish()
    }
}

impl OpenAiBackend {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }

    /// Pick the concrete model for a call: the search-preview variant
    /// when grounding is requested, the plain model otherwise.
    fn effective_model(model: &str, web_search: bool) -> String {
        if !web_search {
            return model.to_string();
        }
        if model.contains("mini") {
            "gpt-4o-mini-search-preview".to_string()
        } else {
            "gpt-4o-search-preview".to_string()
        }
    }

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
impl ChatBackend for OpenAiBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::OpenAi
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        system: &str,
        want_web_search: bool,
    ) -> Result<ChatReply> {
        let actual_model = Self::effective_model(model, want_web_search);
        let body = CompletionRequest {
            model: actual_model.clone(),
            messages: Self::to_wire_messages(messages, system),
            max_tokens: 2048,
        };

        debug!(
            "openai request: model={}, web_search={}, messages={}",
            actual_model,
            want_web_search,
            body.messages.len()
        );

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .context("Failed to send request to OpenAI API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("OpenAI API request failed with status {}: {}", status, error_text));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .context("Failed to parse OpenAI API response")?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .unwrap_or_else(|| "No response generated.".to_string());

        Ok(ChatReply { text, searched_web: want_web_search })
    }
}

// ── Wire types ──

#[derive(Debug, Serialize)]
struct CompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    max_tokens: u32,
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
    fn test_effective_model_without_search() {
        assert_eq!(OpenAiBackend::effective_model("gpt-4o-mini", false), "gpt-4o-mini");
    }

    #[test]
    fn test_effective_model_mini_search_variant() {
        assert_eq!(
            OpenAiBackend::effective_model("gpt-4o-mini", true),
            "gpt-4o-mini-search-preview"
        );
    }

    #[test]
    fn test_effective_model_full_search_variant() {
        assert_eq!(
            OpenAiBackend::effective_model("gpt-4o", true),
            "gpt-4o-search-preview"
        );
    }

    #[test]
    fn test_wire_messages_include_system() {
        let wire = OpenAiBackend::to_wire_messages(&[ChatMessage::user("q")], "sys");
        assert_eq!(wire[0].role, "system");
        assert_eq!(wire[1].role, "user");
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = OpenAiBackend::new("sk-secret".to_string());
        assert!(!format!("{:?}", backend).contains("sk-secret"));
    }
}
