//! Google Gemini adapter
//!
//! Web search grounding is native: when requested, the call carries the
//! google_search tool and Gemini grounds the answer itself.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::registry::ProviderFamily;

use super::types::{ChatBackend, ChatMessage, ChatReply, ChatRole};

pub struct GeminiBackend {
    client: Client,
    api_key: String,
    max_tokens: u32,
}

impl std::fmt::Debug for GeminiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiBackend")
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl GeminiBackend {
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

    /// Convert provider-agnostic messages to Gemini wire format.
    /// Gemini has no system role in history; the assistant is "model".
    fn to_gemini_contents(messages: &[ChatMessage]) -> Vec<GeminiContent> {
        messages
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| {
                let role = match m.role {
                    ChatRole::Assistant => "model",
                    _ => "user",
                };
                GeminiContent {
                    role: role.to_string(),
                    parts: vec![GeminiPart { text: m.content.clone() }],
                }
            })
            .collect()
    }

    fn from_gemini_response(resp: GeminiApiResponse) -> Result<String> {
        let candidate = resp
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini response had no candidates"))?;

        let text: String = candidate
            .content
            .parts
            .into_iter()
            .map(|p| p.text)
            .collect();

        if text.is_empty() {
            return Ok("No response generated.".to_string());
        }
        Ok(text)
    }
}

#[async_trait]
impl ChatBackend for GeminiBackend {
    fn family(&self) -> ProviderFamily {
        ProviderFamily::Gemini
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        model: &str,
        system: &str,
        want_web_search: bool,
    ) -> Result<ChatReply> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent?key={}",
            model, self.api_key
        );

        let contents = Self::to_gemini_contents(messages);

        let mut body = json!({
            "contents": contents,
            "systemInstruction": {
                "parts": [{"text": system}]
            },
            "generationConfig": {
                "maxOutputTokens": self.max_tokens,
            },
        });

        if want_web_search {
            body["tools"] = json!([{"google_search": {}}]);
        }

        debug!(
            "gemini request: model={}, web_search={}, contents={}",
            model,
            want_web_search,
            contents.len()
        );

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow!("Gemini API request failed with status {}: {}", status, error_text));
        }

        let api_response: GeminiApiResponse = response
            .json()
            .await
            .context("Failed to parse Gemini API response")?;

        let text = Self::from_gemini_response(api_response)?;

        Ok(ChatReply { text, searched_web: want_web_search })
    }
}

// ── Gemini wire types ──

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiContent {
    role: String,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiApiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Clone, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_gemini_contents_roles() {
        let messages = vec![
            ChatMessage::user("question"),
            ChatMessage::assistant("answer"),
        ];
        let contents = GeminiBackend::to_gemini_contents(&messages);
        assert_eq!(contents.len(), 2);
        assert_eq!(contents[0].role, "user");
        assert_eq!(contents[1].role, "model");
    }

    #[test]
    fn test_to_gemini_contents_filters_system() {
        let messages = vec![
            ChatMessage { role: ChatRole::System, content: "sys".to_string() },
            ChatMessage::user("hi"),
        ];
        let contents = GeminiBackend::to_gemini_contents(&messages);
        assert_eq!(contents.len(), 1);
        assert_eq!(contents[0].role, "user");
    }

    #[test]
    fn test_from_gemini_response_concatenates_parts() {
        let resp = GeminiApiResponse {
            candidates: vec![GeminiCandidate {
                content: GeminiContent {
                    role: "model".to_string(),
                    parts: vec![
                        GeminiPart { text: "Hello ".to_string() },
                        GeminiPart { text: "world".to_string() },
                    ],
                },
            }],
        };
        assert_eq!(GeminiBackend::from_gemini_response(resp).unwrap(), "Hello world");
    }

    #[test]
    fn test_from_gemini_response_no_candidates() {
        let resp = GeminiApiResponse { candidates: vec![] };
        assert!(GeminiBackend::from_gemini_response(resp).is_err());
    }

    #[test]
    fn test_debug_hides_key() {
        let backend = GeminiBackend::new("AIza-secret".to_string());
        assert!(!format!("{:?}", backend).contains("AIza-secret"));
    }
}
