//! Serper-backed web search used for prompt injection
//!
//! Backends with native grounding never touch this; it exists for the
//! families that cannot search on their own. A client built without an
//! API key is disabled and returns no results.

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::ports::WebSearcher;
use crate::types::SearchResult;

const SERPER_API_URL: &str = "https://google.serper.dev/search";
const DEFAULT_NUM_RESULTS: usize = 5;

pub struct SerperSearch {
    client: Client,
    api_key: Option<String>,
    num_results: usize,
}

impl std::fmt::Debug for SerperSearch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerperSearch")
            .field("enabled", &self.api_key.is_some())
            .field("num_results", &self.num_results)
            .finish()
    }
}

impl SerperSearch {
    /// `api_key = None` builds a disabled client that always returns
    /// an empty result set.
    pub fn new(api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.filter(|k| !k.is_empty()),
            num_results: DEFAULT_NUM_RESULTS,
        }
    }
}

#[async_trait]
impl WebSearcher for SerperSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let Some(key) = &self.api_key else {
            debug!("web search disabled, returning no results");
            return Ok(vec![]);
        };

        debug!("serper search: {:?}", query);

        let response = self
            .client
            .post(SERPER_API_URL)
            .header("X-API-KEY", key)
            .json(&json!({ "q": query, "num": self.num_results }))
            .send()
            .await
            .context("Failed to send request to Serper API")?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Serper API request failed with status {}", status));
        }

        let payload: SerperResponse = response
            .json()
            .await
            .context("Failed to parse Serper API response")?;

        Ok(collect_results(payload, self.num_results))
    }
}

/// Merge the answer box, knowledge graph, and organic hits into one
/// ordered list, most direct sources first, capped at `limit`.
fn collect_results(payload: SerperResponse, limit: usize) -> Vec<SearchResult> {
    let mut results = Vec::new();

    if let Some(answer_box) = payload.answer_box {
        if let Some(answer) = answer_box.answer {
            results.push(SearchResult {
                title: "Direct Answer".to_string(),
                snippet: answer,
                link: answer_box.link.unwrap_or_default(),
            });
        }
    }

    if let Some(graph) = payload.knowledge_graph {
        if let Some(description) = graph.description {
            results.push(SearchResult {
                title: graph.title.unwrap_or_else(|| "Knowledge Graph".to_string()),
                snippet: description,
                link: graph.description_link.unwrap_or_default(),
            });
        }
    }

    for hit in payload.organic.unwrap_or_default() {
        results.push(SearchResult {
            title: hit.title,
            snippet: hit.snippet.unwrap_or_default(),
            link: hit.link,
        });
    }

    results.truncate(limit);
    results
}

// ── Serper wire types ──

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    #[serde(rename = "knowledgeGraph")]
    knowledge_graph: Option<KnowledgeGraph>,
    organic: Option<Vec<OrganicHit>>,
}

#[derive(Debug, Deserialize)]
struct AnswerBox {
    answer: Option<String>,
    link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KnowledgeGraph {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "descriptionLink")]
    description_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicHit {
    title: String,
    snippet: Option<String>,
    link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> SerperResponse {
        serde_json::from_str(json).unwrap()
    }

    #[tokio::test]
    async fn test_disabled_client_returns_empty() {
        let searcher = SerperSearch::new(None);
        let results = searcher.search("anything").await.unwrap();
        assert!(results.is_empty());

        let searcher = SerperSearch::new(Some(String::new()));
        let results = searcher.search("anything").await.unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_answer_box_comes_first() {
        let payload = parse(
            r#"{
                "answerBox": {"answer": "42", "link": "https://example.com/a"},
                "organic": [
                    {"title": "Result", "snippet": "text", "link": "https://example.com/r"}
                ]
            }"#,
        );
        let results = collect_results(payload, 5);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "Direct Answer");
        assert_eq!(results[0].snippet, "42");
        assert_eq!(results[1].title, "Result");
    }

    #[test]
    fn test_knowledge_graph_defaults_title() {
        let payload = parse(r#"{"knowledgeGraph": {"description": "A thing"}}"#);
        let results = collect_results(payload, 5);
        assert_eq!(results[0].title, "Knowledge Graph");
        assert_eq!(results[0].link, "");
    }

    #[test]
    fn test_results_capped_at_limit() {
        let payload = parse(
            r#"{
                "organic": [
                    {"title": "1", "link": "l1"},
                    {"title": "2", "link": "l2"},
                    {"title": "3", "link": "l3"}
                ]
            }"#,
        );
        let results = collect_results(payload, 2);
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_missing_snippet_renders_empty() {
        let payload = parse(r#"{"organic": [{"title": "t", "link": "l"}]}"#);
        let results = collect_results(payload, 5);
        assert_eq!(results[0].snippet, "");
    }

    #[test]
    fn test_empty_payload_yields_no_results() {
        let payload = parse("{}");
        assert!(collect_results(payload, 5).is_empty());
    }
}
