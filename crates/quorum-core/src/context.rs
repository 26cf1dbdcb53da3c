//! System prompt assembly from role text, knowledge layers, and
//! live search results
//!
//! Section order is fixed: role instructions, then knowledge grouped by
//! layer, then search results. Search results come last so the model
//! treats them as the most current information.

use std::collections::BTreeMap;

use tracing::debug;

use crate::types::{KnowledgeEntry, SearchResult};

/// Role text used when the caller configures nothing else
pub const DEFAULT_ROLE_TEXT: &str =
    "You are a helpful AI assistant for a professional team. Be clear, accurate, and concise.";

/// The universal knowledge layer every request sees
pub const COMPANY_LAYER: &str = "company";

/// Build the complete system prompt for one request.
///
/// Layers with no entries simply never appear; there are no empty
/// headers. Non-company layers render in sorted order so the output is
/// stable across runs.
pub fn build_system_prompt(
    role_text: &str,
    knowledge: &[KnowledgeEntry],
    search_results: &[SearchResult],
) -> String {
    let mut prompt = String::new();
    prompt.push_str(role_text);

    if !knowledge.is_empty() {
        let mut grouped: BTreeMap<&str, Vec<&KnowledgeEntry>> = BTreeMap::new();
        for entry in knowledge {
            grouped.entry(entry.layer.as_str()).or_default().push(entry);
        }

        prompt.push_str("\n\n## KNOWLEDGE BASE CONTEXT\n");
        prompt.push_str("Use this information to inform your responses:\n\n");

        if let Some(entries) = grouped.remove(COMPANY_LAYER) {
            prompt.push_str("### Company Knowledge\n");
            for e in entries {
                push_entry(&mut prompt, e);
            }
        }

        for (layer, entries) in grouped {
            prompt.push_str(&format!("### {layer} Knowledge\n"));
            for e in entries {
                push_entry(&mut prompt, e);
            }
        }

        prompt.push_str("---\nNow respond to the user's message using the above context where relevant.\n");
    }

    if !search_results.is_empty() {
        prompt.push_str("\n\n## Live Web Search Results\n");
        prompt.push_str("Use these current results to inform your answer:\n\n");
        for (i, r) in search_results.iter().enumerate() {
            prompt.push_str(&format!("**[{}] {}**\n{}\n", i + 1, r.title, r.snippet));
            if !r.link.is_empty() {
                prompt.push_str(&format!("Source: {}\n", r.link));
            }
            prompt.push('\n');
        }
        prompt.push_str("---\nNow answer the user's question using the above search results where relevant. Cite sources where appropriate.\n");
    }

    debug!("built system prompt ({} chars)", prompt.len());
    prompt
}

fn push_entry(prompt: &mut String, entry: &KnowledgeEntry) {
    prompt.push_str(&format!("**{}**\n{}\n\n", entry.title, entry.content));
}
