//! Ports the orchestrator consumes
//!
//! Persistence and web search live behind these traits; the core never
//! depends on a concrete store or search vendor. Knowledge is read-only
//! from the core's point of view.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{DispatchMode, KnowledgeEntry, SearchResult, StoredMessage};

/// Append-only conversation transcript
#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn append(
        &self,
        session_id: &str,
        user_name: &str,
        role: &str,
        content: &str,
        model_label: &str,
        mode: DispatchMode,
    ) -> Result<()>;

    /// The most recent messages for a session, oldest first.
    async fn recent(&self, session_id: &str, limit: usize) -> Result<Vec<StoredMessage>>;
}

/// Read access to the layered knowledge base
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// All entries belonging to any of the given layers.
    async fn entries_for(&self, layers: &[String]) -> Result<Vec<KnowledgeEntry>>;
}

/// Live web search used for prompt injection on backends without
/// native grounding
#[async_trait]
pub trait WebSearcher: Send + Sync {
    /// Returns an empty vec on no results or when searching is disabled.
    async fn search(&self, query: &str) -> Result<Vec<SearchResult>>;
}
