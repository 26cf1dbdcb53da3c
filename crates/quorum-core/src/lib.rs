//! quorum-core: request classifier, provider router, and multi-backend
//! chat orchestrator
//!
//! This crate provides:
//! - A fixed capability registry of known backends across four vendor
//!   families, tagged with cost tier and web-search capability
//! - A pure keyword classifier mapping message text to a cost tier and a
//!   web-search-need signal
//! - A total router resolving tier + web need + optional provider pin
//!   into concrete backend selections
//! - A context builder assembling system prompts from role text,
//!   layered knowledge, and live search results
//! - An orchestrator with three dispatch strategies: single call,
//!   concurrent compare, and the sequential best-answer ensemble

pub mod classify;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod ports;
pub mod providers;
pub mod registry;
pub mod router;
pub mod search;
pub mod types;

// Re-export main types for convenience
pub use classify::{Classification, classify};
pub use context::{COMPANY_LAYER, DEFAULT_ROLE_TEXT, build_system_prompt};
pub use error::{CoreError, CoreResult};
pub use orchestrator::{
    CompareReply, CompareRequest, CompareSide, EnsembleParticipants, EnsembleReply,
    EnsembleRequest, Orchestrator, OrchestratorConfig, SingleReply, SingleRequest,
};
pub use ports::{KnowledgeStore, TranscriptStore, WebSearcher};
pub use providers::{
    AnthropicBackend, BackendSet, ChatBackend, ChatMessage, ChatReply, ChatRole, GeminiBackend,
    GroqBackend, OpenAiBackend,
};
pub use registry::{BackendDescriptor, ModelRegistry, ModelTier, ProviderFamily};
pub use router::{RoutingDecision, compare_pair, ensemble_roles, route};
pub use search::SerperSearch;
pub use types::{DispatchMode, KnowledgeEntry, RequestContext, SearchResult, StoredMessage};
