//! Backend adapters: one reqwest client per vendor family behind a
//! uniform chat contract

pub mod anthropic;
pub mod gemini;
pub mod groq;
pub mod openai;
pub mod types;

pub use anthropic::AnthropicBackend;
pub use gemini::GeminiBackend;
pub use groq::GroqBackend;
pub use openai::OpenAiBackend;
pub use types::{ChatBackend, ChatMessage, ChatReply, ChatRole};

use std::collections::HashMap;
use std::sync::Arc;

use crate::registry::ProviderFamily;

/// The set of adapters the orchestrator dispatches to, keyed by family
#[derive(Clone, Default)]
pub struct BackendSet {
    backends: HashMap<ProviderFamily, Arc<dyn ChatBackend>>,
}

impl BackendSet {
    pub fn new() -> Self {
        Self { backends: HashMap::new() }
    }

    /// Register an adapter under its own family. Registering the same
    /// family twice replaces the earlier adapter.
    pub fn register(mut self, backend: Arc<dyn ChatBackend>) -> Self {
        self.backends.insert(backend.family(), backend);
        self
    }

    pub fn get(&self, family: ProviderFamily) -> Option<Arc<dyn ChatBackend>> {
        self.backends.get(&family).cloned()
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
