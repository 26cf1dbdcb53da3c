//! Capability registry: the fixed table of known backends
//!
//! Every routable backend is described here once, at process start.
//! Descriptors never change after registration, so the registry is
//! safe to share across concurrent requests without locking.

use serde::{Deserialize, Serialize};

/// Coarse cost/quality classification used to pick a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelTier {
    Fast,
    Standard,
    Powerful,
}

impl std::fmt::Display for ModelTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "fast"),
            Self::Standard => write!(f, "standard"),
            Self::Powerful => write!(f, "powerful"),
        }
    }
}

/// A distinct LLM vendor integration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderFamily {
    Groq,
    Gemini,
    OpenAi,
    Anthropic,
}

impl ProviderFamily {
    /// Parse a family name, e.g. from a CLI flag. Unknown names map to
    /// `None` so callers fall back to automatic routing.
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "groq" => Some(Self::Groq),
            "gemini" | "google" => Some(Self::Gemini),
            "openai" => Some(Self::OpenAi),
            "anthropic" | "claude" => Some(Self::Anthropic),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProviderFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Groq => write!(f, "groq"),
            Self::Gemini => write!(f, "gemini"),
            Self::OpenAi => write!(f, "openai"),
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

/// Immutable description of one routable backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendDescriptor {
    pub id: &'static str,
    pub family: ProviderFamily,
    pub model: &'static str,
    pub tier: ModelTier,
    /// Whether the vendor can ground answers in live search natively.
    /// Backends without this get search results injected into the prompt
    /// by the orchestrator instead.
    pub supports_web_search: bool,
    pub label: &'static str,
}

/// Registry id the router falls closed to when a lookup misses
pub const DEFAULT_BACKEND_ID: &str = "groq_standard";

const BACKENDS: [BackendDescriptor; 6] = [
    BackendDescriptor {
        id: "groq_fast",
        family: ProviderFamily::Groq,
        model: "llama-3.1-8b-instant",
        tier: ModelTier::Fast,
        supports_web_search: false,
        label: "Llama 3.1 8B (Fast)",
    },
    BackendDescriptor {
        id: "groq_standard",
        family: ProviderFamily::Groq,
        model: "llama-3.3-70b-versatile",
        tier: ModelTier::Standard,
        supports_web_search: false,
        label: "Llama 3.3 70B",
    },
    BackendDescriptor {
        id: "gemini_flash",
        family: ProviderFamily::Gemini,
        model: "gemini-1.5-flash",
        tier: ModelTier::Standard,
        supports_web_search: true,
        label: "Gemini 1.5 Flash",
    },
    BackendDescriptor {
        id: "gemini_pro",
        family: ProviderFamily::Gemini,
        model: "gemini-1.5-pro",
        tier: ModelTier::Powerful,
        supports_web_search: true,
        label: "Gemini 1.5 Pro",
    },
    BackendDescriptor {
        id: "openai_mini",
        family: ProviderFamily::OpenAi,
        model: "gpt-4o-mini",
        tier: ModelTier::Fast,
        supports_web_search: true,
        label: "GPT-4o Mini",
    },
    BackendDescriptor {
        id: "claude_haiku",
        family: ProviderFamily::Anthropic,
        model: "claude-haiku-4-5",
        tier: ModelTier::Standard,
        supports_web_search: false,
        label: "Claude Haiku 4.5",
    },
];

/// Fixed id → descriptor mapping, built once and never mutated
#[derive(Debug, Clone, Copy)]
pub struct ModelRegistry {
    backends: &'static [BackendDescriptor],
}

impl ModelRegistry {
    pub fn new() -> Self {
        Self { backends: &BACKENDS }
    }

    pub fn get(&self, id: &str) -> Option<&BackendDescriptor> {
        self.backends.iter().find(|b| b.id == id)
    }

    /// Lookup that fails closed: an absent id resolves to the default
    /// backend rather than an error.
    pub fn get_or_default(&self, id: &str) -> &BackendDescriptor {
        self.get(id).unwrap_or_else(|| self.fallback())
    }

    pub fn fallback(&self) -> &BackendDescriptor {
        self.get(DEFAULT_BACKEND_ID).unwrap_or(&self.backends[0])
    }

    pub fn all(&self) -> &[BackendDescriptor] {
        self.backends
    }
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup() {
        let registry = ModelRegistry::new();
        let backend = registry.get("gemini_pro").unwrap();
        assert_eq!(backend.family, ProviderFamily::Gemini);
        assert_eq!(backend.tier, ModelTier::Powerful);
        assert!(backend.supports_web_search);
    }

    #[test]
    fn test_unknown_id_fails_closed_to_default() {
        let registry = ModelRegistry::new();
        let backend = registry.get_or_default("no_such_backend");
        assert_eq!(backend.id, DEFAULT_BACKEND_ID);
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = ModelRegistry::new();
        for backend in registry.all() {
            let count = registry.all().iter().filter(|b| b.id == backend.id).count();
            assert_eq!(count, 1, "duplicate id {}", backend.id);
        }
    }

    #[test]
    fn test_every_family_has_a_backend() {
        let registry = ModelRegistry::new();
        for family in [
            ProviderFamily::Groq,
            ProviderFamily::Gemini,
            ProviderFamily::OpenAi,
            ProviderFamily::Anthropic,
        ] {
            assert!(registry.all().iter().any(|b| b.family == family));
        }
    }

    #[test]
    fn test_family_from_string() {
        assert_eq!(ProviderFamily::from_string("groq"), Some(ProviderFamily::Groq));
        assert_eq!(ProviderFamily::from_string("Google"), Some(ProviderFamily::Gemini));
        assert_eq!(ProviderFamily::from_string("claude"), Some(ProviderFamily::Anthropic));
        assert_eq!(ProviderFamily::from_string("mistral"), None);
    }

    #[test]
    fn test_tier_display() {
        assert_eq!(ModelTier::Fast.to_string(), "fast");
        assert_eq!(ModelTier::Standard.to_string(), "standard");
        assert_eq!(ModelTier::Powerful.to_string(), "powerful");
    }
}
