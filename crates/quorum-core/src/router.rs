//! Provider router: resolves a classification into concrete backends
//!
//! The router is total: every combination of tier, web need, and
//! (possibly unknown) provider pin resolves to some registered backend.
//! Capability mismatches downgrade silently; nothing here errors.

use tracing::{debug, warn};

use crate::registry::{BackendDescriptor, ModelRegistry, ModelTier, ProviderFamily};

/// One resolved backend slot
#[derive(Debug, Clone, Copy)]
pub struct RoutingDecision {
    pub backend: BackendDescriptor,
    /// Whether native web search will actually be requested from the
    /// backend. Forced false when the backend lacks the capability,
    /// regardless of what the caller asked for.
    pub effective_web_search: bool,
}

/// Resolve a tier + web need + optional provider pin into one backend.
pub fn route(
    registry: &ModelRegistry,
    tier: ModelTier,
    wants_web: bool,
    preferred: Option<ProviderFamily>,
) -> RoutingDecision {
    let backend = match preferred {
        Some(family) => pinned_for(registry, family, tier),
        None if wants_web => web_default_for(registry, tier),
        None => default_for(registry, tier),
    };

    let effective_web_search = wants_web && backend.supports_web_search;
    if wants_web && !effective_web_search {
        debug!(
            "web search requested but {} has no native search, disabling",
            backend.id
        );
    }

    debug!(
        "routed tier={} web={} pin={:?} -> {}",
        tier, wants_web, preferred, backend.id
    );

    RoutingDecision {
        backend: *backend,
        effective_web_search,
    }
}

/// A pinned provider is honored at the closest tier the family offers.
fn pinned_for(
    registry: &ModelRegistry,
    family: ProviderFamily,
    tier: ModelTier,
) -> &BackendDescriptor {
    let id = match (family, tier) {
        (ProviderFamily::Groq, ModelTier::Fast) => "groq_fast",
        (ProviderFamily::Groq, _) => "groq_standard",
        (ProviderFamily::Gemini, ModelTier::Powerful) => "gemini_pro",
        (ProviderFamily::Gemini, _) => "gemini_flash",
        (ProviderFamily::OpenAi, _) => "openai_mini",
        (ProviderFamily::Anthropic, _) => "claude_haiku",
    };
    registry.get_or_default(id)
}

/// Tier defaults when the prompt needs live information: web-capable
/// families win at every tier.
fn web_default_for(registry: &ModelRegistry, tier: ModelTier) -> &BackendDescriptor {
    let id = match tier {
        ModelTier::Fast => "openai_mini",
        ModelTier::Standard => "gemini_flash",
        ModelTier::Powerful => "gemini_pro",
    };
    registry.get_or_default(id)
}

/// Tier defaults with no web need: cheapest family that handles the tier.
fn default_for(registry: &ModelRegistry, tier: ModelTier) -> &BackendDescriptor {
    let id = match tier {
        ModelTier::Fast => "groq_fast",
        ModelTier::Standard => "groq_standard",
        ModelTier::Powerful => "gemini_pro",
    };
    registry.get_or_default(id)
}

/// A valid side-by-side pairing for compare mode
#[derive(Debug, Clone, Copy)]
pub struct ComparePair {
    pub id: &'static str,
    pub a: &'static str,
    pub b: &'static str,
}

/// The enumerated set of valid compare pairings
pub const COMPARE_PAIRS: &[ComparePair] = &[
    ComparePair { id: "groq-gemini", a: "groq_standard", b: "gemini_flash" },
    ComparePair { id: "groq-claude", a: "groq_standard", b: "claude_haiku" },
    ComparePair { id: "openai-gemini", a: "openai_mini", b: "gemini_flash" },
    ComparePair { id: "openai-claude", a: "openai_mini", b: "claude_haiku" },
];

/// Pair used when the caller names no pairing or an unrecognized one
pub const DEFAULT_PAIR_ID: &str = "groq-gemini";

/// Resolve a compare-pair identifier into two distinct backends.
/// Unknown identifiers substitute the default pair rather than failing.
pub fn compare_pair(
    registry: &ModelRegistry,
    pair_id: Option<&str>,
) -> (BackendDescriptor, BackendDescriptor) {
    let requested = pair_id.unwrap_or(DEFAULT_PAIR_ID);
    let pair = COMPARE_PAIRS
        .iter()
        .find(|p| p.id == requested)
        .unwrap_or_else(|| {
            warn!("unknown compare pair '{}', using {}", requested, DEFAULT_PAIR_ID);
            &COMPARE_PAIRS[0]
        });
    (
        *registry.get_or_default(pair.a),
        *registry.get_or_default(pair.b),
    )
}

/// Fixed role assignment for best-answer mode. Not tier-routed: the
/// drafter/critic/synthesizer split is a static design decision.
#[derive(Debug, Clone, Copy)]
pub struct EnsembleRoles {
    pub drafter: BackendDescriptor,
    pub critic: BackendDescriptor,
    pub synthesizer: BackendDescriptor,
}

pub fn ensemble_roles(registry: &ModelRegistry) -> EnsembleRoles {
    EnsembleRoles {
        drafter: *registry.get_or_default("groq_standard"),
        critic: *registry.get_or_default("gemini_flash"),
        synthesizer: *registry.get_or_default("gemini_pro"),
    }
}
