//! Dispatch orchestration: single, compare, and best-answer modes
//!
//! Each inbound request is handled independently: classify, route,
//! gather context, dispatch, persist. Compare mode fans out to two
//! backends and joins both results; best-answer mode runs a strictly
//! sequential draft → critique → synthesize pipeline. Nothing here is
//! retried, and no partial results survive a failed call.

use std::sync::Arc;

use anyhow::anyhow;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classify::classify;
use crate::context::{COMPANY_LAYER, DEFAULT_ROLE_TEXT, build_system_prompt};
use crate::error::{CoreError, CoreResult};
use crate::ports::{KnowledgeStore, TranscriptStore, WebSearcher};
use crate::providers::{BackendSet, ChatMessage, ChatReply};
use crate::registry::{BackendDescriptor, ModelRegistry, ModelTier, ProviderFamily};
use crate::router::{compare_pair, ensemble_roles, route};
use crate::types::{DispatchMode, KnowledgeEntry, RequestContext, SearchResult};

/// Label stored against the combined transcript row of an ensemble run
const ENSEMBLE_LABEL: &str = "Best Answer Ensemble";

/// How many rows to read back from the store before capping to the
/// configured history window
const HISTORY_READ_LIMIT: usize = 50;

/// Single-mode request
#[derive(Debug, Clone)]
pub struct SingleRequest {
    pub context: RequestContext,
    pub message: String,
    pub preferred: Option<ProviderFamily>,
    pub want_web_search: bool,
}

/// Compare-mode request
#[derive(Debug, Clone)]
pub struct CompareRequest {
    pub context: RequestContext,
    pub message: String,
    /// Identifier from the fixed pair table; unknown values silently
    /// substitute the default pair.
    pub pair: Option<String>,
    pub want_web_search: bool,
}

/// Best-answer-mode request
#[derive(Debug, Clone)]
pub struct EnsembleRequest {
    pub context: RequestContext,
    pub message: String,
    pub want_web_search: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SingleReply {
    pub text: String,
    pub tier: ModelTier,
    pub provider: ProviderFamily,
    pub model_label: String,
    pub searched_web: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareSide {
    pub text: String,
    pub provider: ProviderFamily,
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompareReply {
    pub a: CompareSide,
    pub b: CompareSide,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsembleParticipants {
    pub drafter: String,
    pub critic: String,
    pub synthesizer: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct EnsembleReply {
    pub draft: String,
    pub critique: String,
    pub final_text: String,
    pub participants: EnsembleParticipants,
    pub searched_web: bool,
}

/// Orchestrator tuning knobs
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Role instructions every system prompt starts with
    pub role_text: String,
    /// Prior turns passed to backends
    pub history_limit: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            role_text: DEFAULT_ROLE_TEXT.to_string(),
            history_limit: 20,
        }
    }
}

/// Stateless per-request dispatcher over the registry, adapters, and ports
pub struct Orchestrator {
    registry: ModelRegistry,
    backends: BackendSet,
    transcripts: Arc<dyn TranscriptStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    searcher: Arc<dyn WebSearcher>,
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(
        backends: BackendSet,
        transcripts: Arc<dyn TranscriptStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        searcher: Arc<dyn WebSearcher>,
    ) -> Self {
        Self {
            registry: ModelRegistry::new(),
            backends,
            transcripts,
            knowledge,
            searcher,
            config: OrchestratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    /// One classification, one routing decision, one backend call.
    pub async fn handle_single(&self, req: SingleRequest) -> CoreResult<SingleReply> {
        validate(&req.context, &req.message)?;

        let classification = classify(&req.message);
        let wants_web = req.want_web_search || classification.needs_web;
        let decision = route(&self.registry, classification.tier, wants_web, req.preferred);
        info!(
            "single dispatch: tier={} backend={} native_search={}",
            classification.tier, decision.backend.id, decision.effective_web_search
        );

        let knowledge = self.load_knowledge(&req.context).await?;
        let injected = if wants_web && !decision.effective_web_search {
            self.fetch_injected(&req.message).await
        } else {
            vec![]
        };
        let system = build_system_prompt(&self.config.role_text, &knowledge, &injected);

        let mut messages = self.load_history(&req.context.session_id).await?;
        messages.push(ChatMessage::user(&req.message));

        let reply = self
            .call_backend(&decision.backend, &messages, &system, decision.effective_web_search)
            .await?;
        let searched_web = reply.searched_web || !injected.is_empty();

        self.persist_turn(&req.context, &req.message, &reply.text, decision.backend.label, DispatchMode::Single)
            .await?;

        Ok(SingleReply {
            text: reply.text,
            tier: classification.tier,
            provider: decision.backend.family,
            model_label: decision.backend.label.to_string(),
            searched_web,
        })
    }

    /// Same prompt to two backends, issued concurrently; both results
    /// are required, so either failure fails the request.
    pub async fn handle_compare(&self, req: CompareRequest) -> CoreResult<CompareReply> {
        validate(&req.context, &req.message)?;

        let (a, b) = compare_pair(&self.registry, req.pair.as_deref());
        info!("compare dispatch: {} vs {}", a.id, b.id);

        let knowledge = self.load_knowledge(&req.context).await?;
        // The prompt must stay identical for both sides, so compare mode
        // never injects search text; each side gets native grounding only
        // if its backend supports it.
        let system = build_system_prompt(&self.config.role_text, &knowledge, &[]);
        let messages = vec![ChatMessage::user(&req.message)];

        let search_a = req.want_web_search && a.supports_web_search;
        let search_b = req.want_web_search && b.supports_web_search;

        let (reply_a, reply_b) = tokio::try_join!(
            self.call_backend(&a, &messages, &system, search_a),
            self.call_backend(&b, &messages, &system, search_b),
        )?;

        let combined = format!(
            "**{}:**\n{}\n\n---\n\n**{}:**\n{}",
            a.label, reply_a.text, b.label, reply_b.text
        );
        self.persist_turn(&req.context, &req.message, &combined, "compare", DispatchMode::Compare)
            .await?;

        Ok(CompareReply {
            a: side(a, reply_a),
            b: side(b, reply_b),
        })
    }

    /// Draft → critique → synthesize, strictly in order; each stage's
    /// prompt embeds the previous stage's output. Any stage failure
    /// aborts the pipeline and discards partial output.
    pub async fn handle_ensemble(&self, req: EnsembleRequest) -> CoreResult<EnsembleReply> {
        validate(&req.context, &req.message)?;

        let roles = ensemble_roles(&self.registry);
        info!(
            "ensemble dispatch: draft={} critique={} synthesize={}",
            roles.drafter.id, roles.critic.id, roles.synthesizer.id
        );

        let knowledge = self.load_knowledge(&req.context).await?;
        let base_system = build_system_prompt(&self.config.role_text, &knowledge, &[]);

        // Stage 1: draft. Web grounding follows the caller's preference,
        // injected if the drafter cannot search natively.
        let draft_native = req.want_web_search && roles.drafter.supports_web_search;
        let injected = if req.want_web_search && !draft_native {
            self.fetch_injected(&req.message).await
        } else {
            vec![]
        };
        let draft_system = format!(
            "{}\nProvide a thorough, well-structured response.",
            build_system_prompt(&self.config.role_text, &knowledge, &injected)
        );
        debug!("ensemble stage: drafting with {}", roles.drafter.id);
        let draft = self
            .call_backend(
                &roles.drafter,
                &[ChatMessage::user(&req.message)],
                &draft_system,
                draft_native,
            )
            .await?;

        // Stage 2: critique. Search is always on here; fact-checking is
        // the critic's purpose.
        let critic_search = roles.critic.supports_web_search;
        let critique_prompt = format!(
            "Review this AI-generated response to the user's question and identify any gaps, \
             inaccuracies, or improvements needed.\n\n\
             User's question: \"{}\"\n\n\
             Draft response:\n{}\n\n\
             Provide a concise critique with specific improvement suggestions.",
            req.message, draft.text
        );
        debug!("ensemble stage: critiquing with {}", roles.critic.id);
        let critique = self
            .call_backend(
                &roles.critic,
                &[ChatMessage::user(critique_prompt)],
                "You are an expert AI response reviewer. Be specific and constructive.",
                critic_search,
            )
            .await?;

        // Stage 3: synthesize from question + draft + critique.
        let synth_prompt = format!(
            "Synthesize the best possible answer using the draft and the critique below.\n\n\
             User's question: \"{}\"\n\n\
             Draft:\n{}\n\n\
             Critique:\n{}\n\n\
             Write the final, improved response directly. Do not mention the draft or critique process.",
            req.message, draft.text, critique.text
        );
        let synth_system = format!(
            "{base_system}\nWrite the final, polished, authoritative response."
        );
        debug!("ensemble stage: synthesizing with {}", roles.synthesizer.id);
        let final_reply = self
            .call_backend(
                &roles.synthesizer,
                &[ChatMessage::user(synth_prompt)],
                &synth_system,
                false,
            )
            .await?;

        let searched_web = draft.searched_web || critique.searched_web || !injected.is_empty();

        self.persist_turn(
            &req.context,
            &req.message,
            &final_reply.text,
            ENSEMBLE_LABEL,
            DispatchMode::BestAnswer,
        )
        .await?;

        Ok(EnsembleReply {
            draft: draft.text,
            critique: critique.text,
            final_text: final_reply.text,
            participants: EnsembleParticipants {
                drafter: roles.drafter.label.to_string(),
                critic: roles.critic.label.to_string(),
                synthesizer: roles.synthesizer.label.to_string(),
            },
            searched_web,
        })
    }

    async fn call_backend(
        &self,
        backend: &BackendDescriptor,
        messages: &[ChatMessage],
        system: &str,
        want_web_search: bool,
    ) -> CoreResult<ChatReply> {
        let adapter = self.backends.get(backend.family).ok_or_else(|| CoreError::Backend {
            provider: backend.family.to_string(),
            source: anyhow!("no adapter registered for {}", backend.family),
        })?;
        adapter
            .chat(messages, backend.model, system, want_web_search)
            .await
            .map_err(|source| CoreError::Backend {
                provider: backend.family.to_string(),
                source,
            })
    }

    /// The universal company layer plus the caller's own layers.
    async fn load_knowledge(&self, context: &RequestContext) -> CoreResult<Vec<KnowledgeEntry>> {
        let mut layers = vec![COMPANY_LAYER.to_string()];
        for layer in &context.knowledge_layers {
            if layer != COMPANY_LAYER {
                layers.push(layer.clone());
            }
        }
        self.knowledge
            .entries_for(&layers)
            .await
            .map_err(CoreError::Storage)
    }

    async fn load_history(&self, session_id: &str) -> CoreResult<Vec<ChatMessage>> {
        let stored = self
            .transcripts
            .recent(session_id, HISTORY_READ_LIMIT)
            .await
            .map_err(CoreError::Storage)?;

        let mut messages: Vec<ChatMessage> = stored
            .iter()
            .filter_map(|m| match m.role.as_str() {
                "user" => Some(ChatMessage::user(&m.content)),
                "assistant" => Some(ChatMessage::assistant(&m.content)),
                _ => None,
            })
            .collect();

        if messages.len() > self.config.history_limit {
            messages.drain(..messages.len() - self.config.history_limit);
        }
        Ok(messages)
    }

    /// Search failures degrade to no injection; the request proceeds.
    async fn fetch_injected(&self, query: &str) -> Vec<SearchResult> {
        match self.searcher.search(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("web search failed, continuing without injection: {}", e);
                vec![]
            }
        }
    }

    async fn persist_turn(
        &self,
        context: &RequestContext,
        user_message: &str,
        assistant_text: &str,
        model_label: &str,
        mode: DispatchMode,
    ) -> CoreResult<()> {
        self.transcripts
            .append(&context.session_id, &context.user_name, "user", user_message, "", mode)
            .await
            .map_err(CoreError::Storage)?;
        self.transcripts
            .append(
                &context.session_id,
                &context.user_name,
                "assistant",
                assistant_text,
                model_label,
                mode,
            )
            .await
            .map_err(CoreError::Storage)
    }
}

fn side(backend: BackendDescriptor, reply: ChatReply) -> CompareSide {
    CompareSide {
        text: reply.text,
        provider: backend.family,
        label: backend.label.to_string(),
    }
}

/// Reject bad input before any backend call.
fn validate(context: &RequestContext, message: &str) -> CoreResult<()> {
    if message.trim().is_empty() {
        return Err(CoreError::InvalidRequest("message must not be empty".to_string()));
    }
    if context.session_id.trim().is_empty() {
        return Err(CoreError::InvalidRequest("session id must not be empty".to_string()));
    }
    if context.user_name.trim().is_empty() {
        return Err(CoreError::InvalidRequest("user name must not be empty".to_string()));
    }
    Ok(())
}
