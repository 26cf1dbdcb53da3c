//! Prompt classifier: maps message text to a cost tier and a
//! web-search-need signal
//!
//! Pure keyword heuristics, no I/O. The tier rules are evaluated
//! top-to-bottom and the first match wins; that ordering is part of the
//! contract because the simple and complex phrase tables can both match
//! the same message.

use crate::registry::ModelTier;

/// Per-request classification result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub tier: ModelTier,
    pub needs_web: bool,
}

/// Phrases that signal a task needs a powerful model
const COMPLEX_SIGNALS: &[&str] = &[
    "synthesize",
    "summarize everything",
    "analyze in depth",
    "compare and contrast",
    "write a detailed",
    "create a comprehensive",
    "evaluate",
    "critique",
    "strategic",
    "multi-step",
    "step by step plan",
    "pros and cons",
    "legal",
    "financial",
    "technical architecture",
    "review this document",
    "rewrite",
    "improve this",
];

/// Phrases that are clearly simple lookups
const SIMPLE_SIGNALS: &[&str] = &[
    "what is",
    "define",
    "who is",
    "when did",
    "how many",
    "quick",
    "briefly",
    "tldr",
    "short answer",
    "yes or no",
    "summarize in one",
    "spell check",
];

/// Phrases that mark a prompt as time-sensitive, independent of tier
const TIME_SENSITIVE_SIGNALS: &[&str] = &[
    "today",
    "latest",
    "current",
    "this week",
    "right now",
    "news",
    "2024",
    "2025",
    "who won",
    "stock price",
    "weather in",
];

/// Classify a message into a cost tier plus a web-search-need signal.
///
/// Rules, first match wins:
/// 1. under 15 words with no complex phrase → fast
/// 2. simple-lookup phrase and under 40 words → fast
/// 3. complex phrase or over 120 words → powerful
/// 4. everything else → standard
///
/// An empty message matches no rule and lands on standard.
pub fn classify(message: &str) -> Classification {
    let lower = message.to_lowercase();
    let lower = lower.trim();
    let word_count = lower.split_whitespace().count();

    let has_complex = COMPLEX_SIGNALS.iter().any(|s| lower.contains(s));
    let has_simple = SIMPLE_SIGNALS.iter().any(|s| lower.contains(s));

    let tier = if word_count > 0 && word_count < 15 && !has_complex {
        ModelTier::Fast
    } else if has_simple && word_count < 40 {
        ModelTier::Fast
    } else if has_complex || word_count > 120 {
        ModelTier::Powerful
    } else {
        ModelTier::Standard
    };

    let needs_web = TIME_SENSITIVE_SIGNALS.iter().any(|s| lower.contains(s));

    Classification { tier, needs_web }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_is_fast() {
        let c = classify("what is the capital of France");
        assert_eq!(c.tier, ModelTier::Fast);
        assert!(!c.needs_web);
    }

    #[test]
    fn test_short_message_with_complex_phrase_is_not_fast() {
        // Under 15 words, but the complex-phrase check at the top takes
        // precedence for very short messages.
        let c = classify("critique my essay");
        assert_eq!(c.tier, ModelTier::Powerful);
    }

    #[test]
    fn test_simple_lookup_under_40_words_is_fast() {
        let msg = "define the term entropy as used in information theory and \
                   give me the units it is normally measured in please";
        assert!(msg.split_whitespace().count() >= 15);
        assert_eq!(classify(msg).tier, ModelTier::Fast);
    }

    #[test]
    fn test_complex_phrase_is_powerful() {
        let msg = "please write a detailed technical architecture proposal \
                   for our new ingestion pipeline covering storage and compute";
        assert_eq!(classify(msg).tier, ModelTier::Powerful);
    }

    #[test]
    fn test_long_message_is_powerful_regardless_of_phrases() {
        let msg = "word ".repeat(150);
        assert_eq!(classify(&msg).tier, ModelTier::Powerful);
    }

    #[test]
    fn test_medium_message_defaults_to_standard() {
        let msg = "can you help me figure out why the deployment keeps failing \
                   on the second stage of the pipeline when nothing changed";
        assert_eq!(classify(msg).tier, ModelTier::Standard);
    }

    #[test]
    fn test_empty_message_defaults_to_standard() {
        let c = classify("");
        assert_eq!(c.tier, ModelTier::Standard);
        assert!(!c.needs_web);

        let c = classify("   ");
        assert_eq!(c.tier, ModelTier::Standard);
        assert!(!c.needs_web);
    }

    #[test]
    fn test_time_sensitive_phrase_sets_needs_web() {
        assert!(classify("what's the latest news on the merger").needs_web);
        assert!(classify("who won the game last night").needs_web);
        assert!(classify("weather in Berlin").needs_web);
    }

    #[test]
    fn test_needs_web_is_independent_of_tier() {
        // Under 15 words so the tier is fast, but the time-sensitive phrase
        // still flips needs_web on.
        let c = classify("What's the latest stock price of Acme Corp today?");
        assert!(c.needs_web);
        assert_eq!(c.tier, ModelTier::Fast);

        // Long strategic request: powerful, but nothing time-sensitive.
        let msg = format!("strategic planning request {}", "detail ".repeat(150));
        let c = classify(&msg);
        assert_eq!(c.tier, ModelTier::Powerful);
        assert!(!c.needs_web);
    }

    #[test]
    fn test_all_short_messages_without_complex_phrases_are_fast() {
        for msg in [
            "hello there",
            "thanks for the help",
            "how do I exit vim",
            "translate bonjour to English",
        ] {
            assert!(msg.split_whitespace().count() < 15);
            assert_eq!(classify(msg).tier, ModelTier::Fast, "message: {msg}");
        }
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify("CRITIQUE this paragraph").tier, ModelTier::Powerful);
        assert!(classify("LATEST numbers please").needs_web);
    }
}
