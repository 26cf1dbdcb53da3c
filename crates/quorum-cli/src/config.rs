//! CLI configuration loading
//!
//! Config lives at `~/.quorum/config.toml`; environment variables win
//! over file values so keys never have to be written to disk.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuorumConfig {
    #[serde(default)]
    pub keys: KeysConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub assistant: AssistantConfig,
}

#[derive(Clone, Serialize, Deserialize, Default)]
pub struct KeysConfig {
    #[serde(default)]
    pub groq: String,
    #[serde(default)]
    pub gemini: String,
    #[serde(default)]
    pub openai: String,
    #[serde(default)]
    pub anthropic: String,
    #[serde(default)]
    pub serper: String,
}

impl std::fmt::Debug for KeysConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeysConfig")
            .field("groq", &mask_secret(&self.groq))
            .field("gemini", &mask_secret(&self.gemini))
            .field("openai", &mask_secret(&self.openai))
            .field("anthropic", &mask_secret(&self.anthropic))
            .field("serper", &mask_secret(&self.serper))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Defaults to `<config dir>/quorum.db` when unset
    #[serde(default)]
    pub db_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default = "default_role_text")]
    pub role_text: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            role_text: default_role_text(),
            history_limit: default_history_limit(),
        }
    }
}

fn default_role_text() -> String {
    quorum_core::DEFAULT_ROLE_TEXT.to_string()
}

fn default_history_limit() -> usize {
    20
}

pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".quorum")
}

impl QuorumConfig {
    pub fn load(custom_path: &Option<PathBuf>) -> Result<Self> {
        let path = custom_path
            .clone()
            .unwrap_or_else(|| config_dir().join("config.toml"));

        let mut config = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config at {}", path.display()))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config at {}", path.display()))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        override_from_env(&mut self.keys.groq, "GROQ_API_KEY");
        override_from_env(&mut self.keys.gemini, "GEMINI_API_KEY");
        override_from_env(&mut self.keys.openai, "OPENAI_API_KEY");
        override_from_env(&mut self.keys.anthropic, "ANTHROPIC_API_KEY");
        override_from_env(&mut self.keys.serper, "SERPER_API_KEY");
    }

    pub fn db_path(&self) -> PathBuf {
        self.storage
            .db_path
            .clone()
            .unwrap_or_else(|| config_dir().join("quorum.db"))
    }
}

fn override_from_env(slot: &mut String, var: &str) {
    if let Ok(value) = std::env::var(var) {
        if !value.is_empty() {
            *slot = value;
        }
    }
}

/// Shows first 3 and last 4 chars for keys longer than 7 chars,
/// otherwise "***".
fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config: QuorumConfig = toml::from_str("").unwrap();
        assert_eq!(config.keys.groq, "");
        assert!(config.storage.db_path.is_none());
        assert_eq!(config.assistant.history_limit, 20);
        assert_eq!(config.assistant.role_text, quorum_core::DEFAULT_ROLE_TEXT);
    }

    #[test]
    fn test_parse_full_config() {
        let config: QuorumConfig = toml::from_str(
            r#"
            [keys]
            groq = "gsk-123"
            serper = "serp-456"

            [storage]
            db_path = "/tmp/test.db"

            [assistant]
            role_text = "You are terse."
            history_limit = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.keys.groq, "gsk-123");
        assert_eq!(config.keys.serper, "serp-456");
        assert_eq!(config.db_path(), PathBuf::from("/tmp/test.db"));
        assert_eq!(config.assistant.role_text, "You are terse.");
        assert_eq!(config.assistant.history_limit, 5);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("gsk-abcdefgh1234"), "gsk...1234");
    }

    #[test]
    fn test_debug_masks_keys() {
        let keys = KeysConfig {
            groq: "gsk-secret-value".to_string(),
            ..Default::default()
        };
        let debug = format!("{:?}", keys);
        assert!(!debug.contains("gsk-secret-value"));
    }
}
