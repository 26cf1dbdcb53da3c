//! Error taxonomy for the chat core
//!
//! Validation failures and backend failures surface to the caller;
//! capability mismatches and unknown identifiers are silent downgrades
//! handled inside the router and never reach this enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Request rejected before any backend call was made
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A backend adapter call failed. Never retried at this layer.
    #[error("{provider} backend call failed: {source}")]
    Backend {
        provider: String,
        #[source]
        source: anyhow::Error,
    },

    /// The persistence port failed
    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),
}

impl CoreError {
    /// Whether the caller supplied a bad request (vs an upstream failure)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_client_error_predicate() {
        assert!(CoreError::InvalidRequest("missing message".into()).is_client_error());
        let backend = CoreError::Backend {
            provider: "groq".into(),
            source: anyhow!("status 500"),
        };
        assert!(!backend.is_client_error());
        assert!(!CoreError::Storage(anyhow!("locked")).is_client_error());
    }

    #[test]
    fn test_backend_error_message_names_provider() {
        let err = CoreError::Backend {
            provider: "gemini".into(),
            source: anyhow!("rate limit"),
        };
        let text = err.to_string();
        assert!(text.contains("gemini"));
        assert!(text.contains("rate limit"));
    }
}
