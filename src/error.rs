use std::time::Duration;

/// Every failure a chat turn or a history operation can produce.
///
/// None of these are fatal: the controller turns them into a diagnostic
/// reply and goes back to accepting input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ChatError {
    /// The endpoint could not be reached at all.
    #[error("Failed to reach {endpoint}: {message}")]
    Network { endpoint: String, message: String },

    #[error("No response from {endpoint} after {after:?}")]
    Timeout { endpoint: String, after: Duration },

    /// The endpoint answered with a failure status.
    #[error("{0}")]
    Remote(String),

    #[error("Unexpected response format from Ollama")]
    MalformedResponse,

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("No saved chat with id {0}")]
    UnknownSession(String),
}

impl ChatError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        ChatError::Storage(err.to_string())
    }

    /// Transport-level failures, where the useful hint is "is the server running?".
    pub fn is_network(&self) -> bool {
        matches!(self, ChatError::Network { .. } | ChatError::Timeout { .. })
    }

    pub(crate) fn from_transport(
        endpoint: &str,
        err: reqwest::Error,
        timeout: Option<Duration>,
    ) -> Self {
        if err.is_timeout() {
            return ChatError::Timeout {
                endpoint: endpoint.to_string(),
                after: timeout.unwrap_or_default(),
            };
        }
        ChatError::Network {
            endpoint: endpoint.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(err: serde_json::Error) -> Self {
        ChatError::storage(err)
    }
}

pub type ChatResult<T> = Result<T, ChatError>;
