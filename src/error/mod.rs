//! Error types for confab.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all confab operations.
#[derive(Error, Debug)]
pub enum ConfabError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Failed to decode arguments for tool '{tool_name}': {message}")]
    ToolDecode { tool_name: String, message: String },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Run exceeded the maximum of {max_iterations} iterations")]
    IterationLimit { max_iterations: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    #[error("Message manager is no longer running")]
    ChannelClosed,
}

impl ConfabError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool execution error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolExecution {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Authentication,
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Network(_) => ErrorCategory::Network,
            Self::Timeout(_) => ErrorCategory::Timeout,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                429 => ErrorCategory::RateLimit,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::ToolDecode { .. } | Self::ToolExecution { .. } | Self::UnknownTool(_) => {
                ErrorCategory::ToolExecution
            }
            Self::IterationLimit { .. } => ErrorCategory::RunLoop,
            _ => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is potentially retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Network => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Server => RecoverySuggestion::RetryWithBackoff,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution => RecoverySuggestion::CheckToolImplementation,
            ErrorCategory::RunLoop => RecoverySuggestion::RaiseIterationLimit,
            _ => RecoverySuggestion::Retry,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ConfabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_maps_to_category() {
        assert_eq!(
            ConfabError::api(401, "nope").category(),
            ErrorCategory::Authentication
        );
        assert_eq!(
            ConfabError::api(429, "slow down").category(),
            ErrorCategory::RateLimit
        );
        assert_eq!(ConfabError::api(503, "down").category(), ErrorCategory::Server);
        assert_eq!(ConfabError::api(400, "bad").category(), ErrorCategory::Api);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(ConfabError::Timeout(10).is_retryable());
        assert!(ConfabError::api(502, "gateway").is_retryable());
        assert!(!ConfabError::api(400, "bad").is_retryable());
        assert!(!ConfabError::UnknownTool("x".into()).is_retryable());
        assert!(!ConfabError::IterationLimit { max_iterations: 3 }.is_retryable());
    }

    #[test]
    fn tool_errors_suggest_checking_the_tool() {
        let err = ConfabError::ToolDecode {
            tool_name: "search_web".into(),
            message: "missing field `query`".into(),
        };
        assert_eq!(
            err.recovery_suggestion(),
            RecoverySuggestion::CheckToolImplementation
        );
        assert!(err.to_string().contains("search_web"));
    }
}
