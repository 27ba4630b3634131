//! Error classification and recovery hints.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Authentication,
    RateLimit,
    Network,
    Timeout,
    Server,
    Api,
    Configuration,
    Serialization,
    ToolExecution,
    RunLoop,
    Unknown,
}

/// Suggested recovery action, shown next to the manager's last error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoverySuggestion {
    Retry,
    RetryWithBackoff,
    CheckCredentials,
    CheckConfiguration,
    IncreaseTimeout,
    RaiseIterationLimit,
    CheckToolImplementation,
}

impl std::fmt::Display for RecoverySuggestion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hint = match self {
            Self::Retry => "try again",
            Self::RetryWithBackoff => "wait a moment and try again",
            Self::CheckCredentials => "check the configured API key",
            Self::CheckConfiguration => "check the configuration file and environment",
            Self::IncreaseTimeout => "increase the request timeout",
            Self::RaiseIterationLimit => "raise run.max_iterations",
            Self::CheckToolImplementation => "check the tool implementation",
        };
        f.write_str(hint)
    }
}
