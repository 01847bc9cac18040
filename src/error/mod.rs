//! Error types for Scouter.

pub mod unified;

pub use unified::{ErrorCategory, RecoverySuggestion};

use thiserror::Error;

/// Primary error type for all Scouter operations.
#[derive(Error, Debug)]
pub enum ScouterError {
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

    #[error("Provider error: {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("Max retries exceeded after {attempts} attempts: {source}")]
    MaxRetriesExceeded {
        attempts: u32,
        #[source]
        source: Box<ScouterError>,
    },

    #[error("Tool execution error: {tool_name}: {message}")]
    ToolExecution { tool_name: String, message: String },

    #[error("Invalid tool definition: {tool_name}: {message}")]
    InvalidToolDefinition { tool_name: String, message: String },

    #[error("Invalid run state: {0}")]
    InvalidRunState(String),

    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl ScouterError {
    /// Create an API error from a status code and message.
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

    /// Create a tool definition error.
    pub fn tool_definition(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidToolDefinition {
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
                408 | 409 | 500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::MaxRetriesExceeded { source, .. } => source.category(),
            Self::ToolExecution { .. } => ErrorCategory::ToolExecution,
            Self::InvalidToolDefinition { .. } => ErrorCategory::ToolDefinition,
            Self::InvalidRunState(_) => ErrorCategory::RunState,
            Self::Io(_) | Self::Persistence(_) => ErrorCategory::Persistence,
            Self::Provider { .. } => ErrorCategory::Unknown,
        }
    }

    /// Whether this error is transient and worth retrying.
    ///
    /// An exhausted retry is never retryable again.
    pub fn is_retryable(&self) -> bool {
        if matches!(self, Self::MaxRetriesExceeded { .. }) {
            return false;
        }
        matches!(
            self.category(),
            ErrorCategory::RateLimit
                | ErrorCategory::Network
                | ErrorCategory::Timeout
                | ErrorCategory::Server
        )
    }

    /// Whether this error originates from the model provider.
    pub fn is_llm_error(&self) -> bool {
        matches!(
            self,
            Self::Api { .. }
                | Self::Network(_)
                | Self::Authentication(_)
                | Self::RateLimited { .. }
                | Self::Timeout(_)
                | Self::Provider { .. }
                | Self::MaxRetriesExceeded { .. }
        )
    }

    /// Whether this error aborts a run.
    ///
    /// Tool failures are recorded as failed results in the batch instead.
    pub fn is_fatal_to_run(&self) -> bool {
        !matches!(self, Self::ToolExecution { .. })
    }

    /// Suggest recovery actions.
    pub fn recovery_suggestion(&self) -> RecoverySuggestion {
        match self.category() {
            ErrorCategory::Authentication => RecoverySuggestion::CheckCredentials,
            ErrorCategory::RateLimit | ErrorCategory::Network | ErrorCategory::Server => {
                RecoverySuggestion::RetryWithBackoff
            }
            ErrorCategory::Timeout => RecoverySuggestion::IncreaseTimeout,
            ErrorCategory::Configuration => RecoverySuggestion::CheckConfiguration,
            ErrorCategory::ToolExecution | ErrorCategory::ToolDefinition => {
                RecoverySuggestion::CheckToolImplementation
            }
            ErrorCategory::RunState => RecoverySuggestion::FixCaller,
            _ => RecoverySuggestion::ContactSupport,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ScouterError>;
