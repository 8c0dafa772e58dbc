//! Outcome of an agent call.

use std::time::Duration;
use thiserror::Error;

use realitycheck_core::SchemaViolation;

use crate::providers::ProviderError;
use crate::resilience::LlmUsage;

/// Why an agent call failed.
#[derive(Error, Debug, Clone)]
pub enum AgentError {
    /// Backend text could not be parsed as JSON
    #[error("Validation failed: invalid JSON: {0}")]
    InvalidJson(String),

    /// Parsed JSON did not satisfy the output schema
    #[error("Validation failed: {0}")]
    SchemaViolation(#[from] SchemaViolation),

    /// Rate limited and the configured wait ceiling was reached
    #[error("Rate limited after {waits} waits: {message}")]
    RateLimited { waits: u32, message: String },

    /// Transport or backend error
    #[error("{0}")]
    Transport(ProviderError),

    /// The backend call exceeded its deadline
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),
}

/// Coarse classification of [`AgentError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentErrorKind {
    Validation,
    RateLimit,
    Transport,
}

impl AgentError {
    pub fn kind(&self) -> AgentErrorKind {
        match self {
            AgentError::InvalidJson(_) | AgentError::SchemaViolation(_) => {
                AgentErrorKind::Validation
            }
            AgentError::RateLimited { .. } => AgentErrorKind::RateLimit,
            AgentError::Transport(e) if e.is_rate_limited() => AgentErrorKind::RateLimit,
            AgentError::Transport(_) | AgentError::Timeout(_) => AgentErrorKind::Transport,
        }
    }

    /// Whether this failure should take the rate-limit wait path.
    pub fn is_rate_limited(&self) -> bool {
        self.kind() == AgentErrorKind::RateLimit
    }
}

impl From<ProviderError> for AgentError {
    fn from(error: ProviderError) -> Self {
        AgentError::Transport(error)
    }
}

/// Result of running one agent.
///
/// Failures are values, never panics: a caller always gets either typed data
/// or a message, plus the usage spent either way.
#[derive(Debug, Clone)]
pub enum AgentResult<T> {
    Success {
        data: T,
        raw_output: String,
        attempts: u32,
        usage: LlmUsage,
    },
    Failure {
        error: AgentError,
        /// Last raw backend text observed, if any attempt got that far
        raw_output: Option<String>,
        attempts: u32,
        usage: LlmUsage,
    },
}

impl<T> AgentResult<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, AgentResult::Success { .. })
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            AgentResult::Success { data, .. } => Some(data),
            AgentResult::Failure { .. } => None,
        }
    }

    pub fn into_data(self) -> Option<T> {
        match self {
            AgentResult::Success { data, .. } => Some(data),
            AgentResult::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AgentError> {
        match self {
            AgentResult::Success { .. } => None,
            AgentResult::Failure { error, .. } => Some(error),
        }
    }

    pub fn raw_output(&self) -> Option<&str> {
        match self {
            AgentResult::Success { raw_output, .. } => Some(raw_output),
            AgentResult::Failure { raw_output, .. } => raw_output.as_deref(),
        }
    }

    /// Number of backend calls made, including rate-limited ones.
    pub fn attempts(&self) -> u32 {
        match self {
            AgentResult::Success { attempts, .. } | AgentResult::Failure { attempts, .. } => {
                *attempts
            }
        }
    }

    pub fn usage(&self) -> &LlmUsage {
        match self {
            AgentResult::Success { usage, .. } | AgentResult::Failure { usage, .. } => usage,
        }
    }
}
