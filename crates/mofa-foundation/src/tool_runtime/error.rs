use thiserror::Error;

/// Errors surfaced by the tool execution pipeline. `kind()` returns the
/// stable identifier used by callers/tests to match on error category
/// without pattern-matching the enum itself.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ToolRuntimeError {
    #[error("tool validation failed: {0}")]
    Validation(String),

    #[error("tool security check failed: {0}")]
    Security(String),

    #[error("tool policy denied execution: {0}")]
    Policy(String),

    #[error("tool rate/concurrency limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("tool execution failed: {0}")]
    Execution(String),

    #[error("tool call timed out after {0}s")]
    Timeout(u64),

    #[error("circuit breaker open for tool '{0}'")]
    CircuitOpen(String),

    #[error("idempotency conflict for key '{0}'")]
    IdempotencyConflict(String),

    #[error("tool kind '{0}' is not supported by this runtime")]
    Unsupported(String),

    #[error("http request error: {0}")]
    Http(String),
}

impl ToolRuntimeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ToolRuntimeError::Validation(_) => "tool_validation_error",
            ToolRuntimeError::Security(_) => "tool_security_error",
            ToolRuntimeError::Policy(_) => "tool_policy_error",
            ToolRuntimeError::LimitExceeded(_) => "tool_limit_exceeded",
            ToolRuntimeError::Execution(_) => "tool_execution_error",
            ToolRuntimeError::Timeout(_) => "tool_timeout",
            ToolRuntimeError::CircuitOpen(_) => "circuit_open",
            ToolRuntimeError::IdempotencyConflict(_) => "idempotency_conflict",
            ToolRuntimeError::Unsupported(_) => "tool_validation_error",
            ToolRuntimeError::Http(_) => "tool_execution_error",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ToolRuntimeError::Execution(_) | ToolRuntimeError::Timeout(_) | ToolRuntimeError::Http(_)
        )
    }
}
