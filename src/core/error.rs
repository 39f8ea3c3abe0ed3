//! Error types for the gating engine

use thiserror::Error;

/// Result type used throughout the crate
pub type GateResult<T> = std::result::Result<T, GateError>;

/// Errors produced while gating a tool invocation
///
/// Denials are normally returned as structured outcomes. The denial variants
/// here exist for callers that convert an outcome into a `Result` with
/// [`ExecutionOutcome::into_result`](crate::executor::ExecutionOutcome::into_result).
#[derive(Debug, Error)]
pub enum GateError {
    /// Allowlist or rate-limit rejection
    #[error("Policy denied: {reason}")]
    PolicyDenied { reason: String },

    /// Explicit negative decision from the decision provider
    #[error("Approval denied by {approver}: {reason}")]
    ApprovalDenied { approver: String, reason: String },

    /// No decision arrived before the approval timeout
    #[error("{reason}")]
    ApprovalTimedOut { escalate: bool, reason: String },

    /// The decision provider itself failed
    #[error("Approval provider failed for request '{request_id}': {source}")]
    ApprovalProviderFailed {
        request_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The approved operation failed
    #[error("Tool '{tool_name}' failed: {source}")]
    ExecutionFailed {
        tool_name: String,
        #[source]
        source: anyhow::Error,
    },

    /// Request id generation produced a collision
    #[error("Duplicate approval request id: {0}")]
    DuplicateRequestId(String),

    /// The approval wait was cancelled by the caller
    #[error("Approval request '{request_id}' was cancelled")]
    Cancelled { request_id: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GateError {
    /// Whether this error is a denial rather than a failure
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            GateError::PolicyDenied { .. }
                | GateError::ApprovalDenied { .. }
                | GateError::ApprovalTimedOut { .. }
        )
    }

    /// Whether this error signals a broken internal invariant
    pub fn is_fatal(&self) -> bool {
        matches!(self, GateError::DuplicateRequestId(_))
    }
}
