//! Approval request and decision types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

/// Request id carried by decisions manufactured on timeout
pub const TIMEOUT_REQUEST_ID: &str = "timeout";

/// Approver recorded when a timeout is treated as a plain denial
pub const SYSTEM_APPROVER: &str = "system";

/// Approver recorded when a timeout must be escalated to a human
pub const ESCALATION_APPROVER: &str = "escalation-required";

/// A request for an approval decision on one tool invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRequest {
    /// Unique id within the registry's lifetime
    pub request_id: String,
    /// Name of the tool
    pub tool_name: String,
    /// Tool parameters, passed through untouched
    pub params: Value,
    /// Agent that asked for the tool
    pub agent_id: String,
    pub session_id: String,
    /// Free-text explanation of why the tool is being called
    pub context: String,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRequest {
    /// Create a request stamped with the current time
    pub fn new(
        request_id: impl Into<String>,
        tool_name: impl Into<String>,
        params: Value,
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            tool_name: tool_name.into(),
            params,
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            context: context.into(),
            created_at: Utc::now(),
        }
    }

    /// Approve this request
    pub fn approve(&self, approver: impl Into<String>) -> ApprovalDecision {
        ApprovalDecision::approved(&self.request_id, approver)
    }

    /// Deny this request with a reason
    pub fn deny(&self, approver: impl Into<String>, reason: impl Into<String>) -> ApprovalDecision {
        ApprovalDecision::denied(&self.request_id, approver, reason)
    }

    /// Look up a string parameter by key
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// What to do when no decision arrives in time
///
/// Both modes deny execution; they differ only in how the decision is tagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutBehavior {
    /// Treat the timeout as a flat denial
    #[default]
    Deny,
    /// Deny, but tag the decision for routing to a human escalation path
    Escalate,
}

/// A terminal decision on an approval request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// The request this resolves, or [`TIMEOUT_REQUEST_ID`]
    pub request_id: String,
    pub approved: bool,
    /// Who decided: an operator, a policy engine, or a timeout sentinel
    pub approver: String,
    /// Explanation; expected whenever `approved` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub decided_at: DateTime<Utc>,
}

impl ApprovalDecision {
    pub fn approved(request_id: impl Into<String>, approver: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            approved: true,
            approver: approver.into(),
            reason: None,
            decided_at: Utc::now(),
        }
    }

    pub fn denied(
        request_id: impl Into<String>,
        approver: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            request_id: request_id.into(),
            approved: false,
            approver: approver.into(),
            reason: Some(reason.into()),
            decided_at: Utc::now(),
        }
    }

    /// Build the synthetic denial used when the approval wait times out
    pub fn timed_out(timeout: Duration, behavior: TimeoutBehavior) -> Self {
        let ms = timeout.as_millis();
        let (approver, reason) = match behavior {
            TimeoutBehavior::Deny => (
                SYSTEM_APPROVER,
                format!("Approval timed out after {}ms - denied by timeout policy", ms),
            ),
            TimeoutBehavior::Escalate => (
                ESCALATION_APPROVER,
                format!("Approval timed out after {}ms - escalation required", ms),
            ),
        };
        Self::denied(TIMEOUT_REQUEST_ID, approver, reason)
    }

    /// Add or replace the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether this decision was manufactured by the timeout path
    pub fn is_timeout(&self) -> bool {
        self.request_id == TIMEOUT_REQUEST_ID
            && (self.approver == SYSTEM_APPROVER || self.approver == ESCALATION_APPROVER)
    }

    /// Whether this decision asks for human escalation
    pub fn requires_escalation(&self) -> bool {
        self.is_timeout() && self.approver == ESCALATION_APPROVER
    }

    /// Reason text, falling back to a generic message
    pub fn reason_or_default(&self) -> &str {
        self.reason.as_deref().unwrap_or(if self.approved {
            "approved"
        } else {
            "denied without reason"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_timeout_decisions() {
        let deny = ApprovalDecision::timed_out(Duration::from_millis(50), TimeoutBehavior::Deny);
        assert!(!deny.approved);
        assert_eq!(deny.approver, SYSTEM_APPROVER);
        assert_eq!(deny.request_id, TIMEOUT_REQUEST_ID);
        assert_eq!(
            deny.reason.as_deref(),
            Some("Approval timed out after 50ms - denied by timeout policy")
        );
        assert!(deny.is_timeout());
        assert!(!deny.requires_escalation());

        let escalate =
            ApprovalDecision::timed_out(Duration::from_millis(50), TimeoutBehavior::Escalate);
        assert!(!escalate.approved);
        assert_eq!(escalate.approver, ESCALATION_APPROVER);
        assert!(escalate.requires_escalation());
    }

    #[test]
    fn test_request_helpers() {
        let request = ApprovalRequest::new(
            "req-1",
            "write_file",
            json!({ "path": "/data/out.txt", "content": "hi" }),
            "agent-001",
            "session-abc",
            "User requested file write",
        );
        assert_eq!(request.param_str("path"), Some("/data/out.txt"));
        assert_eq!(request.param_str("missing"), None);

        let approved = request.approve("human-operator");
        assert!(approved.approved);
        assert_eq!(approved.request_id, "req-1");
        assert!(!approved.is_timeout());

        let denied = request.deny("policy-engine", "nope");
        assert_eq!(denied.reason_or_default(), "nope");

        let annotated = approved.with_reason("change ticket OPS-42");
        assert!(annotated.approved);
        assert_eq!(annotated.reason_or_default(), "change ticket OPS-42");
        assert_eq!(denied.with_reason("revised").reason.as_deref(), Some("revised"));
    }

    #[test]
    fn test_timeout_behavior_serde() {
        let behavior: TimeoutBehavior = serde_json::from_str("\"escalate\"").unwrap();
        assert_eq!(behavior, TimeoutBehavior::Escalate);
        assert_eq!(serde_json::to_string(&TimeoutBehavior::Deny).unwrap(), "\"deny\"");
    }
}
