//! Outcome records for gated invocations

use crate::approval::ApprovalDecision;
use crate::core::{GateError, GateResult};
use crate::policy::DenialReason;

/// States a single invocation moves through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Evaluating,
    Denied,
    AwaitingApproval,
    DeniedByApproval,
    ApprovedAwaitingExecution,
    AllowedAwaitingExecution,
    Executed,
    ExecutionFailed,
}

impl GateState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GateState::Denied
                | GateState::DeniedByApproval
                | GateState::Executed
                | GateState::ExecutionFailed
        )
    }
}

/// Terminal result of a gated invocation
#[derive(Debug)]
pub enum Outcome<T> {
    /// Rejected by the allowlist or the rate limit
    Denied(DenialReason),
    /// The approval decision was negative, or timed out
    DeniedByApproval,
    /// The operation ran and returned a value
    Executed(T),
    /// The operation ran and failed
    ExecutionFailed(anyhow::Error),
}

/// Uniform record of one gated invocation
#[derive(Debug)]
pub struct ExecutionOutcome<T> {
    pub tool_name: String,
    pub agent_id: String,
    pub session_id: String,
    /// Approval decision, when the tool went through the approval gate
    pub decision: Option<ApprovalDecision>,
    pub outcome: Outcome<T>,
    /// States visited, starting with `Evaluating` and ending in a terminal state
    pub transitions: Vec<GateState>,
}

impl<T> ExecutionOutcome<T> {
    /// Whether every gate passed and the operation was attempted
    pub fn approved(&self) -> bool {
        matches!(
            self.outcome,
            Outcome::Executed(_) | Outcome::ExecutionFailed(_)
        )
    }

    /// Final state of the invocation
    pub fn state(&self) -> GateState {
        match self.outcome {
            Outcome::Denied(_) => GateState::Denied,
            Outcome::DeniedByApproval => GateState::DeniedByApproval,
            Outcome::Executed(_) => GateState::Executed,
            Outcome::ExecutionFailed(_) => GateState::ExecutionFailed,
        }
    }

    pub fn result(&self) -> Option<&T> {
        match &self.outcome {
            Outcome::Executed(result) => Some(result),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&anyhow::Error> {
        match &self.outcome {
            Outcome::ExecutionFailed(error) => Some(error),
            _ => None,
        }
    }

    /// Human-readable denial reason, if the invocation was denied
    pub fn denial_reason(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Denied(reason) => Some(reason.to_string()),
            Outcome::DeniedByApproval => self
                .decision
                .as_ref()
                .map(|d| d.reason_or_default().to_string()),
            _ => None,
        }
    }

    /// Whether the approval gate gave up waiting
    pub fn is_timeout(&self) -> bool {
        matches!(self.outcome, Outcome::DeniedByApproval)
            && self.decision.as_ref().is_some_and(ApprovalDecision::is_timeout)
    }

    /// Whether a timed-out approval should be routed to a human
    pub fn requires_escalation(&self) -> bool {
        self.is_timeout()
            && self
                .decision
                .as_ref()
                .is_some_and(ApprovalDecision::requires_escalation)
    }

    /// Convert into a `Result`, mapping each denial to its error variant
    pub fn into_result(self) -> GateResult<T> {
        match self.outcome {
            Outcome::Executed(result) => Ok(result),
            Outcome::ExecutionFailed(source) => Err(GateError::ExecutionFailed {
                tool_name: self.tool_name,
                source,
            }),
            Outcome::Denied(reason) => Err(GateError::PolicyDenied {
                reason: reason.to_string(),
            }),
            Outcome::DeniedByApproval => {
                let Some(decision) = self.decision else {
                    return Err(GateError::ApprovalDenied {
                        approver: "unknown".to_string(),
                        reason: "denied without decision".to_string(),
                    });
                };
                let reason = decision.reason_or_default().to_string();
                if decision.is_timeout() {
                    Err(GateError::ApprovalTimedOut {
                        escalate: decision.requires_escalation(),
                        reason,
                    })
                } else {
                    Err(GateError::ApprovalDenied {
                        approver: decision.approver,
                        reason,
                    })
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::TimeoutBehavior;
    use std::time::Duration;

    fn outcome<T>(outcome: Outcome<T>, decision: Option<ApprovalDecision>) -> ExecutionOutcome<T> {
        ExecutionOutcome {
            tool_name: "write_file".to_string(),
            agent_id: "agent-001".to_string(),
            session_id: "session-abc".to_string(),
            decision,
            outcome,
            transitions: Vec::new(),
        }
    }

    #[test]
    fn test_policy_denial_into_result() {
        let denied = outcome::<()>(Outcome::Denied(DenialReason::RateLimitExceeded), None);
        assert!(!denied.approved());
        assert_eq!(denied.state(), GateState::Denied);
        assert_eq!(denied.denial_reason().as_deref(), Some("rate limit exceeded"));

        let err = denied.into_result().unwrap_err();
        assert!(matches!(err, GateError::PolicyDenied { ref reason } if reason == "rate limit exceeded"));
    }

    #[test]
    fn test_timeout_into_result() {
        let decision = ApprovalDecision::timed_out(Duration::from_millis(50), TimeoutBehavior::Escalate);
        let timed_out = outcome::<()>(Outcome::DeniedByApproval, Some(decision));
        assert!(timed_out.is_timeout());
        assert!(timed_out.requires_escalation());

        let err = timed_out.into_result().unwrap_err();
        assert!(matches!(err, GateError::ApprovalTimedOut { escalate: true, .. }));
    }

    #[test]
    fn test_explicit_denial_into_result() {
        let decision = ApprovalDecision::denied("req-1", "policy-engine", "policy: sensitive path");
        let denied = outcome::<()>(Outcome::DeniedByApproval, Some(decision));
        assert!(!denied.is_timeout());

        let err = denied.into_result().unwrap_err();
        match err {
            GateError::ApprovalDenied { approver, reason } => {
                assert_eq!(approver, "policy-engine");
                assert_eq!(reason, "policy: sensitive path");
            }
            other => panic!("Expected ApprovalDenied, got {:?}", other),
        }
    }

    #[test]
    fn test_execution_failure_into_result() {
        let failed = outcome::<u32>(Outcome::ExecutionFailed(anyhow::anyhow!("disk full")), None);
        assert!(failed.approved());
        assert!(failed.result().is_none());
        assert_eq!(failed.error().map(|e| e.to_string()).as_deref(), Some("disk full"));

        let err = failed.into_result().unwrap_err();
        assert!(matches!(err, GateError::ExecutionFailed { ref tool_name, .. } if tool_name == "write_file"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(GateState::Executed.is_terminal());
        assert!(!GateState::AwaitingApproval.is_terminal());
    }
}
