//! Policy evaluation for tool invocations
//!
//! Decides whether a tool call is allowed outright, denied, or needs an
//! approval decision first. Checks always run in the same order:
//! allowlist, then rate limit, then approval requirement.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::session::SessionContext;

/// Tool access policy for a session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Tools permitted at all
    #[serde(default)]
    pub allowed_tools: HashSet<String>,
    /// Maximum number of executed actions per session
    #[serde(default)]
    pub max_actions_per_session: u64,
    /// Tools that need an approval decision even when allowlisted
    #[serde(default)]
    pub require_approval_for: HashSet<String>,
}

impl Policy {
    /// Create an empty policy (denies everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool to the allowlist
    pub fn allow_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.allowed_tools.insert(tool_name.into());
        self
    }

    /// Add several tools to the allowlist
    pub fn allow_tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_tools.extend(tools.into_iter().map(Into::into));
        self
    }

    /// Require an approval decision for a tool
    pub fn require_approval(mut self, tool_name: impl Into<String>) -> Self {
        self.require_approval_for.insert(tool_name.into());
        self
    }

    /// Set the per-session action budget
    pub fn with_max_actions(mut self, max_actions: u64) -> Self {
        self.max_actions_per_session = max_actions;
        self
    }

    pub fn is_allowed(&self, tool_name: &str) -> bool {
        self.allowed_tools.contains(tool_name)
    }

    pub fn requires_approval(&self, tool_name: &str) -> bool {
        self.require_approval_for.contains(tool_name)
    }

    /// Whether a session with `action_count` executed actions has hit its budget
    pub fn is_rate_limited(&self, action_count: u64) -> bool {
        action_count >= self.max_actions_per_session
    }

    /// Evaluate a tool call against this policy
    pub fn evaluate(&self, tool_name: &str, action_count: u64) -> PolicyDecision {
        if !self.is_allowed(tool_name) {
            return PolicyDecision::Denied(DenialReason::NotAllowlisted);
        }
        if self.is_rate_limited(action_count) {
            return PolicyDecision::Denied(DenialReason::RateLimitExceeded);
        }
        if self.requires_approval(tool_name) {
            return PolicyDecision::RequiresApproval;
        }
        PolicyDecision::Allowed
    }
}

/// Why a policy check rejected a tool call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The tool is not on the allowlist
    NotAllowlisted,
    /// The session's action budget is spent
    RateLimitExceeded,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::NotAllowlisted => "not on allowlist",
            DenialReason::RateLimitExceeded => "rate limit exceeded",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating a tool call against a policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyDecision {
    /// Blocked by the policy
    Denied(DenialReason),
    /// Needs an approval decision before running
    RequiresApproval,
    /// May run immediately
    Allowed,
}

/// Evaluates tool calls against the policy of a session
///
/// Stateless: evaluation never touches the session's action counter.
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEvaluator;

impl PolicyEvaluator {
    pub fn new() -> Self {
        Self
    }

    /// Decide which gate applies to `tool_name` for this session
    pub fn evaluate(&self, tool_name: &str, session: &SessionContext) -> PolicyDecision {
        let action_count = session.action_count();
        let decision = session.policy().evaluate(tool_name, action_count);
        tracing::debug!(
            tool = tool_name,
            session_id = session.session_id(),
            action_count,
            ?decision,
            "Policy evaluated"
        );
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> Policy {
        Policy::new()
            .allow_tools(["read_file", "write_file"])
            .require_approval("write_file")
            .require_approval("delete_file")
            .with_max_actions(2)
    }

    #[test]
    fn test_not_allowlisted_is_denied() {
        let policy = policy();
        assert_eq!(
            policy.evaluate("send_email", 0),
            PolicyDecision::Denied(DenialReason::NotAllowlisted)
        );
    }

    #[test]
    fn test_approval_never_overrides_allowlist() {
        let policy = policy();
        // delete_file requires approval but was never allowlisted
        assert_eq!(
            policy.evaluate("delete_file", 0),
            PolicyDecision::Denied(DenialReason::NotAllowlisted)
        );
    }

    #[test]
    fn test_rate_limit_checked_before_approval() {
        let policy = policy();
        assert_eq!(policy.evaluate("write_file", 1), PolicyDecision::RequiresApproval);
        assert_eq!(
            policy.evaluate("write_file", 2),
            PolicyDecision::Denied(DenialReason::RateLimitExceeded)
        );
        assert_eq!(
            policy.evaluate("read_file", 5),
            PolicyDecision::Denied(DenialReason::RateLimitExceeded)
        );
    }

    #[test]
    fn test_allowed() {
        assert_eq!(policy().evaluate("read_file", 0), PolicyDecision::Allowed);
    }

    #[test]
    fn test_zero_budget_denies_everything() {
        let policy = Policy::new().allow_tool("read_file");
        assert_eq!(
            policy.evaluate("read_file", 0),
            PolicyDecision::Denied(DenialReason::RateLimitExceeded)
        );
    }

    #[test]
    fn test_denial_reason_text() {
        assert_eq!(DenialReason::NotAllowlisted.to_string(), "not on allowlist");
        assert_eq!(DenialReason::RateLimitExceeded.to_string(), "rate limit exceeded");
    }

    #[test]
    fn test_evaluator_does_not_touch_counter() {
        let session = SessionContext::new("session-1", policy());
        let evaluator = PolicyEvaluator::new();

        for _ in 0..3 {
            assert_eq!(
                evaluator.evaluate("read_file", &session),
                PolicyDecision::Allowed
            );
        }
        assert_eq!(session.action_count(), 0);
    }
}
