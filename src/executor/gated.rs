//! Gated execution of privileged operations
//!
//! Each invocation runs policy evaluation, then (if required) approval
//! coordination, then the operation itself. No step starts before the one
//! before it has resolved.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::outcome::{ExecutionOutcome, GateState, Outcome};
use crate::approval::{ApprovalCoordinator, ApprovalDecision, ApprovalProvider, ApprovalRequest};
use crate::config::GateConfig;
use crate::core::GateResult;
use crate::policy::{DenialReason, PolicyDecision, PolicyEvaluator};
use crate::session::SessionContext;

/// A requested tool invocation
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCall {
    pub tool_name: String,
    /// Tool parameters; forwarded to the decision provider untouched
    pub params: Value,
    pub agent_id: String,
    /// Free-text explanation shown to the approver
    pub context: String,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            params: Value::Object(Default::default()),
            agent_id: String::new(),
            context: String::new(),
        }
    }

    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn with_agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = agent_id.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }
}

/// Runs tool invocations behind the policy and approval gates
pub struct GatedExecutor {
    evaluator: PolicyEvaluator,
    coordinator: Arc<ApprovalCoordinator>,
}

impl GatedExecutor {
    pub fn new(coordinator: impl Into<Arc<ApprovalCoordinator>>) -> Self {
        Self {
            evaluator: PolicyEvaluator::new(),
            coordinator: coordinator.into(),
        }
    }

    /// Build an executor using the approval settings of `config`
    pub fn from_config(config: &GateConfig, provider: Arc<dyn ApprovalProvider>) -> Self {
        Self::new(ApprovalCoordinator::new(provider, config.approval_settings()))
    }

    pub fn coordinator(&self) -> &Arc<ApprovalCoordinator> {
        &self.coordinator
    }

    /// Requests currently waiting for an approval decision
    pub fn pending_requests(&self) -> Vec<ApprovalRequest> {
        self.coordinator.pending_requests()
    }

    /// Gate and run one tool invocation
    ///
    /// Denials and operation failures come back as an [`ExecutionOutcome`].
    /// Only decision-provider failures and internal errors are returned as
    /// `Err`.
    pub async fn execute<T, F, Fut>(
        &self,
        session: &SessionContext,
        call: ToolCall,
        operation: F,
    ) -> GateResult<ExecutionOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        self.execute_cancellable(session, call, operation, &CancellationToken::new())
            .await
    }

    /// Like [`execute`](Self::execute), but an approval wait stops with
    /// [`GateError::Cancelled`](crate::core::GateError::Cancelled) when `cancel` fires
    pub async fn execute_cancellable<T, F, Fut>(
        &self,
        session: &SessionContext,
        call: ToolCall,
        operation: F,
        cancel: &CancellationToken,
    ) -> GateResult<ExecutionOutcome<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let ToolCall {
            tool_name,
            params,
            agent_id,
            context,
        } = call;
        let mut transitions = vec![GateState::Evaluating];

        let finish = |outcome: Outcome<T>,
                      decision: Option<ApprovalDecision>,
                      transitions: Vec<GateState>| ExecutionOutcome {
            tool_name: tool_name.clone(),
            agent_id: agent_id.clone(),
            session_id: session.session_id().to_string(),
            decision,
            outcome,
            transitions,
        };

        let decision = match self.evaluator.evaluate(&tool_name, session) {
            PolicyDecision::Denied(reason) => {
                tracing::warn!(
                    tool = %tool_name,
                    session_id = session.session_id(),
                    "Tool denied by policy: {}",
                    reason
                );
                transitions.push(GateState::Denied);
                return Ok(finish(Outcome::Denied(reason), None, transitions));
            }
            PolicyDecision::RequiresApproval => {
                transitions.push(GateState::AwaitingApproval);
                let decision = self
                    .coordinator
                    .decide_cancellable(
                        &tool_name,
                        params,
                        &agent_id,
                        session.session_id(),
                        &context,
                        cancel,
                    )
                    .await?;

                if !decision.approved {
                    tracing::warn!(
                        tool = %tool_name,
                        approver = %decision.approver,
                        "Tool denied by approval: {}",
                        decision.reason_or_default()
                    );
                    transitions.push(GateState::DeniedByApproval);
                    return Ok(finish(Outcome::DeniedByApproval, Some(decision), transitions));
                }
                transitions.push(GateState::ApprovedAwaitingExecution);
                Some(decision)
            }
            PolicyDecision::Allowed => {
                transitions.push(GateState::AllowedAwaitingExecution);
                None
            }
        };

        // Check-and-increment in one step; a concurrent invocation may have
        // spent the last action while this one waited for approval.
        let Some(action_count) = session.try_record_action() else {
            tracing::warn!(
                tool = %tool_name,
                session_id = session.session_id(),
                "Rate limit reached before execution"
            );
            transitions.push(GateState::Denied);
            return Ok(finish(
                Outcome::Denied(DenialReason::RateLimitExceeded),
                decision,
                transitions,
            ));
        };

        tracing::info!(
            tool = %tool_name,
            agent_id = %agent_id,
            session_id = session.session_id(),
            action_count,
            "Executing tool"
        );

        match operation().await {
            Ok(result) => {
                transitions.push(GateState::Executed);
                Ok(finish(Outcome::Executed(result), decision, transitions))
            }
            Err(error) => {
                tracing::warn!(tool = %tool_name, "Tool execution failed: {:#}", error);
                transitions.push(GateState::ExecutionFailed);
                Ok(finish(Outcome::ExecutionFailed(error), decision, transitions))
            }
        }
    }
}
