//! Approval coordination
//!
//! Issues a request to the decision provider and races it against the
//! approval timeout. Whichever finishes first decides; the other branch is
//! dropped, so a late provider answer can never be applied after the timeout
//! path has already resolved the request.

use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::ids::{RequestIdGenerator, TimestampIdGenerator};
use super::provider::ApprovalProvider;
use super::registry::{PendingGuard, PendingRequestRegistry};
use super::types::{ApprovalDecision, ApprovalRequest, TimeoutBehavior};
use crate::core::{GateError, GateResult};

/// Default time to wait for a decision
pub const DEFAULT_APPROVAL_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout settings for approval waits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalSettings {
    pub timeout: Duration,
    pub timeout_behavior: TimeoutBehavior,
}

impl ApprovalSettings {
    pub fn new(timeout: Duration, timeout_behavior: TimeoutBehavior) -> Self {
        Self {
            timeout,
            timeout_behavior,
        }
    }
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self::new(DEFAULT_APPROVAL_TIMEOUT, TimeoutBehavior::Deny)
    }
}

enum Race {
    Provider(anyhow::Result<ApprovalDecision>),
    TimedOut,
    Cancelled,
}

/// Obtains approval decisions with bounded waiting
pub struct ApprovalCoordinator {
    provider: Arc<dyn ApprovalProvider>,
    registry: Arc<PendingRequestRegistry>,
    ids: Arc<dyn RequestIdGenerator>,
    settings: ApprovalSettings,
}

impl ApprovalCoordinator {
    /// Create a coordinator with its own registry and timestamp-based ids
    pub fn new(provider: Arc<dyn ApprovalProvider>, settings: ApprovalSettings) -> Self {
        Self {
            provider,
            registry: Arc::new(PendingRequestRegistry::new()),
            ids: Arc::new(TimestampIdGenerator),
            settings,
        }
    }

    /// Use a shared registry
    pub fn with_registry(mut self, registry: Arc<PendingRequestRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Use a custom request id generator
    pub fn with_id_generator(mut self, ids: Arc<dyn RequestIdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn registry(&self) -> &Arc<PendingRequestRegistry> {
        &self.registry
    }

    pub fn settings(&self) -> ApprovalSettings {
        self.settings
    }

    /// Requests currently awaiting a decision
    pub fn pending_requests(&self) -> Vec<ApprovalRequest> {
        self.registry.list()
    }

    /// Obtain a decision for one tool invocation
    ///
    /// Resolves to the provider's decision, or to a synthetic denial if the
    /// timeout elapses first. Provider errors are returned as
    /// [`GateError::ApprovalProviderFailed`].
    pub async fn decide(
        &self,
        tool_name: &str,
        params: Value,
        agent_id: &str,
        session_id: &str,
        context: &str,
    ) -> GateResult<ApprovalDecision> {
        self.decide_cancellable(
            tool_name,
            params,
            agent_id,
            session_id,
            context,
            &CancellationToken::new(),
        )
        .await
    }

    /// Like [`decide`](Self::decide), but gives up with
    /// [`GateError::Cancelled`] once `cancel` fires
    pub async fn decide_cancellable(
        &self,
        tool_name: &str,
        params: Value,
        agent_id: &str,
        session_id: &str,
        context: &str,
        cancel: &CancellationToken,
    ) -> GateResult<ApprovalDecision> {
        let request = ApprovalRequest::new(
            self.ids.next_id(),
            tool_name,
            params,
            agent_id,
            session_id,
            context,
        );
        let request_id = request.request_id.clone();

        let pending = PendingGuard::register(&self.registry, request.clone()).map_err(|e| {
            tracing::error!(request_id = %request_id, "Request id collision: {}", e);
            e
        })?;

        tracing::info!(
            request_id = %request_id,
            tool = tool_name,
            agent_id,
            session_id,
            provider = self.provider.name(),
            "Awaiting approval decision"
        );

        let race = tokio::select! {
            biased;
            _ = cancel.cancelled() => Race::Cancelled,
            result = self.provider.decide(&request) => Race::Provider(result),
            _ = tokio::time::sleep(self.settings.timeout) => Race::TimedOut,
        };

        // Deregister before anything is reported back to the caller
        drop(pending);

        match race {
            Race::Provider(Ok(decision)) if decision.request_id == request_id => {
                tracing::info!(
                    request_id = %request_id,
                    approved = decision.approved,
                    approver = %decision.approver,
                    "Approval decision received"
                );
                Ok(decision)
            }
            Race::Provider(Ok(decision)) => {
                tracing::error!(
                    request_id = %request_id,
                    decision_for = %decision.request_id,
                    "Provider returned a decision for a different request"
                );
                Err(GateError::ApprovalProviderFailed {
                    source: anyhow::anyhow!(
                        "decision resolves request '{}' but '{}' was issued",
                        decision.request_id,
                        request_id
                    ),
                    request_id,
                })
            }
            Race::Provider(Err(source)) => {
                tracing::error!(request_id = %request_id, "Approval provider failed: {:#}", source);
                Err(GateError::ApprovalProviderFailed { request_id, source })
            }
            Race::TimedOut => {
                let decision = ApprovalDecision::timed_out(
                    self.settings.timeout,
                    self.settings.timeout_behavior,
                );
                tracing::warn!(
                    request_id = %request_id,
                    approver = %decision.approver,
                    "Approval timed out after {:?}",
                    self.settings.timeout
                );
                Ok(decision)
            }
            Race::Cancelled => {
                tracing::warn!(request_id = %request_id, "Approval wait cancelled");
                Err(GateError::Cancelled { request_id })
            }
        }
    }
}
