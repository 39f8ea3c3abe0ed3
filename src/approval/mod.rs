//! Approval gate for tool execution
//!
//! When a policy requires approval, the [`ApprovalCoordinator`] issues an
//! [`ApprovalRequest`] to a pluggable [`ApprovalProvider`] and waits for its
//! [`ApprovalDecision`], bounded by a timeout.
//!
//! ## Timeouts
//!
//! A timeout never approves. Depending on [`TimeoutBehavior`]:
//!
//! | Behavior | `approver` | Meaning |
//! |----------|------------|---------|
//! | `Deny` | `"system"` | Flat denial |
//! | `Escalate` | `"escalation-required"` | Denial to route to a human |
//!
//! ## Pending requests
//!
//! Every request is held in a [`PendingRequestRegistry`] while it waits and is
//! removed the moment a decision, timeout, error or cancellation resolves it.

mod coordinator;
mod ids;
mod provider;
mod registry;
mod types;

pub use coordinator::{ApprovalCoordinator, ApprovalSettings, DEFAULT_APPROVAL_TIMEOUT};
pub use ids::{RequestIdGenerator, SequentialIdGenerator, TimestampIdGenerator};
pub use provider::{
    ApprovalProvider, FnApprovalProvider, PathRuleProvider, StaticApprovalProvider,
    POLICY_ENGINE_APPROVER,
};
pub use registry::PendingRequestRegistry;
pub use types::{
    ApprovalDecision, ApprovalRequest, TimeoutBehavior, ESCALATION_APPROVER, SYSTEM_APPROVER,
    TIMEOUT_REQUEST_ID,
};
