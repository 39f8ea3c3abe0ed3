//! Gated execution of privileged agent tools
//!
//! Every tool invocation requested by an agent passes through layered gates
//! before the underlying operation runs:
//!
//! 1. **Allowlist**: tools not on the allowlist are always denied.
//! 2. **Rate limit**: each session has an action budget.
//! 3. **Approval**: selected tools need a decision from a human or automated
//!    provider, bounded by a timeout.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use serde_json::json;
//! use toolgate::{
//!     approval::PathRuleProvider,
//!     config::GateConfig,
//!     executor::{GatedExecutor, ToolCall},
//! };
//!
//! let config = GateConfig::new()
//!     .allow_tool("write_file")
//!     .require_approval("write_file");
//! let provider = PathRuleProvider::new().for_tool("write_file").protect("/sensitive/")?;
//! let executor = GatedExecutor::from_config(&config, Arc::new(provider));
//! let session = config.session("session-abc");
//!
//! let call = ToolCall::new("write_file")
//!     .with_params(json!({ "path": "/data/output.txt", "content": "Hello" }))
//!     .with_agent("agent-001")
//!     .with_context("User requested file write");
//! let outcome = executor.execute(&session, call, || async { Ok(5) }).await?;
//! ```

pub mod approval;
pub mod cli;
pub mod config;
pub mod core;
pub mod executor;
pub mod logging;
pub mod policy;
pub mod session;

pub use crate::approval::{ApprovalCoordinator, ApprovalDecision, ApprovalProvider, ApprovalRequest};
pub use crate::config::GateConfig;
pub use crate::core::{GateError, GateResult};
pub use crate::executor::{ExecutionOutcome, GatedExecutor, Outcome, ToolCall};
pub use crate::policy::{Policy, PolicyEvaluator};
pub use crate::session::SessionContext;
