//! Gate configuration
//!
//! The configuration surface is plain data: an allowlist, the tools that
//! need approval, a per-session action budget, and how long to wait for an
//! approval decision. It loads from JSON.
//!
//! ```json
//! {
//!   "allowed_tools": ["read_file", "write_file"],
//!   "require_approval_for": ["write_file"],
//!   "max_actions_per_session": 50,
//!   "approval_timeout_ms": 30000,
//!   "timeout_behavior": "deny"
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::approval::{ApprovalSettings, TimeoutBehavior};
use crate::core::GateResult;
use crate::policy::Policy;
use crate::session::SessionContext;

const DEFAULT_MAX_ACTIONS: u64 = 50;
const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Configuration for a gated executor and the sessions it serves
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    /// Tools permitted at all
    pub allowed_tools: Vec<String>,
    /// Tools that need an approval decision
    pub require_approval_for: Vec<String>,
    pub max_actions_per_session: u64,
    /// How long to wait for a decision, in milliseconds
    pub approval_timeout_ms: u64,
    pub timeout_behavior: TimeoutBehavior,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            allowed_tools: Vec::new(),
            require_approval_for: Vec::new(),
            max_actions_per_session: DEFAULT_MAX_ACTIONS,
            approval_timeout_ms: DEFAULT_TIMEOUT_MS,
            timeout_behavior: TimeoutBehavior::Deny,
        }
    }
}

impl GateConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a configuration from JSON
    pub fn from_json_str(json: &str) -> GateResult<Self> {
        let config: GateConfig = serde_json::from_str(json)?;
        config.validate();
        Ok(config)
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> GateResult<Self> {
        let path = path.as_ref();
        tracing::info!("Loading gate config from {}", path.display());
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn allow_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.allowed_tools.push(tool_name.into());
        self
    }

    pub fn require_approval(mut self, tool_name: impl Into<String>) -> Self {
        self.require_approval_for.push(tool_name.into());
        self
    }

    pub fn with_max_actions(mut self, max_actions: u64) -> Self {
        self.max_actions_per_session = max_actions;
        self
    }

    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_timeout_behavior(mut self, behavior: TimeoutBehavior) -> Self {
        self.timeout_behavior = behavior;
        self
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_millis(self.approval_timeout_ms)
    }

    /// Approval-required tools that can never run because they are not allowlisted
    ///
    /// Each one is logged as a warning. The config is still usable.
    pub fn validate(&self) -> Vec<String> {
        let unreachable: Vec<String> = self
            .require_approval_for
            .iter()
            .filter(|tool| !self.allowed_tools.contains(tool))
            .cloned()
            .collect();
        for tool in &unreachable {
            tracing::warn!(
                "Tool '{}' requires approval but is not on the allowlist; it will always be denied",
                tool
            );
        }
        unreachable
    }

    /// Build the policy described by this config
    pub fn policy(&self) -> Policy {
        let mut policy = Policy::new()
            .allow_tools(self.allowed_tools.iter().cloned())
            .with_max_actions(self.max_actions_per_session);
        for tool in &self.require_approval_for {
            policy = policy.require_approval(tool.clone());
        }
        policy
    }

    pub fn approval_settings(&self) -> ApprovalSettings {
        ApprovalSettings::new(self.approval_timeout(), self.timeout_behavior)
    }

    /// Start a new session governed by this config
    pub fn session(&self, session_id: impl Into<String>) -> SessionContext {
        SessionContext::new(session_id, self.policy())
    }
}
