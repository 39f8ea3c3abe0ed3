//! Decision providers
//!
//! A decision provider turns an [`ApprovalRequest`] into an
//! [`ApprovalDecision`]. It may be a human-in-the-loop channel or an
//! automated policy service; the coordinator trusts whatever it returns.

use anyhow::Result;
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use regex::Regex;
use std::collections::HashSet;
use std::future::Future;

use super::types::{ApprovalDecision, ApprovalRequest};

/// Approver name used by [`PathRuleProvider`]
pub const POLICY_ENGINE_APPROVER: &str = "policy-engine";

/// Produces approval decisions
#[async_trait]
pub trait ApprovalProvider: Send + Sync {
    /// Decide on a request
    ///
    /// Returning `Err` signals that the provider itself failed, which is
    /// reported separately from a denial.
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision>;

    /// Name used in log output
    fn name(&self) -> &str {
        "approval-provider"
    }
}

type DecideFn = dyn Fn(ApprovalRequest) -> BoxFuture<'static, Result<ApprovalDecision>> + Send + Sync;

/// Adapts an async closure into a provider
pub struct FnApprovalProvider {
    name: String,
    decide: Box<DecideFn>,
}

impl FnApprovalProvider {
    pub fn new<F, Fut>(decide: F) -> Self
    where
        F: Fn(ApprovalRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ApprovalDecision>> + Send + 'static,
    {
        Self {
            name: "fn-provider".to_string(),
            decide: Box::new(move |request: ApprovalRequest| decide(request).boxed()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[async_trait]
impl ApprovalProvider for FnApprovalProvider {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision> {
        (self.decide)(request.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Always approves or always denies
#[derive(Debug, Clone)]
pub struct StaticApprovalProvider {
    approver: String,
    approve: bool,
    reason: Option<String>,
}

impl StaticApprovalProvider {
    pub fn approve_all(approver: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approve: true,
            reason: None,
        }
    }

    pub fn deny_all(approver: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            approver: approver.into(),
            approve: false,
            reason: Some(reason.into()),
        }
    }
}

#[async_trait]
impl ApprovalProvider for StaticApprovalProvider {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision> {
        if self.approve {
            Ok(request.approve(&self.approver))
        } else {
            let reason = self.reason.as_deref().unwrap_or("denied");
            Ok(request.deny(&self.approver, reason))
        }
    }

    fn name(&self) -> &str {
        &self.approver
    }
}

/// Denies calls whose `path` parameter matches a protected pattern
///
/// Only the configured tools are inspected; everything else is approved.
#[derive(Debug, Clone)]
pub struct PathRuleProvider {
    tools: HashSet<String>,
    protected: Vec<Regex>,
    param_key: String,
}

impl PathRuleProvider {
    /// Create a provider that inspects the `path` parameter
    pub fn new() -> Self {
        Self {
            tools: HashSet::new(),
            protected: Vec::new(),
            param_key: "path".to_string(),
        }
    }

    /// Inspect calls to this tool
    pub fn for_tool(mut self, tool_name: impl Into<String>) -> Self {
        self.tools.insert(tool_name.into());
        self
    }

    /// Deny paths matching this pattern
    pub fn protect(mut self, pattern: &str) -> Result<Self> {
        self.protected.push(Regex::new(pattern)?);
        Ok(self)
    }

    /// Inspect a different parameter than `path`
    pub fn with_param_key(mut self, key: impl Into<String>) -> Self {
        self.param_key = key.into();
        self
    }

    fn matches(&self, request: &ApprovalRequest) -> Option<&Regex> {
        if !self.tools.contains(&request.tool_name) {
            return None;
        }
        let path = request.param_str(&self.param_key)?;
        self.protected.iter().find(|re| re.is_match(path))
    }
}

impl Default for PathRuleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ApprovalProvider for PathRuleProvider {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision> {
        if let Some(rule) = self.matches(request) {
            tracing::info!(
                tool = %request.tool_name,
                rule = rule.as_str(),
                "Protected path rule matched"
            );
            return Ok(request.deny(
                POLICY_ENGINE_APPROVER,
                "Write to sensitive path denied by policy",
            ));
        }
        Ok(request.approve(POLICY_ENGINE_APPROVER))
    }

    fn name(&self) -> &str {
        POLICY_ENGINE_APPROVER
    }
}
