//! Policy layer for tool execution
//!
//! A [`Policy`] combines an allowlist, a per-session action budget and a set
//! of tools that need approval. The allowlist is authoritative: approval is a
//! second gate on top of it, never a way around it.

mod evaluator;

pub use evaluator::{DenialReason, Policy, PolicyDecision, PolicyEvaluator};
