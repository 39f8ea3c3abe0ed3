//! Gated executor
//!
//! Orchestrates the full sequence for one tool invocation:
//!
//! ```text
//! Evaluating ─┬─> Denied
//!             ├─> AwaitingApproval ─┬─> DeniedByApproval
//!             │                     └─> ApprovedAwaitingExecution ─┐
//!             └─> AllowedAwaitingExecution ───────────────────────┴─> Executed | ExecutionFailed
//! ```
//!
//! The session's action counter is incremented once, right before the
//! operation runs, and is never rolled back.

mod gated;
mod outcome;

pub use gated::{GatedExecutor, ToolCall};
pub use outcome::{ExecutionOutcome, GateState, Outcome};
