//! Approval Gate Example
//!
//! Demonstrates gating tool calls behind an allowlist, a session budget and a
//! path-based approval policy:
//! - `read_file` runs directly
//! - `write_file` needs approval; writes under /sensitive/ or /config/ are denied
//! - `send_email` is not allowlisted and is always denied
//!
//! Pass `--interactive` to approve writes yourself at the terminal.
//!
//! Run with: cargo run --example approval_gate

use anyhow::Result;
use serde_json::json;
use std::sync::Arc;

use toolgate::{
    approval::{ApprovalProvider, PathRuleProvider},
    cli::{Console, ConsoleApprovalProvider},
    config::GateConfig,
    executor::{GatedExecutor, Outcome, ToolCall},
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter("approval_gate=info,toolgate=info")
        .init();

    let console = Console::new();
    let interactive = std::env::args().any(|arg| arg == "--interactive");

    let config = GateConfig::new()
        .allow_tool("read_file")
        .allow_tool("write_file")
        .require_approval("write_file")
        .require_approval("send_email")
        .with_max_actions(3);

    let provider: Arc<dyn ApprovalProvider> = if interactive {
        Arc::new(ConsoleApprovalProvider::new(console.clone()))
    } else {
        Arc::new(
            PathRuleProvider::new()
                .for_tool("write_file")
                .protect("/sensitive/")?
                .protect("/config/")?,
        )
    };

    let executor = GatedExecutor::from_config(&config, provider);
    let session = config.session("session-abc");

    let calls = vec![
        ToolCall::new("read_file").with_params(json!({ "path": "/example.txt" })),
        ToolCall::new("write_file")
            .with_params(json!({ "path": "/data/output.txt", "content": "Hello" }))
            .with_context("User requested file write"),
        ToolCall::new("write_file")
            .with_params(json!({ "path": "/sensitive/keys.txt", "content": "secret" }))
            .with_context("Agent decided to store credentials"),
        ToolCall::new("send_email").with_params(json!({ "to": "ops@example.com" })),
    ];

    for call in calls {
        let call = call.with_agent("agent-001");
        let tool_name = call.tool_name.clone();
        let path = call.params.get("path").cloned();

        let outcome = executor
            .execute(&session, call, || async move {
                Ok(json!({ "tool": tool_name, "path": path, "ok": true }))
            })
            .await?;

        match &outcome.outcome {
            Outcome::Executed(result) => {
                console.print_system(&format!("{} executed: {}", outcome.tool_name, result))
            }
            Outcome::ExecutionFailed(error) => {
                console.print_error(&format!("{} failed: {}", outcome.tool_name, error))
            }
            Outcome::Denied(_) | Outcome::DeniedByApproval => console.print_system(&format!(
                "{} denied: {}",
                outcome.tool_name,
                outcome.denial_reason().unwrap_or_default()
            )),
        }
        console.print_separator();
    }

    console.print_system(&format!(
        "Session {} used {} of {} actions",
        session.session_id(),
        session.action_count(),
        config.max_actions_per_session
    ));

    Ok(())
}
