use anyhow::{bail, Result};
use async_trait::async_trait;
use colored::*;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::approval::{ApprovalDecision, ApprovalProvider, ApprovalRequest};

/// Approver name recorded for decisions made at the console
pub const HUMAN_OPERATOR: &str = "human-operator";

/// Console handles all terminal I/O with colored formatting
#[derive(Debug, Clone)]
pub struct Console {
    accent_color: Color,
}

impl Console {
    /// Create a new Console with default colors
    pub fn new() -> Self {
        Self {
            accent_color: Color::Cyan,
        }
    }

    /// Create a new Console with a custom accent color
    pub fn with_color(accent_color: Color) -> Self {
        Self { accent_color }
    }

    /// Print an approval request for an operator to review
    pub fn print_approval_request(&self, request: &ApprovalRequest) {
        let params = serde_json::to_string_pretty(&request.params)
            .unwrap_or_else(|_| request.params.to_string());

        println!();
        println!("{}", "=== APPROVAL REQUIRED ===".yellow().bold());
        println!("{} {}", "Tool:".color(self.accent_color).bold(), request.tool_name);
        println!("{} {}", "Agent:".color(self.accent_color).bold(), request.agent_id);
        println!("{} {}", "Session:".color(self.accent_color).bold(), request.session_id);
        println!("{} {}", "Context:".color(self.accent_color).bold(), request.context);
        println!("{}", "Params:".color(self.accent_color).bold());
        println!("{}", params.bright_black());
        println!("{}", "=".repeat(25).yellow());
    }

    /// Print a decision
    pub fn print_decision(&self, decision: &ApprovalDecision) {
        if decision.approved {
            println!("{} by {}", "Approved".green().bold(), decision.approver);
        } else {
            println!(
                "{} by {}: {}",
                "Denied".red().bold(),
                decision.approver,
                decision.reason_or_default()
            );
        }
    }

    /// Print a system message (errors, info, etc.)
    pub fn print_system(&self, message: &str) {
        println!("{} {}", "System:".yellow().bold(), message);
    }

    /// Print an error message
    pub fn print_error(&self, error: &str) {
        eprintln!("{} {}", "Error:".red().bold(), error);
    }

    /// Print a separator line
    pub fn print_separator(&self) {
        println!("{}", "-".repeat(60).bright_black());
    }

    /// Print a prompt without a trailing newline
    pub fn print_prompt(&self, prompt: &str) -> io::Result<()> {
        print!("{} ", prompt.color(self.accent_color).bold());
        io::stdout().flush()
    }

    /// Prompt and read one line from `input`
    ///
    /// Returns `None` at end of input.
    pub fn read_line(&self, prompt: &str, input: &mut impl BufRead) -> io::Result<Option<String>> {
        self.print_prompt(prompt)?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// Ask for a yes/no decision on a request, re-prompting on bad input
    pub fn ask_approval(
        &self,
        request: &ApprovalRequest,
        input: &mut impl BufRead,
    ) -> Result<ApprovalDecision> {
        self.print_approval_request(request);

        loop {
            let Some(answer) = self.read_line("Approve? [y/n]", &mut *input)? else {
                bail!("input closed before a decision was made");
            };
            match parse_answer(&answer) {
                Some(true) => return Ok(request.approve(HUMAN_OPERATOR)),
                Some(false) => {
                    let reason = self
                        .read_line("Reason:", &mut *input)?
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "Denied by operator".to_string());
                    return Ok(request.deny(HUMAN_OPERATOR, reason));
                }
                None => self.print_system("Please answer 'y' or 'n'."),
            }
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a yes/no answer
pub fn parse_answer(answer: &str) -> Option<bool> {
    match answer.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Decision provider that asks an operator on the terminal
///
/// Answers arrive as lines on a channel. The default source is a dedicated
/// thread reading stdin, which is not a runtime blocking task, so a request
/// that loses to the timeout leaves nothing for runtime shutdown to wait on.
/// Lines are only consumed while a request is waiting for an answer.
#[derive(Debug, Clone)]
pub struct ConsoleApprovalProvider {
    console: Console,
    input: Arc<Mutex<mpsc::UnboundedReceiver<String>>>,
}

impl ConsoleApprovalProvider {
    /// Read answers from stdin
    pub fn new(console: Console) -> Self {
        Self::with_input(console, spawn_stdin_reader())
    }

    /// Read answers from an arbitrary line source
    pub fn with_input(console: Console, input: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            console,
            input: Arc::new(Mutex::new(input)),
        }
    }
}

impl Default for ConsoleApprovalProvider {
    fn default() -> Self {
        Self::new(Console::new())
    }
}

/// Forward stdin lines until stdin closes or nobody is listening
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("toolgate-stdin".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        // The sender is gone, so the first request fails with closed input
        tracing::error!("Failed to start stdin reader: {}", e);
    }
    rx
}

#[async_trait]
impl ApprovalProvider for ConsoleApprovalProvider {
    async fn decide(&self, request: &ApprovalRequest) -> Result<ApprovalDecision> {
        // One prompt at a time; concurrent requests queue here
        let mut input = self.input.lock().await;
        self.console.print_approval_request(request);

        let decision = loop {
            self.console.print_prompt("Approve? [y/n]")?;
            let Some(answer) = input.recv().await else {
                bail!("input closed before a decision was made");
            };
            match parse_answer(&answer) {
                Some(true) => break request.approve(HUMAN_OPERATOR),
                Some(false) => {
                    self.console.print_prompt("Reason:")?;
                    let reason = input
                        .recv()
                        .await
                        .map(|r| r.trim().to_string())
                        .filter(|r| !r.is_empty())
                        .unwrap_or_else(|| "Denied by operator".to_string());
                    break request.deny(HUMAN_OPERATOR, reason);
                }
                None => self.console.print_system("Please answer 'y' or 'n'."),
            }
        };

        self.console.print_decision(&decision);
        Ok(decision)
    }

    fn name(&self) -> &str {
        "console"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::{
        ApprovalCoordinator, ApprovalSettings, SequentialIdGenerator, TimeoutBehavior,
        SYSTEM_APPROVER,
    };
    use serde_json::json;
    use std::io::Cursor;
    use std::time::Duration;

    fn request() -> ApprovalRequest {
        ApprovalRequest::new(
            "req-1",
            "send_email",
            json!({ "to": "ops@example.com" }),
            "agent-001",
            "session-abc",
            "Notify on-call",
        )
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y"), Some(true));
        assert_eq!(parse_answer(" YES "), Some(true));
        assert_eq!(parse_answer("no"), Some(false));
        assert_eq!(parse_answer("maybe"), None);
    }

    #[test]
    fn test_ask_approval_approves() {
        let console = Console::new();
        let mut input = Cursor::new("what\ny\n");
        let decision = console.ask_approval(&request(), &mut input).unwrap();
        assert!(decision.approved);
        assert_eq!(decision.approver, HUMAN_OPERATOR);
        assert_eq!(decision.request_id, "req-1");
    }

    #[test]
    fn test_ask_approval_denies_with_reason() {
        let console = Console::new();
        let mut input = Cursor::new("n\nnot during freeze\n");
        let decision = console.ask_approval(&request(), &mut input).unwrap();
        assert!(!decision.approved);
        assert_eq!(decision.reason.as_deref(), Some("not during freeze"));
    }

    #[test]
    fn test_ask_approval_default_reason() {
        let console = Console::new();
        let mut input = Cursor::new("n\n\n");
        let decision = console.ask_approval(&request(), &mut input).unwrap();
        assert_eq!(decision.reason.as_deref(), Some("Denied by operator"));
    }

    #[test]
    fn test_ask_approval_closed_input() {
        let console = Console::new();
        let mut input = Cursor::new("");
        assert!(console.ask_approval(&request(), &mut input).is_err());
    }

    fn coordinator(provider: ConsoleApprovalProvider, timeout_ms: u64) -> ApprovalCoordinator {
        ApprovalCoordinator::new(
            Arc::new(provider),
            ApprovalSettings::new(Duration::from_millis(timeout_ms), TimeoutBehavior::Deny),
        )
        .with_id_generator(Arc::new(SequentialIdGenerator::new("req")))
    }

    #[tokio::test]
    async fn test_provider_reads_answers_from_input() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = ConsoleApprovalProvider::with_input(Console::new(), rx);
        tx.send("maybe".to_string()).unwrap();
        tx.send("n".to_string()).unwrap();
        tx.send("  outside change window ".to_string()).unwrap();

        let decision = provider.decide(&request()).await.unwrap();
        assert!(!decision.approved);
        assert_eq!(decision.approver, HUMAN_OPERATOR);
        assert_eq!(decision.reason.as_deref(), Some("outside change window"));
    }

    #[tokio::test]
    async fn test_provider_fails_when_input_closes() {
        let (tx, rx) = mpsc::unbounded_channel::<String>();
        drop(tx);
        let provider = ConsoleApprovalProvider::with_input(Console::new(), rx);
        assert!(provider.decide(&request()).await.is_err());
    }

    #[test]
    fn test_timed_out_prompt_does_not_hold_runtime_shutdown() {
        let (tx, rx) = mpsc::unbounded_channel();
        let provider = ConsoleApprovalProvider::with_input(Console::new(), rx);
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let first = coordinator(provider.clone(), 50);
        let decision = runtime
            .block_on(first.decide("send_email", json!({}), "agent", "session", "ctx"))
            .unwrap();
        assert!(decision.is_timeout());
        assert_eq!(decision.approver, SYSTEM_APPROVER);
        assert!(first.registry().is_empty());

        // The abandoned prompt left no reader behind, so the next answer
        // goes to the next request
        tx.send("y".to_string()).unwrap();
        let next = coordinator(provider, 5_000);
        let decision = runtime
            .block_on(next.decide("send_email", json!({}), "agent", "session", "ctx"))
            .unwrap();
        assert!(decision.approved);
        assert_eq!(decision.request_id, "req-1");

        let started = std::time::Instant::now();
        drop(runtime);
        assert!(started.elapsed() < Duration::from_secs(1));
        drop(tx);
    }
}
