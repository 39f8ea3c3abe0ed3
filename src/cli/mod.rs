//! Terminal rendering and the human-in-the-loop decision provider

mod console;

pub use console::{parse_answer, Console, ConsoleApprovalProvider, HUMAN_OPERATOR};
