//! Interactive approval for assist mode.
//!
//! When assist mode holds a proposal, the user sees:
//!
//! ```text
//! ───────────────────────────────────────────────────────────────
//!   Proposed tool call
//! ───────────────────────────────────────────────────────────────
//!
//! Request:
//!   <original request>
//!
//! Tool: Create Tool
//! Arguments:
//!   { ... }
//!
//! Commands:
//!   /approve  - Run this call
//!   /reject   - Discard it
//!
//! assist>
//! ```
//!
//! | Command | Aliases |
//! |---------|---------|
//! | `/approve` | `approve`, `a`, `y`, `yes` |
//! | `/reject` | `reject`, `r`, `n`, `no`, `q` |

use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use toolforge_application::{ApprovalDecision, ApprovalError, ApprovalPort, Proposal};

const RULE: &str = "───────────────────────────────────────────────────────────────";

/// Terminal implementation of [`ApprovalPort`].
pub struct InteractiveApproval;

impl InteractiveApproval {
    pub fn new() -> Self {
        Self
    }

    fn display_proposal(&self, proposal: &Proposal) {
        println!();
        println!("{}", RULE.yellow().bold());
        println!("{}", "  Proposed tool call".yellow().bold());
        println!("{}", RULE.yellow().bold());
        println!();

        println!("{}", "Request:".cyan().bold());
        println!("  {}", proposal.request.dimmed());
        println!();

        if let Some(suggestion) = &proposal.revised_with {
            println!("{}", "Revised after critique:".cyan().bold());
            println!("  {}", suggestion);
            println!();
        }

        println!("{} {}", "Tool:".cyan().bold(), proposal.tool_call.name.bold());
        let arguments = serde_json::to_string_pretty(&proposal.tool_call.arguments)
            .unwrap_or_else(|_| "{}".to_string());
        println!("{}", "Arguments:".cyan().bold());
        for line in arguments.lines() {
            println!("  {}", line);
        }
        println!();

        println!("{}", "Commands:".cyan().bold());
        println!("  {}  - Run this call", "/approve".green());
        println!("  {}   - Discard it", "/reject".red());
        println!();
    }
}

impl Default for InteractiveApproval {
    fn default() -> Self {
        Self::new()
    }
}

/// Map a typed command to a decision. `None` for anything unrecognized.
pub fn parse_decision(input: &str) -> Option<ApprovalDecision> {
    match input.trim().to_lowercase().as_str() {
        "/approve" | "approve" | "a" | "y" | "yes" => Some(ApprovalDecision::Approve),
        "/reject" | "reject" | "r" | "n" | "no" | "q" => Some(ApprovalDecision::Reject),
        _ => None,
    }
}

/// Print `prompt` and read one trimmed line from stdin.
pub fn read_line(prompt: &str) -> Result<String, ApprovalError> {
    print!("{} ", prompt.magenta().bold());
    io::stdout()
        .flush()
        .map_err(|e| ApprovalError::IoError(format!("Failed to flush stdout: {}", e)))?;

    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .map_err(|e| ApprovalError::IoError(format!("Failed to read input: {}", e)))?;
    if read == 0 {
        return Err(ApprovalError::Cancelled);
    }
    Ok(input.trim().to_string())
}

#[async_trait]
impl ApprovalPort for InteractiveApproval {
    async fn decide(&self, proposal: &Proposal) -> Result<ApprovalDecision, ApprovalError> {
        self.display_proposal(proposal);

        loop {
            let input = read_line("assist>")?;
            if input.is_empty() {
                continue;
            }
            match parse_decision(&input) {
                Some(ApprovalDecision::Approve) => {
                    println!("{}", "✓ Approved".green());
                    return Ok(ApprovalDecision::Approve);
                }
                Some(ApprovalDecision::Reject) => {
                    println!("{}", "✗ Rejected".red());
                    return Ok(ApprovalDecision::Reject);
                }
                None => {
                    println!("{} Unknown command: {}", "!".yellow(), input.red());
                    println!("Available commands: /approve, /reject");
                }
            }
        }
    }
}
