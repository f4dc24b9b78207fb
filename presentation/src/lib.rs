//! Presentation layer for toolforge
//!
//! This crate contains CLI definitions, output formatters, the console
//! progress reporter and interactive approval.

pub mod agent;
pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use agent::InteractiveApproval;
pub use cli::commands::{Cli, Command, RetrievalArg, ToolsAction};
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ConsoleReporter, describe_event};
