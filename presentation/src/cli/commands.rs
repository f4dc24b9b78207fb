//! CLI command definitions

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use toolforge_application::RetrievalKind;

/// Retrieval strategy override
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RetrievalArg {
    /// Every tool, no model calls
    Direct,
    /// Ask the model to pick tools
    Llm,
    /// Cosine similarity over embeddings
    Embedding,
}

impl From<RetrievalArg> for RetrievalKind {
    fn from(arg: RetrievalArg) -> Self {
        match arg {
            RetrievalArg::Direct => RetrievalKind::Direct,
            RetrievalArg::Llm => RetrievalKind::Llm,
            RetrievalArg::Embedding => RetrievalKind::Embedding,
        }
    }
}

/// CLI arguments for toolforge
#[derive(Parser, Debug)]
#[command(name = "toolforge")]
#[command(author, version, about = "Self-extending agent runtime: tools as data, Lua as behavior")]
#[command(long_about = r#"
toolforge keeps a registry of versioned tools whose behavior is Lua source.
A language model picks one tool call per cycle; tools can create and
improve other tools at runtime.

Modes:
  command      One request, one tool call
  assist       Like command, but you approve the call first
  task         Iterate on one task until "Task Complete"
  autonomous   Generate goals and act on them within a daily budget
  swarm        Several workers share one goal and one history

Configuration files are loaded from (in priority order):
1. TOOLFORGE_<SECTION>__<KEY>   Environment variables
2. --config <path>              Explicit config file
3. ./toolforge.toml             Project-level config
4. ~/.config/toolforge/config.toml   Global config

Example:
  toolforge command "echo hello with prefix '> '"
  toolforge task "create a tool that formats ISO dates, then test it"
  toolforge swarm "build a unit converter" --workers 2
"#)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long, global = true)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Override the retrieval strategy
    #[arg(long, value_enum, global = true)]
    pub retrieval: Option<RetrievalArg>,

    /// Override the tool registry file
    #[arg(long, value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one request as a single tool call
    Command {
        /// What to do
        request: String,
    },

    /// Propose one tool call and ask before running it
    Assist {
        request: String,

        /// Approve without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Work on a task over several tool calls
    Task {
        task: String,

        /// Maximum number of tool calls
        #[arg(long, value_name = "N")]
        max_iterations: Option<usize>,
    },

    /// Generate and pursue goals on your own
    Autonomous {
        /// Stop after this many cycles
        #[arg(long, value_name = "N")]
        limit: Option<usize>,
    },

    /// Pursue one goal with several workers
    Swarm {
        goal: String,

        /// Number of workers
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
    },

    /// Inspect the tool registry
    Tools {
        #[command(subcommand)]
        action: ToolsAction,
    },

    /// Improve a tool, then self-test and verify it
    Improve {
        /// Tool to improve
        name: String,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// File holding the new Lua implementation
        #[arg(long, value_name = "PATH")]
        implementation_file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum ToolsAction {
    /// List every registered tool
    List,
    /// Show one tool with its implementation
    Show { name: String },
}
