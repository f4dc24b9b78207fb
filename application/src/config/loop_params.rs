//! Control-loop parameters.
//!
//! Static knobs for each operating mode, the retrieval strategies and the
//! tool sandbox. Infrastructure maps the file config onto these.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use toolforge_domain::DEFAULT_HISTORY_CAPACITY;

/// Which retrieval algorithm selects tools for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalKind {
    Direct,
    Llm,
    #[default]
    Embedding,
}

impl RetrievalKind {
    pub fn as_str(&self) -> &str {
        match self {
            RetrievalKind::Direct => "direct",
            RetrievalKind::Llm => "llm",
            RetrievalKind::Embedding => "embedding",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "direct" => Some(RetrievalKind::Direct),
            "llm" => Some(RetrievalKind::Llm),
            "embedding" => Some(RetrievalKind::Embedding),
            _ => None,
        }
    }
}

impl std::fmt::Display for RetrievalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalParams {
    pub kind: RetrievalKind,
    /// Minimum cosine similarity to keep a tool (inclusive).
    pub similarity_threshold: f32,
    pub top_k: usize,
}

impl Default for RetrievalParams {
    fn default() -> Self {
        Self {
            kind: RetrievalKind::default(),
            similarity_threshold: 0.25,
            top_k: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousParams {
    /// Actions per calendar day, `-1` for unlimited.
    pub daily_limit: i64,
    pub cooldown: Duration,
    pub history_capacity: usize,
}

impl Default for AutonomousParams {
    fn default() -> Self {
        Self {
            daily_limit: 50,
            cooldown: Duration::from_secs(30),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl AutonomousParams {
    pub fn with_daily_limit(mut self, limit: i64) -> Self {
        self.daily_limit = limit;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskParams {
    pub max_iterations: usize,
    pub history_capacity: usize,
}

impl Default for TaskParams {
    fn default() -> Self {
        Self {
            max_iterations: 15,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
        }
    }
}

impl TaskParams {
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwarmParams {
    pub workers: usize,
    /// Global cap on cycles across all workers.
    pub max_iterations: usize,
    /// Wait before rescanning when no worker is available.
    pub poll_delay: Duration,
}

impl Default for SwarmParams {
    fn default() -> Self {
        Self {
            workers: 3,
            max_iterations: 25,
            poll_delay: Duration::from_secs(2),
        }
    }
}

impl SwarmParams {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SandboxParams {
    /// Maximum nesting of `runtime.tools.run`.
    pub max_call_depth: usize,
    /// Wall-clock limit for one top-level tool execution.
    pub timeout: Duration,
    pub memory_limit_bytes: usize,
}

impl Default for SandboxParams {
    fn default() -> Self {
        Self {
            max_call_depth: 8,
            timeout: Duration::from_secs(30),
            memory_limit_bytes: 64 * 1024 * 1024,
        }
    }
}

/// All loop parameters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub retrieval: RetrievalParams,
    pub autonomous: AutonomousParams,
    pub task: TaskParams,
    pub swarm: SwarmParams,
    pub sandbox: SandboxParams,
}

impl RuntimeConfig {
    pub fn with_retrieval(mut self, kind: RetrievalKind) -> Self {
        self.retrieval.kind = kind;
        self
    }

    pub fn with_autonomous(mut self, params: AutonomousParams) -> Self {
        self.autonomous = params;
        self
    }

    pub fn with_task(mut self, params: TaskParams) -> Self {
        self.task = params;
        self
    }

    pub fn with_swarm(mut self, params: SwarmParams) -> Self {
        self.swarm = params;
        self
    }
}
