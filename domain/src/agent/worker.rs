//! Swarm workers and their pool.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerStatus {
    Idle,
    Working,
    Succeeded,
    Failed,
    Terminated,
}

impl WorkerStatus {
    pub fn as_str(&self) -> &str {
        match self {
            WorkerStatus::Idle => "idle",
            WorkerStatus::Working => "working",
            WorkerStatus::Succeeded => "succeeded",
            WorkerStatus::Failed => "failed",
            WorkerStatus::Terminated => "terminated",
        }
    }

    /// A worker can take a cycle unless it is mid-cycle or terminated.
    pub fn is_available(&self) -> bool {
        matches!(
            self,
            WorkerStatus::Idle | WorkerStatus::Succeeded | WorkerStatus::Failed
        )
    }
}

impl std::fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentWorker {
    pub id: String,
    pub status: WorkerStatus,
    pub last_action: Option<String>,
    pub error: Option<String>,
    pub result: Option<Value>,
}

impl AgentWorker {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: WorkerStatus::Idle,
            last_action: None,
            error: None,
            result: None,
        }
    }
}

/// Ordered pool of workers, serviced one per swarm cycle.
///
/// Terminated workers stay in the pool as a record; their replacements are
/// appended at the end.
#[derive(Debug, Clone)]
pub struct WorkerPool {
    workers: Vec<AgentWorker>,
    spawned: usize,
    cursor: usize,
}

impl WorkerPool {
    pub fn new(size: usize) -> Self {
        let mut pool = Self {
            workers: Vec::with_capacity(size),
            spawned: 0,
            cursor: 0,
        };
        for _ in 0..size {
            pool.spawn();
        }
        pool
    }

    /// Append a fresh idle worker and return its index.
    pub fn spawn(&mut self) -> usize {
        self.spawned += 1;
        self.workers
            .push(AgentWorker::new(format!("worker-{}", self.spawned)));
        self.workers.len() - 1
    }

    /// Pick the next available worker, rotating from the last pick so the
    /// pool is serviced fairly.
    pub fn next_available(&mut self) -> Option<usize> {
        let len = self.workers.len();
        if len == 0 {
            return None;
        }
        let found = (0..len)
            .map(|offset| (self.cursor + offset) % len)
            .find(|&i| self.workers[i].status.is_available())?;
        self.cursor = (found + 1) % len;
        Some(found)
    }

    pub fn begin(&mut self, index: usize, action: impl Into<String>) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.status = WorkerStatus::Working;
            worker.last_action = Some(action.into());
            worker.error = None;
        }
    }

    pub fn succeed(&mut self, index: usize, result: Option<Value>) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.status = WorkerStatus::Succeeded;
            worker.result = result;
            worker.error = None;
        }
    }

    pub fn fail(&mut self, index: usize, error: impl Into<String>) {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.status = WorkerStatus::Failed;
            worker.error = Some(error.into());
        }
    }

    /// Mark a worker terminated and append an idle replacement.
    ///
    /// Returns the replacement's index.
    pub fn terminate_and_replace(&mut self, index: usize, error: impl Into<String>) -> usize {
        if let Some(worker) = self.workers.get_mut(index) {
            worker.status = WorkerStatus::Terminated;
            worker.error = Some(error.into());
        }
        self.spawn()
    }

    pub fn get(&self, index: usize) -> Option<&AgentWorker> {
        self.workers.get(index)
    }

    pub fn workers(&self) -> &[AgentWorker] {
        &self.workers
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    pub fn count(&self, status: WorkerStatus) -> usize {
        self.workers.iter().filter(|w| w.status == status).count()
    }
}
