//! Shared handle to the tool registry.
//!
//! Every loop, the runtime API and the scheduler see the same registry
//! through a [`RegistryHandle`]. Writes are serialized by a lock that is
//! never held across an `.await`, so two loops updating the same tool each
//! observe the other's version bump.
//!
//! The handle also keeps the recent activity log (the `history` array of
//! the persisted document) and saves through a [`ToolStorePort`] after
//! every mutation when one is attached. Snapshot and save happen under one
//! persist lock, so saves reach the store in mutation order and the last
//! one always carries the newest state. On a multi-threaded runtime the
//! save runs inside `block_in_place`.

use crate::ports::tool_store::ToolStorePort;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::runtime::{Handle, RuntimeFlavor};
use toolforge_domain::{
    DomainError, EnrichedResult, NewTool, RegistryDocument, Tool, ToolRegistry, ToolSummary,
    ToolUpdate,
};
use tracing::{debug, warn};

/// Number of activity entries kept in the persisted document.
pub const ACTIVITY_CAPACITY: usize = 50;

#[derive(Clone)]
pub struct RegistryHandle {
    registry: Arc<RwLock<ToolRegistry>>,
    activity: Arc<Mutex<VecDeque<EnrichedResult>>>,
    store: Option<Arc<dyn ToolStorePort>>,
    persist_lock: Arc<Mutex<()>>,
}

impl RegistryHandle {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            activity: Arc::new(Mutex::new(VecDeque::new())),
            store: None,
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Build a handle from a loaded document, saving back to `store`.
    pub fn from_document(document: RegistryDocument, store: Arc<dyn ToolStorePort>) -> Self {
        let (registry, history) = document.into_registry();
        let mut activity: VecDeque<EnrichedResult> = history.into();
        activity.truncate(ACTIVITY_CAPACITY);
        Self {
            registry: Arc::new(RwLock::new(registry)),
            activity: Arc::new(Mutex::new(activity)),
            store: Some(store),
            persist_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn add(&self, payload: NewTool) -> Result<Tool, DomainError> {
        let tool = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            registry.add(payload)?
        };
        debug!(tool = %tool.name, id = %tool.id, "Tool added");
        self.persist();
        Ok(tool)
    }

    pub fn update(&self, name: &str, update: ToolUpdate) -> Result<Tool, DomainError> {
        let tool = {
            let mut registry = self.registry.write().unwrap_or_else(PoisonError::into_inner);
            registry.update(name, update)?
        };
        debug!(tool = %tool.name, version = tool.version, "Tool updated");
        self.persist();
        Ok(tool)
    }

    pub fn get(&self, name: &str) -> Option<Tool> {
        self.read(|r| r.get(name).cloned())
    }

    /// Snapshot of every tool in registry order.
    pub fn list(&self) -> Vec<Tool> {
        self.read(|r| r.list().to_vec())
    }

    pub fn names(&self) -> Vec<String> {
        self.read(ToolRegistry::names)
    }

    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.read(ToolRegistry::summaries)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read(|r| r.contains(name))
    }

    /// Append a folded-back result to the activity log.
    pub fn record(&self, result: &EnrichedResult) {
        {
            let mut activity = self.activity.lock().unwrap_or_else(PoisonError::into_inner);
            activity.push_front(result.clone());
            activity.truncate(ACTIVITY_CAPACITY);
        }
        self.persist();
    }

    /// Activity log, newest first.
    pub fn activity(&self) -> Vec<EnrichedResult> {
        let activity = self.activity.lock().unwrap_or_else(PoisonError::into_inner);
        activity.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> RegistryDocument {
        let history = self.activity();
        self.read(|r| RegistryDocument::from_registry(r, history))
    }

    fn read<T>(&self, f: impl FnOnce(&ToolRegistry) -> T) -> T {
        let registry = self.registry.read().unwrap_or_else(PoisonError::into_inner);
        f(&registry)
    }

    fn persist(&self) {
        let Some(store) = &self.store else {
            return;
        };
        let _guard = self.persist_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let document = self.snapshot();
        let saved = match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| store.save(&document))
            }
            _ => store.save(&document),
        };
        if let Err(e) = saved {
            warn!(error = %e, "Failed to save tool registry");
        }
    }
}
