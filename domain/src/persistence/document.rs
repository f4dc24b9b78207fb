//! The persisted registry document.

use crate::tool::entities::Tool;
use crate::tool::registry::ToolRegistry;
use crate::tool::value_objects::EnrichedResult;
use serde::{Deserialize, Serialize};

/// Current document schema version.
pub const CURRENT_VERSION: u32 = 3;

/// `{version, tools, history}` as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    pub version: u32,
    pub tools: Vec<Tool>,
    #[serde(default)]
    pub history: Vec<EnrichedResult>,
}

impl RegistryDocument {
    pub fn new(tools: Vec<Tool>, history: Vec<EnrichedResult>) -> Self {
        Self {
            version: CURRENT_VERSION,
            tools,
            history,
        }
    }

    pub fn from_registry(registry: &ToolRegistry, history: Vec<EnrichedResult>) -> Self {
        Self::new(registry.list().to_vec(), history)
    }

    pub fn into_registry(self) -> (ToolRegistry, Vec<EnrichedResult>) {
        (ToolRegistry::from_tools(self.tools), self.history)
    }
}
