//! In-memory tool registry
//!
//! The registry is the single owner of the [`Tool`] lifecycle. It enforces
//! the invariants every other layer relies on:
//!
//! - names are unique at all times
//! - ids are slugs derived from the name, disambiguated with a numeric suffix
//! - `version` starts at 1 and grows by exactly 1 per successful update
//! - `description`, `implementation` and `category` can never be cleared
//!
//! Iteration order is insertion order; retrieval tie-breaks depend on it.

use super::entities::{NewTool, Tool, ToolSummary, ToolUpdate};
use crate::core::error::DomainError;
use crate::core::string::slugify;
use chrono::{DateTime, TimeDelta, Utc};

#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Vec<Tool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from a persisted snapshot.
    ///
    /// Later entries whose name or id collides with an earlier one are dropped.
    pub fn from_tools(tools: impl IntoIterator<Item = Tool>) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            if registry.contains(&tool.name) || registry.id_taken(&tool.id) {
                continue;
            }
            registry.tools.push(tool);
        }
        registry
    }

    /// Register a new tool.
    pub fn add(&mut self, payload: NewTool) -> Result<Tool, DomainError> {
        self.add_at(payload, Utc::now())
    }

    pub(crate) fn add_at(
        &mut self,
        payload: NewTool,
        now: DateTime<Utc>,
    ) -> Result<Tool, DomainError> {
        if self.contains(&payload.name) {
            return Err(DomainError::DuplicateName(payload.name));
        }
        if payload.name.trim().is_empty() {
            return Err(DomainError::validation("name must not be empty"));
        }
        if payload.description.trim().is_empty() {
            return Err(DomainError::validation("description must not be empty"));
        }
        if payload.implementation.trim().is_empty() {
            return Err(DomainError::validation("implementation must not be empty"));
        }

        let tool = Tool {
            id: self.unique_id(&payload.name),
            name: payload.name,
            description: payload.description,
            category: payload.category,
            version: 1,
            parameters: payload.parameters,
            implementation: payload.implementation,
            created_at: now,
            updated_at: now,
        };
        self.tools.push(tool.clone());
        Ok(tool)
    }

    /// Merge `update` into the tool called `name`.
    ///
    /// Validation runs before anything is written, so a rejected update
    /// leaves the stored tool untouched.
    pub fn update(&mut self, name: &str, update: ToolUpdate) -> Result<Tool, DomainError> {
        let tool = self
            .tools
            .iter_mut()
            .find(|t| t.name == name)
            .ok_or_else(|| DomainError::NotFound(name.to_string()))?;

        let description = required_text("description", update.description)?;
        let implementation = required_text("implementation", update.implementation)?;
        let category = match update.category {
            None => None,
            Some(None) => return Err(DomainError::validation("category must not be empty")),
            Some(Some(c)) => Some(c),
        };

        if let Some(description) = description {
            tool.description = description;
        }
        if let Some(implementation) = implementation {
            tool.implementation = implementation;
        }
        if let Some(category) = category {
            tool.category = category;
        }
        if let Some(parameters) = update.parameters {
            tool.parameters = parameters;
        }

        tool.version += 1;
        // Keep updatedAt strictly increasing even when two updates land in
        // the same clock tick.
        tool.updated_at = Utc::now().max(tool.updated_at + TimeDelta::milliseconds(1));
        Ok(tool.clone())
    }

    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn get_by_id(&self, id: &str) -> Option<&Tool> {
        self.tools.iter().find(|t| t.id == id)
    }

    pub fn list(&self) -> &[Tool] {
        &self.tools
    }

    pub fn names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name.clone()).collect()
    }

    pub fn summaries(&self) -> Vec<ToolSummary> {
        self.tools.iter().map(Tool::summary).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    fn id_taken(&self, id: &str) -> bool {
        self.tools.iter().any(|t| t.id == id)
    }

    fn unique_id(&self, name: &str) -> String {
        let base = slugify(name);
        if !self.id_taken(&base) {
            return base;
        }
        let mut suffix = 2;
        loop {
            let candidate = format!("{}_{}", base, suffix);
            if !self.id_taken(&candidate) {
                return candidate;
            }
            suffix += 1;
        }
    }
}

fn required_text(
    field: &str,
    value: Option<Option<String>>,
) -> Result<Option<String>, DomainError> {
    match value {
        None => Ok(None),
        Some(Some(s)) if !s.trim().is_empty() => Ok(Some(s)),
        Some(_) => Err(DomainError::validation(format!(
            "{} must not be empty",
            field
        ))),
    }
}
