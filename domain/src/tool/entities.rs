//! Tool domain entities

use crate::core::error::DomainError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// Broad classification of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolCategory {
    #[serde(rename = "UI")]
    Ui,
    Functional,
    Automation,
    Server,
}

impl ToolCategory {
    pub fn as_str(&self) -> &str {
        match self {
            ToolCategory::Ui => "UI",
            ToolCategory::Functional => "Functional",
            ToolCategory::Automation => "Automation",
            ToolCategory::Server => "Server",
        }
    }
}

impl std::fmt::Display for ToolCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ToolCategory {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ui" => Ok(ToolCategory::Ui),
            "functional" => Ok(ToolCategory::Functional),
            "automation" => Ok(ToolCategory::Automation),
            "server" => Ok(ToolCategory::Server),
            other => Err(DomainError::validation(format!(
                "unknown tool category '{}'",
                other
            ))),
        }
    }
}

/// Declared parameter of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    /// Parameter type hint (e.g., "string", "number", "object")
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

fn default_param_type() -> String {
    "string".to_string()
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            param_type: default_param_type(),
            description: description.into(),
            required,
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }
}

/// A registered capability.
///
/// Only [`ToolRegistry`](super::registry::ToolRegistry) creates and updates
/// tools; everything else sees clones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    pub version: u32,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    /// Lua source interpreted by the execution sandbox
    pub implementation: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tool {
    pub fn summary(&self) -> ToolSummary {
        ToolSummary {
            name: self.name.clone(),
            description: self.description.clone(),
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

/// Lightweight `{name, description}` view used for retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
}

impl ToolSummary {
    /// Text fed to the embedder.
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// Payload for [`ToolRegistry::add`](super::registry::ToolRegistry::add).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTool {
    pub name: String,
    pub description: String,
    pub category: ToolCategory,
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
    pub implementation: String,
}

impl NewTool {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: ToolCategory,
        implementation: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            category,
            parameters: Vec::new(),
            implementation: implementation.into(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    /// Parse a creation payload sent by a tool implementation.
    ///
    /// Missing text fields become empty strings so the registry reports
    /// them as validation errors. The category is matched case-insensitively
    /// and defaults to `Functional`.
    pub fn from_json(value: &Value) -> Result<Self, DomainError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DomainError::validation("tool payload must be an object"))?;
        let text = |key: &str| -> Result<String, DomainError> {
            match obj.get(key) {
                None | Some(Value::Null) => Ok(String::new()),
                Some(Value::String(s)) => Ok(s.clone()),
                Some(other) => Err(DomainError::validation(format!(
                    "field '{}' must be a string, got {}",
                    key, other
                ))),
            }
        };

        let category = match text("category")? {
            c if c.trim().is_empty() => ToolCategory::Functional,
            c => c.parse()?,
        };
        // Lua encodes an empty list as an empty table, which arrives as `{}`
        let parameters = match obj.get("parameters") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(m)) if m.is_empty() => Vec::new(),
            Some(v) => serde_json::from_value(v.clone())
                .map_err(|e| DomainError::validation(format!("invalid parameters: {}", e)))?,
        };

        Ok(Self {
            name: text("name")?,
            description: text("description")?,
            category,
            parameters,
            implementation: text("implementation")?,
        })
    }
}

/// Partial update for [`ToolRegistry::update`](super::registry::ToolRegistry::update).
///
/// Outer `None` means "leave unchanged". `Some(None)` means the caller sent
/// an explicit null, which the registry rejects for essential fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolUpdate {
    pub description: Option<Option<String>>,
    pub category: Option<Option<ToolCategory>>,
    pub implementation: Option<Option<String>>,
    pub parameters: Option<Vec<ToolParameter>>,
}

impl ToolUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn with_category(mut self, category: ToolCategory) -> Self {
        self.category = Some(Some(category));
        self
    }

    pub fn with_implementation(mut self, implementation: impl Into<String>) -> Self {
        self.implementation = Some(Some(implementation.into()));
        self
    }

    pub fn with_parameters(mut self, parameters: Vec<ToolParameter>) -> Self {
        self.parameters = Some(parameters);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none()
            && self.category.is_none()
            && self.implementation.is_none()
            && self.parameters.is_none()
    }

    /// Parse a JSON object of fields, keeping explicit nulls distinguishable
    /// from absent keys.
    pub fn from_json(value: &Value) -> Result<Self, DomainError> {
        let obj = value
            .as_object()
            .ok_or_else(|| DomainError::validation("update fields must be an object"))?;

        let text_field = |key: &str| -> Result<Option<Option<String>>, DomainError> {
            match obj.get(key) {
                None => Ok(None),
                Some(Value::Null) => Ok(Some(None)),
                Some(Value::String(s)) => Ok(Some(Some(s.clone()))),
                Some(other) => Err(DomainError::validation(format!(
                    "field '{}' must be a string, got {}",
                    key, other
                ))),
            }
        };

        let description = text_field("description")?;
        let implementation = text_field("implementation")?;
        let category = match text_field("category")? {
            None => None,
            Some(None) => Some(None),
            Some(Some(s)) if s.trim().is_empty() => Some(None),
            Some(Some(s)) => Some(Some(s.parse()?)),
        };
        let parameters = match obj.get("parameters") {
            None | Some(Value::Null) => None,
            Some(Value::Object(m)) if m.is_empty() => Some(Vec::new()),
            Some(v) => Some(
                serde_json::from_value(v.clone())
                    .map_err(|e| DomainError::validation(format!("invalid parameters: {}", e)))?,
            ),
        };

        Ok(Self {
            description,
            category,
            implementation,
            parameters,
        })
    }
}

/// A request to invoke one tool by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl ToolCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn arguments_value(&self) -> Value {
        Value::Object(self.arguments.clone())
    }
}
