//! Migration chain for older registry documents.
//!
//! Each step upgrades a raw JSON document by exactly one version in place:
//!
//! | From | To | Change |
//! |------|----|--------|
//! | 1 | 2 | per tool: add missing `id`, `version`, `createdAt`, `updatedAt` |
//! | 2 | 3 | add the top-level `history` array |
//!
//! Documents without a `version` field are treated as version 1.

use super::document::{CURRENT_VERSION, RegistryDocument};
use crate::core::string::slugify;
use chrono::{SecondsFormat, Utc};
use serde_json::{Map, Value, json};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    #[error("Corrupt registry document: {0}")]
    Corrupt(String),

    #[error("Unsupported registry document version {0}")]
    UnsupportedVersion(u64),
}

type Step = fn(&mut Map<String, Value>) -> Result<(), MigrationError>;

/// `(from_version, step)` pairs applied in order.
const STEPS: [(u64, Step); 2] = [(1, v1_to_v2), (2, v2_to_v3)];

/// Upgrade a raw document to the current version and parse it.
pub fn migrate(mut raw: Value) -> Result<RegistryDocument, MigrationError> {
    let doc = raw
        .as_object_mut()
        .ok_or_else(|| MigrationError::Corrupt("document is not an object".to_string()))?;

    let mut version = match doc.get("version") {
        None => 1,
        Some(v) => v
            .as_u64()
            .ok_or_else(|| MigrationError::Corrupt(format!("invalid version {}", v)))?,
    };
    if version == 0 || version > u64::from(CURRENT_VERSION) {
        return Err(MigrationError::UnsupportedVersion(version));
    }
    if !doc.get("tools").is_some_and(Value::is_array) {
        return Err(MigrationError::Corrupt("missing tools array".to_string()));
    }

    for (from, step) in STEPS {
        if version == from {
            step(doc)?;
            version = from + 1;
            doc.insert("version".to_string(), json!(version));
        }
    }

    serde_json::from_value(raw).map_err(|e| MigrationError::Corrupt(e.to_string()))
}

fn v1_to_v2(doc: &mut Map<String, Value>) -> Result<(), MigrationError> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    let tools = doc
        .get_mut("tools")
        .and_then(Value::as_array_mut)
        .ok_or_else(|| MigrationError::Corrupt("missing tools array".to_string()))?;

    for tool in tools.iter_mut() {
        let tool = tool
            .as_object_mut()
            .ok_or_else(|| MigrationError::Corrupt("tool entry is not an object".to_string()))?;
        if !tool.contains_key("id") {
            let name = tool.get("name").and_then(Value::as_str).unwrap_or_default();
            tool.insert("id".to_string(), json!(slugify(name)));
        }
        tool.entry("version").or_insert_with(|| json!(1));
        let created = tool
            .entry("createdAt")
            .or_insert_with(|| json!(now))
            .clone();
        tool.entry("updatedAt").or_insert(created);
    }
    Ok(())
}

fn v2_to_v3(doc: &mut Map<String, Value>) -> Result<(), MigrationError> {
    doc.entry("history").or_insert_with(|| json!([]));
    Ok(())
}
