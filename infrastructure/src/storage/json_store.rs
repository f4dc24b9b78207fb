//! JSON file tool store
//!
//! The whole registry document lives in one pretty-printed JSON file.
//! Loading migrates older versions in memory; an unreadable or corrupt
//! file is discarded in favour of the built-in tool set. Saving writes a
//! sibling temp file and renames it over the target.

use super::default_tools::{default_document, seed_defaults};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use toolforge_application::ports::tool_store::{StoreError, ToolStorePort};
use toolforge_domain::{RegistryDocument, migrate};
use tracing::{debug, info, warn};

pub struct JsonToolStore {
    path: PathBuf,
}

impl JsonToolStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<Option<RegistryDocument>, String> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.to_string()),
        };
        let raw: Value = serde_json::from_str(&content).map_err(|e| e.to_string())?;
        let stored_version = raw.get("version").and_then(Value::as_u64).unwrap_or(1);
        let document = migrate(raw).map_err(|e| e.to_string())?;
        if stored_version < u64::from(document.version) {
            info!(
                path = %self.path.display(),
                from = stored_version,
                to = document.version,
                "Migrated tool registry document"
            );
        }
        Ok(Some(document))
    }
}

impl ToolStorePort for JsonToolStore {
    fn load(&self) -> Result<RegistryDocument, StoreError> {
        let document = match self.read_document() {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(path = %self.path.display(), "No tool registry yet, using built-in tools");
                return Ok(default_document());
            }
            Err(reason) => {
                warn!(
                    path = %self.path.display(),
                    reason = %reason,
                    "Discarding unusable tool registry, using built-in tools"
                );
                return Ok(default_document());
            }
        };

        let (mut registry, history) = document.into_registry();
        let restored = seed_defaults(&mut registry);
        if restored > 0 {
            info!(count = restored, "Restored missing built-in tools");
        }
        Ok(RegistryDocument::from_registry(&registry, history))
    }

    fn save(&self, document: &RegistryDocument) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path).inspect_err(|e| {
            warn!(from = %tmp_path.display(), to = %self.path.display(), error = %e, "Failed to rename tool registry into place");
        })?;
        debug!(path = %self.path.display(), tools = document.tools.len(), "Saved tool registry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use toolforge_application::RegistryHandle;
    use toolforge_domain::well_known::{CREATE_TOOL, ECHO};
    use toolforge_domain::{CURRENT_VERSION, NewTool, ToolCategory, ToolUpdate};

    fn store_in(dir: &tempfile::TempDir) -> JsonToolStore {
        JsonToolStore::new(dir.path().join("nested").join("tools.json"))
    }

    #[test]
    fn test_missing_file_yields_builtins() {
        let dir = tempfile::tempdir().unwrap();
        let document = store_in(&dir).load().unwrap();
        assert_eq!(document.version, CURRENT_VERSION);
        assert!(document.tools.iter().any(|t| t.name == CREATE_TOOL));
    }

    #[test]
    fn test_save_then_load_keeps_custom_tools() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);

        let (mut registry, history) = store.load().unwrap().into_registry();
        registry
            .add(NewTool::new("Shout", "Uppercases", ToolCategory::Functional, "return 1"))
            .unwrap();
        store
            .save(&RegistryDocument::from_registry(&registry, history))
            .unwrap();

        assert!(store.path().exists());
        assert!(!store.path().with_extension("json.tmp").exists());
        let loaded = store.load().unwrap();
        assert_eq!(loaded.tools.len(), registry.len());
        assert!(loaded.tools.iter().any(|t| t.name == "Shout"));
    }

    #[test]
    fn test_file_matches_registry_after_concurrent_updates() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));
        let handle = RegistryHandle::from_document(store.load().unwrap(), store.clone());

        let threads: Vec<_> = (0..8)
            .map(|i| {
                let h = handle.clone();
                std::thread::spawn(move || {
                    h.update(ECHO, ToolUpdate::new().with_description(format!("echo {}", i)))
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }

        let on_disk = store.load().unwrap();
        let echo = on_disk.tools.iter().find(|t| t.name == ECHO).unwrap();
        assert_eq!(echo.version, 9);
        assert_eq!(on_disk.tools, handle.snapshot().tools);
    }

    #[test]
    fn test_corrupt_file_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), "{ not json").unwrap();

        let document = store.load().unwrap();
        assert_eq!(document.tools.len(), default_document().tools.len());
    }

    #[test]
    fn test_future_version_is_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        fs::write(store.path(), json!({"version": 99, "tools": []}).to_string()).unwrap();

        let document = store.load().unwrap();
        assert_eq!(document.version, CURRENT_VERSION);
        assert!(document.tools.iter().any(|t| t.name == ECHO));
    }

    #[test]
    fn test_v1_document_is_migrated_and_topped_up() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let v1 = json!({
            "tools": [{
                "name": "Legacy",
                "description": "from the first release",
                "category": "Functional",
                "implementation": "return 'old'"
            }]
        });
        fs::write(store.path(), v1.to_string()).unwrap();

        let document = store.load().unwrap();
        assert_eq!(document.version, CURRENT_VERSION);
        let legacy = document.tools.iter().find(|t| t.name == "Legacy").unwrap();
        assert_eq!(legacy.version, 1);
        assert_eq!(legacy.id, "legacy");
        assert!(document.tools.iter().any(|t| t.name == CREATE_TOOL));
        assert!(document.history.is_empty());
    }
}
