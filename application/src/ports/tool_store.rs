//! Tool store port
//!
//! Loads and saves the versioned registry document. Adapters are
//! responsible for migrating old documents and for falling back to the
//! built-in tool set when the stored one is unusable.

use thiserror::Error;
use toolforge_domain::RegistryDocument;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub trait ToolStorePort: Send + Sync {
    fn load(&self) -> Result<RegistryDocument, StoreError>;

    fn save(&self, document: &RegistryDocument) -> Result<(), StoreError>;
}
