//! Versioned JSON shape of the persisted registry and its migration chain.

pub mod document;
pub mod migration;

pub use document::{CURRENT_VERSION, RegistryDocument};
pub use migration::{MigrationError, migrate};
