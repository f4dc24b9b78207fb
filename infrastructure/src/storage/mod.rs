//! Registry persistence.

mod default_tools;
mod json_store;

pub use default_tools::{default_document, default_tools, seed_defaults};
pub use json_store::JsonToolStore;
