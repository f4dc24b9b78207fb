//! Domain namespaces exposed to tools through `runtime.call`.

use async_trait::async_trait;
use serde_json::Value;

/// A named group of callbacks supplied by an external collaborator.
#[async_trait]
pub trait DomainNamespace: Send + Sync {
    fn name(&self) -> &str;

    /// Invoke `method` with JSON arguments. Errors become execution errors
    /// inside the calling tool.
    async fn call(&self, method: &str, args: Value) -> Result<Value, String>;
}
