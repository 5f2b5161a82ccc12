use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// Need async_trait for async functions in traits
/// A pre-authenticated request/response channel to the Commcell.
/// Implementations own authentication headers and transient-error policy;
/// callers get the JSON-decoded body or an error carrying the server's text.
#[async_trait]
pub trait Session: Send + Sync {
    async fn get(&self, endpoint: &str) -> Result<Value>;
    async fn post(&self, endpoint: &str, body: &Value) -> Result<Value>;
}

/// Resolves client group names to their numeric identifiers.
///
/// `Ok(None)` means the name does not exist on the Commcell, as opposed
/// to `Err`, which means the directory itself could not be consulted.
#[async_trait]
pub trait ClientGroupDirectory: Send + Sync {
    async fn resolve(&self, name: &str) -> Result<Option<i64>>;
}
