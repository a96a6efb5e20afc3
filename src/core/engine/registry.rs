// ─── Registry Store ───
// Read-only access to a hierarchical key/value store (the Windows registry
// in production). Two calling conventions are exposed: a single result per
// query, and a push stream of key events.

use std::collections::HashMap;

use async_trait::async_trait;
use futures_util::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("registry key not found: {0}")]
    KeyNotFound(String),
    #[error("registry value '{value}' not found under {key}")]
    ValueNotFound { key: String, value: String },
    #[error("registry stream for {0} ended without data")]
    EmptyStream(String),
    #[error("registry query for {key} failed: {message}")]
    Query { key: String, message: String },
    #[error("registry io error: {0}")]
    Io(#[from] std::io::Error),
}

/// A named value under a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryValue {
    /// Value type as reported by the store, e.g. `REG_SZ`.
    pub kind: String,
    pub value: String,
}

impl RegistryValue {
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            kind: "REG_SZ".to_string(),
            value: value.into(),
        }
    }
}

/// One key with its values and the full paths of its direct sub-keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryKey {
    pub path: String,
    pub values: HashMap<String, RegistryValue>,
    pub keys: Vec<String>,
}

/// Result of listing one or more keys, indexed by the requested key path.
pub type RegistryListing = HashMap<String, RegistryKey>;

#[async_trait]
pub trait RegistryStore: Send + Sync {
    /// List `key`, delivering the whole result at once.
    async fn list(&self, key: &str) -> Result<RegistryListing, RegistryError>;

    /// List `key` as a stream of data/error events.
    fn list_stream(&self, key: &str) -> BoxStream<'_, Result<RegistryKey, RegistryError>> {
        let key = key.to_string();
        stream::once(async move {
            let mut listing = self.list(&key).await?;
            listing
                .remove(&key)
                .ok_or(RegistryError::KeyNotFound(key))
        })
        .boxed()
    }
}

/// In-memory store. Key lookups are case-insensitive like the registry.
#[derive(Debug, Clone, Default)]
pub struct MemoryRegistry {
    keys: HashMap<String, RegistryKey>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `name` under `key`, creating the key if needed.
    pub fn set_value(&mut self, key: &str, name: &str, value: RegistryValue) -> &mut Self {
        self.keys
            .entry(normalize(key))
            .or_insert_with(|| RegistryKey {
                path: key.to_string(),
                ..Default::default()
            })
            .values
            .insert(name.to_string(), value);
        self
    }

    pub fn with_value(mut self, key: &str, name: &str, value: impl Into<String>) -> Self {
        self.set_value(key, name, RegistryValue::string(value));
        self
    }
}

#[async_trait]
impl RegistryStore for MemoryRegistry {
    async fn list(&self, key: &str) -> Result<RegistryListing, RegistryError> {
        let found = self
            .keys
            .get(&normalize(key))
            .ok_or_else(|| RegistryError::KeyNotFound(key.to_string()))?;

        let prefix = format!("{}\\", normalize(key));
        let mut entry = found.clone();
        entry.keys = self
            .keys
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix) && !k[prefix.len()..].contains('\\'))
            .map(|(_, v)| v.path.clone())
            .collect();
        entry.keys.sort();

        Ok(HashMap::from([(key.to_string(), entry)]))
    }
}

fn normalize(key: &str) -> String {
    key.trim_end_matches('\\').to_ascii_lowercase()
}
