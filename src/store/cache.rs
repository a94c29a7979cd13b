//! Opaque key-value cache for conversation history
//!
//! The cache is a collaborator, not a designed store: string values under
//! string keys, one JSON file per key on disk. Failures are logged and
//! swallowed by the history helpers; a broken cache must never break the
//! client.

use std::fs;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::{ConversationKey, Message};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed")]
    Io(#[from] std::io::Error),
    #[error("cache entry is not valid JSON")]
    Serde(#[from] serde_json::Error),
}

/// Minimal key-value surface the history helpers need.
pub trait KvCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;
    fn put(&mut self, key: &str, value: &str) -> Result<(), CacheError>;
}

/// Disk-backed cache: one file per key under the platform cache directory.
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    /// Keys become file names; anything outside `[A-Za-z0-9._-]` is mapped
    /// to `_` so a key can never escape the cache directory.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl KvCache for DiskCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(&path)?))
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// In-memory cache for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryCache {
    entries: std::collections::HashMap<String, String>,
}

#[cfg(test)]
impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl KvCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, value: &str) -> Result<(), CacheError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Load the cached history for a conversation. Misses and unreadable
/// entries both come back empty.
pub fn load_history(cache: &impl KvCache, key: &ConversationKey) -> Vec<Message> {
    let raw = match cache.get(&key.cache_key()) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::warn!("Cache read for {} failed: {}", key.cache_key(), e);
            return Vec::new();
        }
    };
    match serde_json::from_str(&raw) {
        Ok(messages) => messages,
        Err(e) => {
            tracing::warn!("Cache entry {} is corrupt: {}", key.cache_key(), e);
            Vec::new()
        }
    }
}

/// Write a conversation's history back to the cache.
pub fn store_history(cache: &mut impl KvCache, key: &ConversationKey, messages: &[Message]) {
    let raw = match serde_json::to_string(messages) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!("Serializing history for {} failed: {}", key.cache_key(), e);
            return;
        }
    };
    if let Err(e) = cache.put(&key.cache_key(), &raw) {
        tracing::warn!("Cache write for {} failed: {}", key.cache_key(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MessageId;
    use chrono::Utc;

    fn msg(id: u64) -> Message {
        Message {
            id: MessageId::Server(id),
            sender_id: 2,
            recipient_id: 1,
            content: format!("msg {}", id),
            sent_at: Utc::now(),
            read: false,
        }
    }

    #[test]
    fn test_history_roundtrip_in_memory() {
        let mut cache = MemoryCache::new();
        let key = ConversationKey::new(1, 2);

        assert!(load_history(&cache, &key).is_empty());

        store_history(&mut cache, &key, &[msg(1), msg(2)]);
        let loaded = load_history(&cache, &key);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].id, MessageId::Server(1));
    }

    #[test]
    fn test_corrupt_entry_loads_empty() {
        let mut cache = MemoryCache::new();
        let key = ConversationKey::new(1, 2);
        cache.put(&key.cache_key(), "not json").unwrap();

        assert!(load_history(&cache, &key).is_empty());
    }

    #[test]
    fn test_disk_key_sanitization() {
        let cache = DiskCache::new(PathBuf::from("/tmp/cc-test"));
        let path = cache.path_for("messages.1.2/../evil");
        assert_eq!(
            path.file_name().unwrap().to_str().unwrap(),
            "messages.1.2_.._evil.json"
        );
        assert_eq!(path.parent().unwrap(), PathBuf::from("/tmp/cc-test"));
    }
}
