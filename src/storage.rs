//! Durable key-value storage for chat history
//!
//! This module provides:
//! - The `KeyValueStore` capability the session store writes through
//! - A file-backed store, one JSON file per key, isolated per scope
//! - An in-memory store for tests and for platforms without a data directory

use crate::error::{ChatError, ChatResult};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Synchronous get/set by name. Values are opaque strings.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> ChatResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> ChatResult<()>;
}

// ============================================
// File Backend
// ============================================

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Keys live under `root/<scope>/`; different scopes never see each other's keys.
    pub fn new(root: impl AsRef<Path>, scope: &str) -> Self {
        Self {
            dir: root.as_ref().join(sanitize_component(scope)),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", sanitize_key(key)))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(ChatError::Storage(format!("Failed to read {key}: {err}"))),
        }
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ChatError::Storage(format!("Failed to create storage directory: {e}")))?;
        // The record is replaced whole or not at all.
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value)
            .map_err(|e| ChatError::Storage(format!("Failed to write to storage: {e}")))?;
        fs::rename(&staging, &path)
            .map_err(|e| ChatError::Storage(format!("Failed to write to storage: {e}")))
    }
}

// ============================================
// Memory Backend
// ============================================

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> ChatResult<Option<String>> {
        let entries = self.entries.lock().map_err(ChatError::storage)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> ChatResult<()> {
        let mut entries = self.entries.lock().map_err(ChatError::storage)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Sanitize a scope name for filesystem use
fn sanitize_component(raw: &str) -> String {
    raw.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize storage key for filesystem use
fn sanitize_key(key: &str) -> String {
    sanitize_component(key).chars().take(64).collect()
}
