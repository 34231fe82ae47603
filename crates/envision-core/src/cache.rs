//! Compiled-prompt → raw-response cache.
//!
//! Entries never expire. The cache is only touched from the session's logical thread; a
//! host that shares one across threads must wrap it in a mutex.

use crate::Result;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub trait PromptCache {
    fn get(&self, compiled_prompt: &str) -> Option<String>;
    fn put(&mut self, compiled_prompt: String, response: String);
}

/// In-memory cache that can be persisted as a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryPromptCache {
    entries: IndexMap<String, String>,
}

impl MemoryPromptCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> std::io::Result<()> {
        let text = self
            .to_json_string()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, text)
    }
}

impl PromptCache for MemoryPromptCache {
    fn get(&self, compiled_prompt: &str) -> Option<String> {
        self.entries.get(compiled_prompt).cloned()
    }

    fn put(&mut self, compiled_prompt: String, response: String) {
        self.entries.insert(compiled_prompt, response);
    }
}

impl FromIterator<(String, String)> for MemoryPromptCache {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
