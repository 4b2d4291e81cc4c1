//! The old → new name mapping persisted next to the output.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::RevisionError;

/// Output-relative original path → fingerprinted path, both `/` separated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Manifest(BTreeMap<String, String>);

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and parse; any failure is [`RevisionError::ManifestRead`].
    pub fn load(path: &Path) -> Result<Self, RevisionError> {
        let read_error = |source: Box<dyn std::error::Error + Send + Sync>| RevisionError::ManifestRead {
            path: path.to_path_buf(),
            source,
        };
        let json = fs::read_to_string(path).map_err(|e| read_error(e.into()))?;
        serde_json::from_str(&json).map_err(|e| read_error(e.into()))
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> String {
        // a string map always serializes
        serde_json::to_string_pretty(&self.0).unwrap_or_default()
    }

    pub fn insert(&mut self, original: String, revved: String) {
        self.0.insert(original, revved);
    }

    pub fn get(&self, original: &str) -> Option<&str> {
        self.0.get(original).map(String::as_str)
    }

    pub fn contains(&self, original: &str) -> bool {
        self.0.contains_key(original)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
