//! Maker configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};
use crate::format::IndexPolicy;

/// Configuration for a [`Maker`](crate::Maker).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakerConfig {
    /// Index policy code written to the header
    pub index_policy: IndexPolicy,
    /// Fixed creation timestamp; the current time is used when unset
    pub created_at: Option<u32>,
}

impl MakerConfig {
    pub fn new(index_policy: IndexPolicy) -> Self {
        Self {
            index_policy,
            created_at: None,
        }
    }

    /// Pin the header timestamp, for reproducible output.
    pub fn with_created_at(mut self, created_at: u32) -> Self {
        self.created_at = Some(created_at);
        self
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Timestamp to store in the header.
    pub fn timestamp(&self) -> u32 {
        self.created_at.unwrap_or_else(|| {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs() as u32
        })
    }
}
