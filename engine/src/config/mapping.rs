//! Feature → source file mapping.
//!
//! The mapping is produced outside the engine (it is exported from the
//! strategy spreadsheet) and handed over as a read-only JSON snapshot:
//!
//! ```json
//! { "CurrentPrice": { "pane": 1, "file_pattern": "_TSD.csv" } }
//! ```
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureEntry {
    #[serde(default = "default_pane")]
    pub pane: u32,
    /// Substring or suffix matched against file names; blank means "not mapped".
    #[serde(default)]
    pub file_pattern: String,
    #[serde(default)]
    pub label: Option<String>,
}

fn default_pane() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureMapping {
    entries: BTreeMap<String, FeatureEntry>,
    builtin: bool,
}

impl FeatureMapping {
    pub fn new<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, FeatureEntry)>,
    {
        let entries = entries
            .into_iter()
            .map(|(name, mut entry)| {
                entry.file_pattern = entry.file_pattern.trim().to_string();
                (name.trim().to_string(), entry)
            })
            .filter(|(name, _)| !name.is_empty())
            .collect();
        FeatureMapping { entries, builtin: false }
    }

    /// Mapping used when no snapshot is available.
    pub fn builtin() -> Self {
        let entry = |pane: u32, label: &str| FeatureEntry {
            pane,
            file_pattern: "_TSD.csv".to_string(),
            label: Some(label.to_string()),
        };
        let mut mapping = FeatureMapping::new([
            ("CurrentPrice".to_string(), entry(1, "Current Price")),
            ("AllExchangesVolume".to_string(), entry(2, "Volume")),
        ]);
        mapping.builtin = true;
        mapping
    }

    pub fn from_json_str(raw: &str) -> Result<Self, EngineError> {
        let entries: BTreeMap<String, FeatureEntry> = serde_json::from_str(raw)?;
        Ok(FeatureMapping::new(entries))
    }

    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read feature mapping '{}': {}", path.display(), e))
        })?;
        let mapping = Self::from_json_str(&raw)?;
        for (feature, entry) in &mapping.entries {
            tracing::debug!(feature = %feature, pattern = %entry.file_pattern, pane = entry.pane, "Mapped feature");
        }
        tracing::info!(path = %path.display(), features = mapping.len(), "Loaded feature mapping");
        Ok(mapping)
    }

    /// A missing snapshot falls back to the built-in mapping; an unreadable one is an error.
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                tracing::warn!(path = %path.display(), "Feature mapping not found, using built-in mapping");
                Ok(Self::builtin())
            }
            None => Ok(Self::builtin()),
        }
    }

    pub fn is_builtin(&self) -> bool {
        self.builtin
    }

    pub fn get(&self, feature: &str) -> Option<&FeatureEntry> {
        self.entries.get(feature)
    }

    /// Configured file pattern for `feature`, if it has a usable one.
    pub fn file_pattern(&self, feature: &str) -> Option<&str> {
        self.get(feature)
            .map(|entry| entry.file_pattern.as_str())
            .filter(|pattern| !pattern.is_empty())
    }

    pub fn label(&self, feature: &str) -> String {
        self.get(feature)
            .and_then(|entry| entry.label.clone())
            .unwrap_or_else(|| feature.to_string())
    }

    pub fn features_in_pane(&self, pane: u32) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| entry.pane == pane)
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FeatureEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
