// Engine settings, loaded from an optional JSON file.
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use shared::models::TimeFrame;

use crate::error::EngineError;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct EngineSettings {
    /// Root directory holding one sub-directory per symbol.
    pub data_dir: PathBuf,
    /// Feature mapping snapshot; the built-in mapping is used when unset or missing.
    pub mapping_path: Option<PathBuf>,
    pub default_timeframe: String,
    pub default_pane1_feature: String,
    pub default_pane2_feature: String,
    pub log_filter: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        EngineSettings {
            data_dir: PathBuf::from("Server"),
            mapping_path: None,
            default_timeframe: "1D".to_string(),
            default_pane1_feature: "CurrentPrice".to_string(),
            default_pane2_feature: "AllExchangesVolume".to_string(),
            log_filter: "info".to_string(),
        }
    }
}

impl EngineSettings {
    /// Reads settings from `path`. Relative paths inside the file are taken
    /// relative to the file's own directory.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let raw = fs::read_to_string(path).map_err(|e| {
            EngineError::ConfigError(format!("Failed to read settings file '{}': {}", path.display(), e))
        })?;
        let settings: EngineSettings = serde_json::from_str(&raw)?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(settings.relative_to(base))
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self, EngineError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeframe(&self) -> TimeFrame {
        TimeFrame::from_name_or_default(&self.default_timeframe)
    }

    fn relative_to(mut self, base: &Path) -> Self {
        if self.data_dir.is_relative() {
            self.data_dir = base.join(&self.data_dir);
        }
        if let Some(mapping) = self.mapping_path.as_mut() {
            if mapping.is_relative() {
                *mapping = base.join(&*mapping);
            }
        }
        self
    }
}
