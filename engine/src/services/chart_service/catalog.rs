// Symbol listing, feature overview and health reporting.
use std::fs;
use std::path::Path;

use chrono::Utc;
use shared::models::{FeaturesOverview, HealthReport};

use crate::config::mapping::FeatureMapping;
use crate::data::source::TabularSource;

const HEALTH_SAMPLE: usize = 5;

fn has_tabular_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .flatten()
                .any(|entry| entry.path().is_file() && TabularSource::from_path(entry.path()).is_some())
        })
        .unwrap_or(false)
}

/// Sorted names of symbol directories holding at least one CSV or ZIP file.
pub fn list_symbols(data_dir: &Path) -> Vec<String> {
    let entries = match fs::read_dir(data_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(data_dir = %data_dir.display(), error = %e, "Data directory not readable");
            return Vec::new();
        }
    };
    let mut symbols: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.path().is_dir() && has_tabular_files(&entry.path()))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    symbols.sort();
    tracing::debug!(count = symbols.len(), "Listed local symbols");
    symbols
}

pub fn features_overview(mapping: &FeatureMapping) -> FeaturesOverview {
    FeaturesOverview {
        pane1_features: mapping.features_in_pane(1),
        pane2_features: mapping.features_in_pane(2),
        feature_labels: mapping.iter().map(|(name, _)| (name.clone(), mapping.label(name))).collect(),
        feature_file_mapping: mapping
            .iter()
            .filter_map(|(name, _)| mapping.file_pattern(name).map(|p| (name.clone(), p.to_string())))
            .collect(),
    }
}

pub fn health(data_dir: &Path, mapping: &FeatureMapping) -> HealthReport {
    let symbols = list_symbols(data_dir);
    HealthReport {
        status: "healthy".to_string(),
        timestamp: Utc::now(),
        data_dir_exists: data_dir.is_dir(),
        mapping_loaded: !mapping.is_builtin(),
        feature_mappings: mapping.iter().filter(|(name, _)| mapping.file_pattern(name).is_some()).count(),
        symbols_count: symbols.len(),
        symbols: symbols.into_iter().take(HEALTH_SAMPLE).collect(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }
}
