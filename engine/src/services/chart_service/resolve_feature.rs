// Handler resolving one feature series for a symbol.
//
// A feature with a configured file pattern is only looked up through that
// pattern; a failed mapped lookup is final. Features without a mapping fall
// back to scanning every plain CSV file of the symbol (archives excluded).
use std::path::Path;

use shared::models::{FeatureSeries, TimeFrame};

use crate::config::mapping::FeatureMapping;
use crate::data::resample::resample;
use crate::data::source::{discover_sources, first_match, locate, symbol_dir, LocatedTable};
use crate::error::{EngineError, NotFoundReason, Outcome};

pub fn handle_resolve_feature(
    data_dir: &Path,
    symbol: &str,
    feature: &str,
    timeframe: TimeFrame,
    mapping: &FeatureMapping,
) -> Result<Outcome<FeatureSeries>, EngineError> {
    let located = match mapping.file_pattern(feature) {
        Some(pattern) => {
            tracing::debug!(feature = %feature, pattern = %pattern, "Using configured file mapping");
            locate(data_dir, symbol, feature, pattern)?
        }
        None => {
            tracing::warn!(feature = %feature, "No file mapping for feature, trying fallback search");
            fallback_locate(data_dir, symbol, feature)?
        }
    };

    match located {
        Outcome::Data(found) => resample_located(&found, feature, timeframe),
        Outcome::Empty => Ok(Outcome::Empty),
        Outcome::NotFound(reason) => Ok(Outcome::NotFound(reason)),
        Outcome::Failed(msg) => Ok(Outcome::Failed(msg)),
    }
}

fn fallback_locate(data_dir: &Path, symbol: &str, feature: &str) -> Result<Outcome<LocatedTable>, EngineError> {
    let Some(dir) = symbol_dir(data_dir, symbol) else {
        return Ok(Outcome::NotFound(NotFoundReason::SymbolMissing { symbol: symbol.to_string() }));
    };
    let plain_files: Vec<_> = discover_sources(&dir)?
        .into_iter()
        .filter(|source| !source.is_archive())
        .collect();

    Ok(match first_match(&plain_files, |headers| headers.iter().any(|h| h == feature)) {
        Some(found) => {
            tracing::info!(symbol = %symbol, feature = %feature, origin = %found.origin, "Found unmapped feature");
            Outcome::Data(found)
        }
        None => Outcome::NotFound(NotFoundReason::ColumnMissing { feature: feature.to_string() }),
    })
}

fn resample_located(found: &LocatedTable, feature: &str, timeframe: TimeFrame) -> Result<Outcome<FeatureSeries>, EngineError> {
    let series = resample(&found.table, feature, timeframe)?;
    if series.is_empty() {
        tracing::info!(feature = %feature, origin = %found.origin, timeframe = %timeframe, "No values in window");
        return Ok(Outcome::Empty);
    }
    Ok(Outcome::Data(series))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::mapping::FeatureEntry;
    use crate::data::source::test_support::{write_file, write_zip};
    use std::fs;
    use tempfile::{tempdir, TempDir};

    fn mapping(feature: &str, pattern: &str) -> FeatureMapping {
        FeatureMapping::new([(
            feature.to_string(),
            FeatureEntry { pane: 2, file_pattern: pattern.to_string(), label: None },
        )])
    }

    fn symbol_root(symbol: &str) -> (TempDir, std::path::PathBuf) {
        let root = tempdir().unwrap();
        let dir = root.path().join(symbol);
        fs::create_dir(&dir).unwrap();
        (root, dir)
    }

    #[test]
    fn test_mapped_feature_resolves() {
        let (root, dir) = symbol_root("BTC");
        write_file(&dir, "BTC_FR.csv", "Date,FundingRate\n2024-01-01,0.01\n2024-01-02,0.03\n");
        let outcome =
            handle_resolve_feature(root.path(), "BTC", "FundingRate", TimeFrame::Day1, &mapping("FundingRate", "_fr.csv"))
                .unwrap();
        let series = outcome.into_data().unwrap();
        assert_eq!(series.values().collect::<Vec<_>>(), vec![0.01, 0.03]);
    }

    #[test]
    fn test_failed_mapping_does_not_fall_back() {
        let (root, dir) = symbol_root("BTC");
        // The feature exists, but not in a file matching the configured pattern.
        write_file(&dir, "BTC_misc.csv", "Date,CurrentPrice\n2024-01-01,10\n");
        let outcome =
            handle_resolve_feature(root.path(), "BTC", "CurrentPrice", TimeFrame::Day1, &mapping("CurrentPrice", "_TSD.csv"))
                .unwrap();
        assert_eq!(
            outcome,
            Outcome::NotFound(NotFoundReason::NoMatchingFile { pattern: "_TSD.csv".to_string() })
        );
    }

    #[test]
    fn test_unmapped_feature_uses_fallback_scan() {
        let (root, dir) = symbol_root("ETH");
        // Only the header row of a rejected file is read; its body is never parsed.
        let mut rejected = b"Date,Alpha\n".to_vec();
        rejected.extend_from_slice(b"\xff\xfe\x00,\"unterminated\n2024-01-01,1,2,3,4\n");
        fs::write(dir.join("a.csv"), rejected).unwrap();
        write_file(&dir, "b.csv", "Date,OpenInterest\n2024-01-01,7\n2024-01-01,9\n");
        // A later file with the same column loses to the first match.
        write_file(&dir, "c.csv", "Date,OpenInterest\n2024-01-01,100\n");
        let outcome =
            handle_resolve_feature(root.path(), "ETH", "OpenInterest", TimeFrame::Day1, &FeatureMapping::builtin()).unwrap();
        assert_eq!(outcome.into_data().unwrap().values().collect::<Vec<_>>(), vec![8.0]);
    }

    #[test]
    fn test_fallback_ignores_archives() {
        let (root, dir) = symbol_root("ETH");
        write_zip(&dir, "extra.zip", &[("extra.csv", b"Date,OpenInterest\n2024-01-01,7\n")]);
        let outcome =
            handle_resolve_feature(root.path(), "ETH", "OpenInterest", TimeFrame::Day1, &FeatureMapping::builtin()).unwrap();
        assert_eq!(
            outcome,
            Outcome::NotFound(NotFoundReason::ColumnMissing { feature: "OpenInterest".to_string() })
        );
    }

    #[test]
    fn test_mapped_lookup_reads_archives() {
        let (root, dir) = symbol_root("ETH");
        write_zip(&dir, "ETH_TSD.zip", &[("ETH_TSD.csv", b"Date,CurrentPrice\n2024-01-01,7\n")]);
        let outcome =
            handle_resolve_feature(root.path(), "ETH", "CurrentPrice", TimeFrame::Day1, &mapping("CurrentPrice", "_TSD"))
                .unwrap();
        assert!(outcome.is_data());
    }

    #[test]
    fn test_present_but_empty_column() {
        let (root, dir) = symbol_root("SOL");
        write_file(&dir, "SOL_TSD.csv", "Date,CurrentPrice\n2024-01-01,\n2024-01-02,\n");
        let outcome =
            handle_resolve_feature(root.path(), "SOL", "CurrentPrice", TimeFrame::Day1, &FeatureMapping::builtin()).unwrap();
        assert_eq!(outcome, Outcome::Empty);
    }

    #[test]
    fn test_unknown_symbol() {
        let root = tempdir().unwrap();
        let outcome =
            handle_resolve_feature(root.path(), "DOGE", "Anything", TimeFrame::Day1, &FeatureMapping::builtin()).unwrap();
        assert!(matches!(outcome, Outcome::NotFound(NotFoundReason::SymbolMissing { .. })));
    }
}
