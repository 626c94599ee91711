// Handler building the candle set for a symbol.
use std::path::Path;

use shared::models::{CandleSet, TimeFrame};

use crate::data::candles::{aggregate, has_price_columns};
use crate::data::source::{discover_sources, first_match, symbol_dir};
use crate::error::{EngineError, NotFoundReason, Outcome};

/// Uses the first file or archive entry (in name order) that carries price columns.
pub fn handle_get_candles(data_dir: &Path, symbol: &str, timeframe: TimeFrame) -> Result<Outcome<CandleSet>, EngineError> {
    let Some(dir) = symbol_dir(data_dir, symbol) else {
        tracing::warn!(symbol = %symbol, "Symbol directory not found");
        return Ok(Outcome::NotFound(NotFoundReason::SymbolMissing { symbol: symbol.to_string() }));
    };

    let sources = discover_sources(&dir)?;
    let Some(found) = first_match(&sources, has_price_columns) else {
        tracing::warn!(symbol = %symbol, "No source with price columns");
        return Ok(Outcome::NotFound(NotFoundReason::NoPriceColumns));
    };

    tracing::info!(symbol = %symbol, origin = %found.origin, timeframe = %timeframe, "Aggregating candles");
    aggregate(&found.table, timeframe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::source::test_support::{write_file, write_zip};
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_candles_from_archive_entry() {
        let root = tempdir().unwrap();
        let dir = root.path().join("BTC");
        fs::create_dir(&dir).unwrap();
        write_file(&dir, "a_funding.csv", "Date,FundingRate\n2024-01-01,0.1\n");
        write_zip(
            &dir,
            "b_history.zip",
            &[("BTC_TSD.csv", b"Date,CurrentPrice,AllExchangesVolume\n2024-01-01,10,500\n2024-01-02,11,1500\n")],
        );

        let set = handle_get_candles(root.path(), "BTC", TimeFrame::Day1).unwrap().into_data().unwrap();
        assert_eq!(set.candles.len(), 2);
        assert_eq!(set.candles[1].volume, Some(1.5));
        assert_eq!(set.latest.close, 11.0);
    }

    #[test]
    fn test_no_price_source() {
        let root = tempdir().unwrap();
        let dir = root.path().join("BTC");
        fs::create_dir(&dir).unwrap();
        write_file(&dir, "funding.csv", "Date,FundingRate\n2024-01-01,0.1\n");
        let outcome = handle_get_candles(root.path(), "BTC", TimeFrame::Day1).unwrap();
        assert_eq!(outcome, Outcome::NotFound(NotFoundReason::NoPriceColumns));
    }

    #[test]
    fn test_missing_symbol() {
        let root = tempdir().unwrap();
        let outcome = handle_get_candles(root.path(), "NOPE", TimeFrame::Day1).unwrap();
        assert!(matches!(outcome, Outcome::NotFound(NotFoundReason::SymbolMissing { .. })));
    }
}
