// Handler combining candles and two feature panes into one chart.
use std::path::Path;

use shared::models::{BarColor, CandleSet, FeatureSeries, TimeFrame};

use super::get_candles::handle_get_candles;
use super::resolve_feature::handle_resolve_feature;
use crate::config::mapping::FeatureMapping;
use crate::error::{EngineError, Outcome};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartRequest {
    pub symbol: String,
    pub timeframe: TimeFrame,
    pub pane1: String,
    pub pane2: String,
}

/// Every part of a chart is resolved independently; one missing part never hides the others.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub request: ChartRequest,
    pub candles: Outcome<CandleSet>,
    pub pane1: Outcome<FeatureSeries>,
    pub pane2: Outcome<FeatureSeries>,
    /// One entry per `pane2` value; empty unless both candles and `pane2` have data.
    pub bar_colors: Vec<BarColor>,
}

pub fn validate(request: &ChartRequest) -> Result<(), EngineError> {
    if request.symbol.trim().is_empty() {
        return Err(EngineError::InvalidRequest("No symbol specified".to_string()));
    }
    Ok(())
}

/// Colours pane values by the direction of the candle at the same index.
/// Values past the last candle are bullish.
pub fn bar_colors(candles: Option<&CandleSet>, series: Option<&FeatureSeries>) -> Vec<BarColor> {
    let (Some(set), Some(series)) = (candles, series) else {
        return Vec::new();
    };
    (0..series.len())
        .map(|idx| match set.candles.get(idx) {
            Some(candle) if !candle.is_bullish() => BarColor::Bearish,
            _ => BarColor::Bullish,
        })
        .collect()
}

pub fn combine(
    request: ChartRequest,
    candles: Outcome<CandleSet>,
    pane1: Outcome<FeatureSeries>,
    pane2: Outcome<FeatureSeries>,
) -> ChartData {
    for (pane, feature, outcome) in [("pane1", &request.pane1, &pane1), ("pane2", &request.pane2, &pane2)] {
        match outcome.diagnostic() {
            None => tracing::info!(pane, feature = %feature, "Loaded feature"),
            Some(reason) => tracing::warn!(pane, feature = %feature, reason = %reason, "Failed to load feature"),
        }
    }
    let bar_colors = bar_colors(candles.data(), pane2.data());
    ChartData { request, candles, pane1, pane2, bar_colors }
}

/// Resolves all parts of the chart one after another on the calling thread.
pub fn handle_assemble_chart(
    data_dir: &Path,
    request: ChartRequest,
    mapping: &FeatureMapping,
) -> Result<ChartData, EngineError> {
    validate(&request)?;
    let candles = handle_get_candles(data_dir, &request.symbol, request.timeframe).into();
    let pane1 = handle_resolve_feature(data_dir, &request.symbol, &request.pane1, request.timeframe, mapping).into();
    let pane2 = handle_resolve_feature(data_dir, &request.symbol, &request.pane2, request.timeframe, mapping).into();
    Ok(combine(request, candles, pane1, pane2))
}
