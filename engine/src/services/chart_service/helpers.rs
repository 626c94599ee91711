// Conversions from engine results to wire payloads.
use shared::models::{CandlePayload, CandleSet, ChartPayload, FeatureSeries, SeriesPayload};
use shared::utils::format_timestamp;

use super::assemble_chart::ChartData;

pub fn to_series_payload(series: &FeatureSeries) -> SeriesPayload {
    SeriesPayload {
        index: series.timestamps().map(|ts| format_timestamp(&ts)).collect(),
        values: series.values().collect(),
    }
}

/// `volume` and `vwap` are `None` when no candle carries a value.
pub fn to_candle_payload(set: &CandleSet) -> CandlePayload {
    let candles = &set.candles;
    let volume: Vec<Option<f64>> = candles.iter().map(|c| c.volume).collect();
    let vwap: Vec<Option<f64>> = candles.iter().map(|c| c.vwap).collect();
    CandlePayload {
        index: candles.iter().map(|c| format_timestamp(&c.timestamp)).collect(),
        open: candles.iter().map(|c| c.open).collect(),
        high: candles.iter().map(|c| c.high).collect(),
        low: candles.iter().map(|c| c.low).collect(),
        close: candles.iter().map(|c| c.close).collect(),
        volume: volume.iter().any(Option::is_some).then_some(volume),
        vwap: vwap.iter().any(Option::is_some).then_some(vwap),
        latest: set.latest.clone(),
    }
}

pub fn to_chart_payload(chart: &ChartData) -> ChartPayload {
    let request = &chart.request;
    let diagnostics = [
        ("ohlc".to_string(), chart.candles.diagnostic()),
        (format!("pane1 '{}'", request.pane1), chart.pane1.diagnostic()),
        (format!("pane2 '{}'", request.pane2), chart.pane2.diagnostic()),
    ]
    .into_iter()
    .filter_map(|(part, note)| note.map(|note| format!("{}: {}", part, note)))
    .collect();

    ChartPayload {
        symbol: request.symbol.clone(),
        timeframe: request.timeframe.name().to_string(),
        timeframe_label: request.timeframe.spec().label.to_string(),
        ohlc_data: chart.candles.data().map(to_candle_payload),
        pane1_data: chart.pane1.data().map(to_series_payload),
        pane2_data: chart.pane2.data().map(to_series_payload),
        bar_colors: chart.bar_colors.clone(),
        volume_colors: chart.bar_colors.iter().map(|color| color.hex().to_string()).collect(),
        symbol_info: chart.candles.data().map(|set| set.latest.clone()),
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{NotFoundReason, Outcome};
    use crate::services::chart_service::assemble_chart::ChartRequest;
    use chrono::NaiveDateTime;
    use shared::models::{BarColor, Candle, TimeFrame};

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn candle(day: &str, vwap: Option<f64>) -> Candle {
        Candle { timestamp: ts(day), open: 1.0, high: 2.0, low: 0.5, close: 1.5, volume: Some(0.25), vwap }
    }

    #[test]
    fn test_candle_payload_arrays() {
        let set = CandleSet::from_candles(vec![candle("2024-01-01 00:00:00", None), candle("2024-01-02 00:00:00", Some(1.2))]).unwrap();
        let payload = to_candle_payload(&set);
        assert_eq!(payload.index, vec!["2024-01-01 00:00:00", "2024-01-02 00:00:00"]);
        assert_eq!(payload.volume, Some(vec![Some(0.25), Some(0.25)]));
        assert_eq!(payload.vwap, Some(vec![None, Some(1.2)]));
        assert_eq!(payload.latest.vwap, Some(1.2));
    }

    #[test]
    fn test_candle_payload_without_volume() {
        let mut c = candle("2024-01-01 00:00:00", None);
        c.volume = None;
        let payload = to_candle_payload(&CandleSet::from_candles(vec![c]).unwrap());
        assert_eq!(payload.volume, None);
        assert_eq!(payload.vwap, None);
    }

    #[test]
    fn test_chart_payload_diagnostics() {
        let series = FeatureSeries { points: vec![(ts("2024-01-01 00:00:00"), 3.0)] };
        let chart = ChartData {
            request: ChartRequest {
                symbol: "BTC".to_string(),
                timeframe: TimeFrame::Week1,
                pane1: "CurrentPrice".to_string(),
                pane2: "Funding".to_string(),
            },
            candles: Outcome::Empty,
            pane1: Outcome::Data(series),
            pane2: Outcome::NotFound(NotFoundReason::NoMatchingFile { pattern: "_FR.csv".to_string() }),
            bar_colors: vec![BarColor::Bearish, BarColor::Bullish],
        };
        let payload = to_chart_payload(&chart);
        assert_eq!(payload.timeframe, "1W");
        assert_eq!(payload.timeframe_label, "1 Week");
        assert_eq!(payload.volume_colors, vec!["#ef4444", "#10b981"]);
        assert!(payload.ohlc_data.is_none());
        assert!(payload.symbol_info.is_none());
        assert_eq!(payload.pane1_data.unwrap().values, vec![3.0]);
        assert_eq!(
            payload.diagnostics,
            vec![
                "ohlc: no data in the requested window".to_string(),
                "pane2 'Funding': no file matching '_FR.csv'".to_string(),
            ]
        );
    }
}
