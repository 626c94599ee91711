use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::utils::percent_change;

/// Interval used to group rows while resampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    /// Fixed-length interval aligned to the Unix epoch.
    Fixed { seconds: i64 },
    /// Calendar week starting Monday 00:00.
    Week,
    /// Calendar month starting on the 1st at 00:00.
    Month,
}

impl Bucket {
    /// Start of the bucket containing `ts`.
    pub fn floor(&self, ts: NaiveDateTime) -> NaiveDateTime {
        match self {
            Bucket::Fixed { seconds } => {
                let whole = ts.with_nanosecond(0).unwrap_or(ts);
                let offset = whole.and_utc().timestamp().rem_euclid(*seconds);
                whole - Duration::seconds(offset)
            }
            Bucket::Week => {
                let date = ts.date();
                let back = i64::from(date.weekday().num_days_from_monday());
                (date - Duration::days(back)).and_time(NaiveTime::MIN)
            }
            Bucket::Month => {
                let date = ts.date();
                NaiveDate::from_ymd_opt(date.year(), date.month(), 1)
                    .unwrap_or(date)
                    .and_time(NaiveTime::MIN)
            }
        }
    }
}

/// Trailing window length, bucket interval and display label of a timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeframeSpec {
    pub window_days: i64,
    pub bucket: Bucket,
    pub label: &'static str,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum TimeFrame {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    #[default]
    Day1,
    Week1,
    Month1,
}

impl TimeFrame {
    pub fn all() -> &'static [TimeFrame] {
        &[
            TimeFrame::Minute1,
            TimeFrame::Minute5,
            TimeFrame::Minute15,
            TimeFrame::Minute30,
            TimeFrame::Hour1,
            TimeFrame::Hour4,
            TimeFrame::Day1,
            TimeFrame::Week1,
            TimeFrame::Month1,
        ]
    }

    /// Short name used by callers, e.g. `"4H"`. Case matters: `1m` is a minute, `1M` a month.
    pub fn name(&self) -> &'static str {
        match self {
            TimeFrame::Minute1 => "1m",
            TimeFrame::Minute5 => "5m",
            TimeFrame::Minute15 => "15m",
            TimeFrame::Minute30 => "30m",
            TimeFrame::Hour1 => "1H",
            TimeFrame::Hour4 => "4H",
            TimeFrame::Day1 => "1D",
            TimeFrame::Week1 => "1W",
            TimeFrame::Month1 => "1M",
        }
    }

    pub fn from_name(name: &str) -> Option<TimeFrame> {
        let name = name.trim();
        TimeFrame::all().iter().copied().find(|tf| tf.name() == name)
    }

    /// Unrecognized names resolve to `1D`.
    pub fn from_name_or_default(name: &str) -> TimeFrame {
        TimeFrame::from_name(name).unwrap_or_default()
    }

    pub fn spec(&self) -> TimeframeSpec {
        const MINUTE: i64 = 60;
        const HOUR: i64 = 60 * MINUTE;
        let (window_days, bucket, label) = match self {
            TimeFrame::Minute1 => (1, Bucket::Fixed { seconds: MINUTE }, "1 Minute"),
            TimeFrame::Minute5 => (5, Bucket::Fixed { seconds: 5 * MINUTE }, "5 Minutes"),
            TimeFrame::Minute15 => (15, Bucket::Fixed { seconds: 15 * MINUTE }, "15 Minutes"),
            TimeFrame::Minute30 => (30, Bucket::Fixed { seconds: 30 * MINUTE }, "30 Minutes"),
            TimeFrame::Hour1 => (30, Bucket::Fixed { seconds: HOUR }, "1 Hour"),
            TimeFrame::Hour4 => (120, Bucket::Fixed { seconds: 4 * HOUR }, "4 Hours"),
            TimeFrame::Day1 => (365, Bucket::Fixed { seconds: 24 * HOUR }, "1 Day"),
            TimeFrame::Week1 => (365 * 2, Bucket::Week, "1 Week"),
            TimeFrame::Month1 => (365 * 5, Bucket::Month, "1 Month"),
        };
        TimeframeSpec { window_days, bucket, label }
    }
}

impl std::fmt::Display for TimeFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One OHLC bar. Volume is in thousands of source units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub vwap: Option<f64>,
}

impl Candle {
    pub fn is_bullish(&self) -> bool {
        self.close >= self.open
    }
}

/// Summary of the most recent candle of a set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatestSummary {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: Option<f64>,
    pub vwap: Option<f64>,
    pub change: f64,
    pub change_pct: f64,
}

impl LatestSummary {
    pub fn from_candle(candle: &Candle) -> Self {
        LatestSummary {
            open: candle.open,
            high: candle.high,
            low: candle.low,
            close: candle.close,
            volume: candle.volume,
            vwap: candle.vwap,
            change: candle.close - candle.open,
            change_pct: percent_change(candle.open, candle.close),
        }
    }
}

/// Non-empty, time-ordered candles plus a summary of the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct CandleSet {
    pub candles: Vec<Candle>,
    pub latest: LatestSummary,
}

impl CandleSet {
    /// Returns `None` when there is nothing to summarize.
    pub fn from_candles(candles: Vec<Candle>) -> Option<Self> {
        let latest = LatestSummary::from_candle(candles.last()?);
        Some(CandleSet { candles, latest })
    }
}

/// Time-ordered `(bucket, value)` pairs for a single feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureSeries {
    pub points: Vec<(NaiveDateTime, f64)>,
}

impl FeatureSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.points.iter().map(|(ts, _)| *ts)
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|(_, v)| *v)
    }
}

/// Volume bar colouring derived from candle direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarColor {
    Bullish,
    Bearish,
}

impl BarColor {
    pub fn hex(&self) -> &'static str {
        match self {
            BarColor::Bullish => "#10b981",
            BarColor::Bearish => "#ef4444",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPayload {
    pub index: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandlePayload {
    pub index: Vec<String>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Option<Vec<Option<f64>>>,
    pub vwap: Option<Vec<Option<f64>>>,
    pub latest: LatestSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPayload {
    pub symbol: String,
    pub timeframe: String,
    pub timeframe_label: String,
    pub ohlc_data: Option<CandlePayload>,
    pub pane1_data: Option<SeriesPayload>,
    pub pane2_data: Option<SeriesPayload>,
    pub bar_colors: Vec<BarColor>,
    /// `bar_colors` as display colours.
    pub volume_colors: Vec<String>,
    pub symbol_info: Option<LatestSummary>,
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturesOverview {
    pub pane1_features: Vec<String>,
    pub pane2_features: Vec<String>,
    pub feature_labels: BTreeMap<String, String>,
    pub feature_file_mapping: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub data_dir_exists: bool,
    pub mapping_loaded: bool,
    pub feature_mappings: usize,
    pub symbols_count: usize,
    pub symbols: Vec<String>,
    pub version: String,
}
