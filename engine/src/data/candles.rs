// OHLCV candle aggregation with a running VWAP.
use std::ops::Range;

use shared::models::{Candle, CandleSet, TimeFrame};

use super::csv_parser::TimeSeriesTable;
use super::resample::{bucket_rows, trailing_window};
use crate::error::{EngineError, Outcome};

pub const OHLC_COLUMNS: [&str; 4] = ["Open", "High", "Low", "Close"];
pub const PRICE_COLUMN: &str = "CurrentPrice";
pub const VOLUME_COLUMN: &str = "AllExchangesVolume";

/// Bucket volume sums are divided by this before being reported, so candle
/// volume is expressed in thousands of source units.
pub const VOLUME_DIVISOR: f64 = 1000.0;

/// True when the headers carry either full OHLC columns or a tick price column.
pub fn has_price_columns(headers: &[String]) -> bool {
    let has = |name: &str| headers.iter().any(|h| h == name);
    OHLC_COLUMNS.iter().all(|name| has(name)) || has(PRICE_COLUMN)
}

fn first_valid(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().next().copied()
}

fn last_valid(values: &[Option<f64>]) -> Option<f64> {
    values.iter().rev().flatten().next().copied()
}

fn max_valid(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

fn min_valid(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::min)
}

/// Where bar prices come from. True OHLC columns win over a tick price column.
enum PriceColumns<'a> {
    Ohlc {
        open: &'a [Option<f64>],
        high: &'a [Option<f64>],
        low: &'a [Option<f64>],
        close: &'a [Option<f64>],
    },
    Ticks(&'a [Option<f64>]),
}

impl<'a> PriceColumns<'a> {
    fn from_table(table: &'a TimeSeriesTable) -> Option<Self> {
        let ohlc = (table.column("Open"), table.column("High"), table.column("Low"), table.column("Close"));
        match ohlc {
            (Some(open), Some(high), Some(low), Some(close)) => Some(PriceColumns::Ohlc { open, high, low, close }),
            _ => table.column(PRICE_COLUMN).map(PriceColumns::Ticks),
        }
    }

    /// Open, high, low and close over `rows`; `None` if any of them is undefined.
    fn bar(&self, rows: Range<usize>) -> Option<(f64, f64, f64, f64)> {
        match self {
            PriceColumns::Ohlc { open, high, low, close } => Some((
                first_valid(&open[rows.clone()])?,
                max_valid(&high[rows.clone()])?,
                min_valid(&low[rows.clone()])?,
                last_valid(&close[rows])?,
            )),
            PriceColumns::Ticks(price) => {
                let ticks = &price[rows];
                Some((first_valid(ticks)?, max_valid(ticks)?, min_valid(ticks)?, last_valid(ticks)?))
            }
        }
    }
}

/// Cumulative VWAP for every row from `first_row` on, or `None` without a volume column.
///
/// The typical price of a row is `(high + low + close) / 3` when all three are
/// present, otherwise the tick price. The ratio is undefined while the
/// cumulative volume is zero and on rows lacking a price or a volume.
fn running_vwap(table: &TimeSeriesTable, first_row: usize) -> Option<Vec<Option<f64>>> {
    let volume = table.column(VOLUME_COLUMN)?;
    let high = table.column("High");
    let low = table.column("Low");
    let close = table.column("Close");
    let tick = table.column(PRICE_COLUMN);

    let typical_price = |row: usize| -> Option<f64> {
        let hlc = (high.and_then(|c| c[row]), low.and_then(|c| c[row]), close.and_then(|c| c[row]));
        match hlc {
            (Some(h), Some(l), Some(c)) => Some((h + l + c) / 3.0),
            _ => tick.and_then(|c| c[row]),
        }
    };

    let mut cum_pv = 0.0;
    let mut cum_volume = 0.0;
    let running = (first_row..table.len())
        .map(|row| {
            let vol = volume[row]?;
            cum_volume += vol;
            let price = typical_price(row)?;
            cum_pv += price * vol;
            (cum_volume != 0.0).then(|| cum_pv / cum_volume)
        })
        .collect();
    Some(running)
}

/// Builds candles for `timeframe` over the table's trailing window.
///
/// Returns `Outcome::Empty` when no bucket ends up with all four prices: the
/// price source exists but the window holds nothing usable. A missing price
/// source is reported by the caller as `NotFound(NoPriceColumns)`.
pub fn aggregate(table: &TimeSeriesTable, timeframe: TimeFrame) -> Result<Outcome<CandleSet>, EngineError> {
    let prices = PriceColumns::from_table(table).ok_or_else(|| EngineError::ColumnAbsent(PRICE_COLUMN.to_string()))?;
    let spec = timeframe.spec();
    let Some(window) = trailing_window(table, &spec) else {
        return Ok(Outcome::Empty);
    };

    let volume = table.column(VOLUME_COLUMN);
    let vwap = running_vwap(table, window.first_row);
    let mut incomplete = 0usize;

    let candles: Vec<Candle> = bucket_rows(table, &spec, &window)
        .into_iter()
        .filter_map(|(timestamp, rows)| {
            let Some((open, high, low, close)) = prices.bar(rows.clone()) else {
                incomplete += 1;
                return None;
            };
            let volume = volume.map(|col| col[rows.clone()].iter().flatten().sum::<f64>() / VOLUME_DIVISOR);
            let local = rows.start - window.first_row..rows.end - window.first_row;
            let vwap = vwap.as_ref().and_then(|running| last_valid(&running[local]));
            Some(Candle { timestamp, open, high, low, close, volume, vwap })
        })
        .collect();

    if incomplete > 0 {
        tracing::debug!(incomplete, timeframe = %timeframe, "Dropped buckets without full OHLC");
    }
    Ok(CandleSet::from_candles(candles).map_or(Outcome::Empty, Outcome::Data))
}
