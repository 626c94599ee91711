// Engine library root
// Locates feature columns in on-disk market data and aggregates them into
// candles and resampled series.

pub mod config;
pub mod data;
pub mod error;
pub mod services;
