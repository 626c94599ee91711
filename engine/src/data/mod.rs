// Reading, locating and aggregating on-disk market data.
pub mod candles;
pub mod csv_parser;
pub mod resample;
pub mod source;
pub mod timestamp;
