// Data models shared between the chart engine and its presentation layers.
pub mod models;
pub mod utils;
