// Engine command-line entry point
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine::config::settings::EngineSettings;
use engine::services::chart_service::{ChartRequest, ChartService};
use serde::Serialize;
use shared::models::TimeFrame;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Feature resolution and time-series aggregation engine", long_about = None)]
struct Cli {
    /// Settings file (JSON); defaults are used when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List symbols with local data
    Symbols,
    /// Show the configured features per pane
    Features,
    /// Report engine status
    Health,
    /// Build a chart for one symbol
    Chart {
        #[arg(short, long)]
        symbol: String,

        /// Timeframe name (1m, 5m, 15m, 30m, 1H, 4H, 1D, 1W, 1M)
        #[arg(short, long)]
        timeframe: Option<String>,

        /// Feature shown in the first pane
        #[arg(long)]
        pane1: Option<String>,

        /// Feature shown in the second pane
        #[arg(long)]
        pane2: Option<String>,
    },
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = EngineSettings::load_or_default(cli.config.as_deref()).context("Failed to load engine settings")?;

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    info!("Starting engine with data directory {}", settings.data_dir.display());
    let service = ChartService::from_settings(&settings).context("Failed to initialise chart service")?;

    match cli.command {
        Commands::Symbols => print_json(&service.symbols()),
        Commands::Features => print_json(&service.features()),
        Commands::Health => print_json(&service.health()),
        Commands::Chart { symbol, timeframe, pane1, pane2 } => {
            let timeframe = timeframe
                .as_deref()
                .map(TimeFrame::from_name_or_default)
                .unwrap_or_else(|| settings.timeframe());
            let request = ChartRequest {
                symbol,
                timeframe,
                pane1: pane1.unwrap_or_else(|| settings.default_pane1_feature.clone()),
                pane2: pane2.unwrap_or_else(|| settings.default_pane2_feature.clone()),
            };
            let payload = service.chart_payload(request).await.context("Chart request failed")?;
            print_json(&payload)
        }
    }
}
