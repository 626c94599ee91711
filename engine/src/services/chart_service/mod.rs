// engine/src/services/chart_service/mod.rs
// Hub of the chart service: owns the data root and the mapping snapshot and
// dispatches to the handler modules.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use shared::models::{CandleSet, ChartPayload, FeatureSeries, FeaturesOverview, HealthReport, TimeFrame};

use crate::config::mapping::FeatureMapping;
use crate::config::settings::EngineSettings;
use crate::error::{EngineError, Outcome};

pub mod assemble_chart;
pub mod catalog;
pub mod get_candles;
pub mod helpers;
pub mod resolve_feature;

pub use assemble_chart::{ChartData, ChartRequest};

#[derive(Debug, Clone)]
pub struct ChartService {
    data_dir: Arc<PathBuf>,
    mapping: Arc<FeatureMapping>,
}

impl ChartService {
    pub fn new(data_dir: impl Into<PathBuf>, mapping: FeatureMapping) -> Self {
        ChartService { data_dir: Arc::new(data_dir.into()), mapping: Arc::new(mapping) }
    }

    pub fn from_settings(settings: &EngineSettings) -> Result<Self, EngineError> {
        let mapping = FeatureMapping::load_or_builtin(settings.mapping_path.as_deref())?;
        tracing::info!(
            data_dir = %settings.data_dir.display(),
            features = mapping.len(),
            builtin_mapping = mapping.is_builtin(),
            "Chart service ready"
        );
        Ok(Self::new(settings.data_dir.clone(), mapping))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn mapping(&self) -> &FeatureMapping {
        &self.mapping
    }

    pub fn candles(&self, symbol: &str, timeframe: TimeFrame) -> Outcome<CandleSet> {
        get_candles::handle_get_candles(&self.data_dir, symbol, timeframe).into()
    }

    pub fn feature_series(&self, symbol: &str, feature: &str, timeframe: TimeFrame) -> Outcome<FeatureSeries> {
        resolve_feature::handle_resolve_feature(&self.data_dir, symbol, feature, timeframe, &self.mapping).into()
    }

    /// Sequential variant of [`chart`](Self::chart) for callers without a runtime.
    pub fn assemble(&self, request: ChartRequest) -> Result<ChartData, EngineError> {
        assemble_chart::handle_assemble_chart(&self.data_dir, request, &self.mapping)
    }

    /// Resolves candles and both panes concurrently on the blocking pool.
    pub async fn chart(&self, request: ChartRequest) -> Result<ChartData, EngineError> {
        assemble_chart::validate(&request)?;
        tracing::info!(
            symbol = %request.symbol,
            timeframe = %request.timeframe,
            pane1 = %request.pane1,
            pane2 = %request.pane2,
            "Received chart request"
        );

        let candles_task = {
            let service = self.clone();
            let symbol = request.symbol.clone();
            let timeframe = request.timeframe;
            tokio::task::spawn_blocking(move || service.candles(&symbol, timeframe))
        };
        let pane1_task = self.spawn_feature(&request.symbol, &request.pane1, request.timeframe);
        let pane2_task = self.spawn_feature(&request.symbol, &request.pane2, request.timeframe);

        let (candles, pane1, pane2) = tokio::join!(candles_task, pane1_task, pane2_task);
        Ok(assemble_chart::combine(request, joined(candles), joined(pane1), joined(pane2)))
    }

    pub async fn chart_payload(&self, request: ChartRequest) -> Result<ChartPayload, EngineError> {
        let chart = self.chart(request).await?;
        Ok(helpers::to_chart_payload(&chart))
    }

    pub fn symbols(&self) -> Vec<String> {
        catalog::list_symbols(&self.data_dir)
    }

    pub fn features(&self) -> FeaturesOverview {
        catalog::features_overview(&self.mapping)
    }

    pub fn health(&self) -> HealthReport {
        catalog::health(&self.data_dir, &self.mapping)
    }

    fn spawn_feature(
        &self,
        symbol: &str,
        feature: &str,
        timeframe: TimeFrame,
    ) -> tokio::task::JoinHandle<Outcome<FeatureSeries>> {
        let service = self.clone();
        let symbol = symbol.to_string();
        let feature = feature.to_string();
        tokio::task::spawn_blocking(move || service.feature_series(&symbol, &feature, timeframe))
    }
}

fn joined<T>(result: Result<Outcome<T>, tokio::task::JoinError>) -> Outcome<T> {
    result
        .map_err(|e| EngineError::TaskError(e.to_string()))
        .into()
}
