//! # level-scout
//!
//! Multi-timeframe technical-analysis engine: turns raw per-timeframe OHLCV
//! candle series into scored support/resistance levels, trendlines,
//! confluence zones and geometric chart patterns, plus a feature-extraction
//! layer for downstream confidence scoring.
//!
//! The crate is a library-style computation boundary. It consumes candles
//! through the [`data::CandleProvider`] trait and hands back plain data
//! records; rendering, transport and persistence live elsewhere.
//!
//! ```no_run
//! use std::sync::Arc;
//! use level_scout::{AnalysisConfig, MultiTimeframeAnalyzer, Timeframe};
//! # use level_scout::data::CandleProvider;
//! # async fn run(provider: Arc<impl CandleProvider + 'static>) -> anyhow::Result<()> {
//! let analyzer = MultiTimeframeAnalyzer::new(provider, AnalysisConfig::default())?;
//! let report = analyzer
//!     .analyze("BTCUSDT", &[Timeframe::H1, Timeframe::H4, Timeframe::D1])
//!     .await?;
//! println!("{} lines, {} zones", report.lines.len(), report.zones.len());
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod config;
pub mod data;
pub mod domain;
pub mod models;
pub mod patterns;
pub mod utils;

pub use analysis::MultiTimeframeAnalyzer;
pub use config::AnalysisConfig;
pub use data::{CandleCache, CandleProvider, TimeframeAggregator};
pub use domain::{Candle, Timeframe, TimeframeDataset};
pub use models::{
    AnalysisReport, AnalysisSummary, ConfluenceZone, DetectedLine, FeatureVector, LineKind,
    PatternCandidate, PatternKind, TouchKind, TouchPoint, ValidationResult, ZoneKind,
};

pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors the engine itself can raise. Weak or missing market data is never
/// an error here; it surfaces as fewer or weaker results instead.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("invalid config: {field} = {value} outside [{min}, {max}]")]
    InvalidConfig {
        field: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("no timeframes requested")]
    EmptyTimeframeSet,
}
