//! The analysis passes: per-timeframe level and trendline detection,
//! cross-timeframe confluence, feature extraction, and the orchestrator
//! that ties them to the data layer.

pub mod analyzer;
pub mod confluence;
pub mod features;
pub mod level_detection;

pub use analyzer::MultiTimeframeAnalyzer;
pub use confluence::{build_confluence_zones, validate_price};
pub use features::{classify_regime, extract_features, round_price_proximity};
pub use level_detection::detect_levels;
