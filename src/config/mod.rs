//! Engine configuration: grouped settings structs with defaults and a
//! fail-fast `validate()` that runs before any analysis.

pub mod analysis;

pub use analysis::{
    AnalysisConfig, ConfluenceSettings, FeatureSettings, FetchSettings, LevelSettings,
    PatternSettings,
};
