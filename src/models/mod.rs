pub mod features;
pub mod line;
pub mod pattern;
pub mod report;
pub mod zone;

pub use features::{FEATURE_RANGES, FeatureRange, FeatureVector, MarketRegime};
pub use line::{DetectedLine, LineKind, TouchKind, TouchPoint};
pub use pattern::{Implication, KeyPoint, PatternCandidate, PatternKind};
pub use report::{AnalysisReport, AnalysisSummary, ValidationResult};
pub use zone::{ConfluenceZone, ZoneKind};
