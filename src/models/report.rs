use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;
use crate::models::line::DetectedLine;
use crate::models::pattern::PatternCandidate;
use crate::models::zone::ConfluenceZone;

/// Aggregate counts over one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_lines: usize,
    /// Lines with confidence >= 0.8.
    pub high_confidence_lines: usize,
    /// Lines supported by at least two timeframes.
    pub multi_timeframe_lines: usize,
    pub average_strength: f64,
    pub detection_time_ms: u64,
}

/// Everything one analysis invocation produced. Plain data for whatever sink
/// consumes it; no UI coupling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub symbol: String,
    pub timeframes_analyzed: Vec<Timeframe>,
    pub lines: Vec<DetectedLine>,
    pub zones: Vec<ConfluenceZone>,
    pub patterns: Vec<PatternCandidate>,
    pub summary: AnalysisSummary,
}

/// Answer to "how well does this price hold up across timeframes", for a
/// price that need not have been detected as a level beforehand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub price: f64,
    pub validation_score: f64,
    pub supporting_timeframes: Vec<Timeframe>,
    pub touch_counts: BTreeMap<Timeframe, usize>,
    pub avg_strength: f64,
}
