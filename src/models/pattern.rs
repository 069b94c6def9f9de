use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum PatternKind {
    DoubleTop,
    DoubleBottom,
    HeadAndShoulders,
    InverseHeadAndShoulders,
    SymmetricalTriangle,
    AscendingTriangle,
    DescendingTriangle,
    AscendingChannel,
    DescendingChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Implication {
    Bullish,
    Bearish,
    Neutral,
}

/// A structurally significant point of a pattern (peak, trough, or fitted
/// line endpoint).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub time: i64,
    pub value: f64,
}

/// One geometric pattern match over a candle window. Indices refer to the
/// candle series the scan ran on. Overlapping candidates across window sizes
/// are intentionally not deduplicated here; the caller ranks by confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternCandidate {
    pub kind: PatternKind,
    pub confidence: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub key_points: Vec<KeyPoint>,
    pub implication: Implication,
}

impl PatternCandidate {
    pub fn window_len(&self) -> usize {
        self.end_index - self.start_index + 1
    }
}
