use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;

/// How a candle touched a level. A single touch may satisfy more than one
/// classification (an exact touch is usually also a wick touch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TouchKind {
    Wick,
    Body,
    Exact,
}

/// One candle's interaction with a detected level. Created during detection,
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TouchPoint {
    pub time: i64,
    pub price: f64,
    pub kinds: Vec<TouchKind>,
    pub volume: f64,
    /// How decisively price moved away after the touch, in [0, 1].
    /// Zero when no bounce was observed inside the lookback window.
    pub bounce_strength: f64,
}

impl TouchPoint {
    pub fn has_kind(&self, kind: TouchKind) -> bool {
        self.kinds.contains(&kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum LineKind {
    Support,
    Resistance,
    Trendline,
}

/// A detected horizontal level or trendline, owned by the detection pass that
/// produced it. A new analysis run produces new instances.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLine {
    pub id: String,
    pub kind: LineKind,
    /// Canonical price. For trendlines this is the fitted value at the last
    /// candle of the detection window.
    pub price: f64,
    pub slope: Option<f64>,
    pub intercept: Option<f64>,
    pub r_squared: Option<f64>,
    pub touches: Vec<TouchPoint>,
    pub strength: f64,
    pub confidence: f64,
    pub supporting_timeframes: BTreeSet<Timeframe>,
}

impl DetectedLine {
    pub fn touch_count(&self) -> usize {
        self.touches.len()
    }

    pub fn is_trendline(&self) -> bool {
        self.slope.is_some()
    }

    /// Fitted price at candle index `x` (trendlines); horizontal levels
    /// return their canonical price for any x.
    pub fn value_at(&self, x: f64) -> f64 {
        match (self.slope, self.intercept) {
            (Some(slope), Some(intercept)) => intercept + slope * x,
            _ => self.price,
        }
    }

    /// Fraction of touches carrying the given classification.
    pub fn touch_kind_ratio(&self, kind: TouchKind) -> f64 {
        if self.touches.is_empty() {
            return 0.0;
        }
        let n = self.touches.iter().filter(|t| t.has_kind(kind)).count();
        n as f64 / self.touches.len() as f64
    }

    /// Same line with its supporting-timeframe set replaced. Lines are
    /// immutable, so cross-timeframe agreement produces new instances.
    pub fn with_supporting_timeframes(mut self, timeframes: BTreeSet<Timeframe>) -> Self {
        self.supporting_timeframes = timeframes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(kinds: Vec<TouchKind>) -> TouchPoint {
        TouchPoint {
            time: 0,
            price: 100.0,
            kinds,
            volume: 1.0,
            bounce_strength: 0.0,
        }
    }

    fn line(touches: Vec<TouchPoint>) -> DetectedLine {
        DetectedLine {
            id: "t".into(),
            kind: LineKind::Support,
            price: 100.0,
            slope: None,
            intercept: None,
            r_squared: None,
            touches,
            strength: 0.5,
            confidence: 0.5,
            supporting_timeframes: BTreeSet::new(),
        }
    }

    #[test]
    fn touch_kind_ratio_counts_multi_membership() {
        let l = line(vec![
            touch(vec![TouchKind::Wick, TouchKind::Exact]),
            touch(vec![TouchKind::Body]),
        ]);
        assert_eq!(l.touch_kind_ratio(TouchKind::Wick), 0.5);
        assert_eq!(l.touch_kind_ratio(TouchKind::Exact), 0.5);
        assert_eq!(l.touch_kind_ratio(TouchKind::Body), 0.5);
    }

    #[test]
    fn value_at_is_flat_for_horizontal_lines() {
        let l = line(vec![]);
        assert_eq!(l.value_at(0.0), 100.0);
        assert_eq!(l.value_at(500.0), 100.0);
    }

    #[test]
    fn value_at_follows_fit_for_trendlines() {
        let mut l = line(vec![]);
        l.slope = Some(2.0);
        l.intercept = Some(10.0);
        assert_eq!(l.value_at(5.0), 20.0);
        assert!(l.is_trendline());
    }
}
