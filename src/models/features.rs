use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// Coarse market state derived from moving-average divergence and a
/// volatility proxy over the detection series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum MarketRegime {
    Trending,
    Ranging,
    Volatile,
}

/// Fixed min/max used to normalize one feature into [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub name: &'static str,
    pub min: f64,
    pub max: f64,
}

/// The single source of truth for normalization ranges. Order matches
/// `FeatureVector::raw()`. Values outside a range are clamped, so any
/// downstream scoring model sees [0, 1] regardless of raw units.
pub const FEATURE_RANGES: &[FeatureRange] = &[
    FeatureRange { name: "wick_touch_ratio", min: 0.0, max: 1.0 },
    FeatureRange { name: "body_touch_ratio", min: 0.0, max: 1.0 },
    FeatureRange { name: "exact_touch_ratio", min: 0.0, max: 1.0 },
    FeatureRange { name: "touch_count", min: 0.0, max: 20.0 },
    FeatureRange { name: "avg_touch_volume_ratio", min: 0.0, max: 5.0 },
    FeatureRange { name: "max_touch_volume_ratio", min: 0.0, max: 5.0 },
    FeatureRange { name: "avg_bounce_strength", min: 0.0, max: 1.0 },
    FeatureRange { name: "level_age_candles", min: 0.0, max: 500.0 },
    FeatureRange { name: "recent_touch_count", min: 0.0, max: 10.0 },
    FeatureRange { name: "trend_divergence_pct", min: -10.0, max: 10.0 },
    FeatureRange { name: "volatility_pct", min: 0.0, max: 10.0 },
    FeatureRange { name: "hour_of_day", min: 0.0, max: 23.0 },
    FeatureRange { name: "day_of_week", min: 0.0, max: 6.0 },
    FeatureRange { name: "timeframe_confluence", min: 0.0, max: 1.0 },
    FeatureRange { name: "round_price_proximity", min: 0.0, max: 1.0 },
    FeatureRange { name: "distance_from_price_pct", min: 0.0, max: 20.0 },
    FeatureRange { name: "line_strength", min: 0.0, max: 1.0 },
    FeatureRange { name: "line_confidence", min: 0.0, max: 1.0 },
];

/// Fixed-schema snapshot of one DetectedLine in its market context.
/// Recomputed on demand; never cached across dataset refreshes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub wick_touch_ratio: f64,
    pub body_touch_ratio: f64,
    pub exact_touch_ratio: f64,
    pub touch_count: f64,
    pub avg_touch_volume_ratio: f64,
    pub max_touch_volume_ratio: f64,
    pub avg_bounce_strength: f64,
    pub level_age_candles: f64,
    pub recent_touch_count: f64,
    pub trend_divergence_pct: f64,
    pub volatility_pct: f64,
    pub hour_of_day: f64,
    pub day_of_week: f64,
    pub timeframe_confluence: f64,
    pub round_price_proximity: f64,
    pub distance_from_price_pct: f64,
    pub line_strength: f64,
    pub line_confidence: f64,
    pub regime: MarketRegime,
}

impl FeatureVector {
    /// Raw values in `FEATURE_RANGES` order.
    pub fn raw(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("wick_touch_ratio", self.wick_touch_ratio),
            ("body_touch_ratio", self.body_touch_ratio),
            ("exact_touch_ratio", self.exact_touch_ratio),
            ("touch_count", self.touch_count),
            ("avg_touch_volume_ratio", self.avg_touch_volume_ratio),
            ("max_touch_volume_ratio", self.max_touch_volume_ratio),
            ("avg_bounce_strength", self.avg_bounce_strength),
            ("level_age_candles", self.level_age_candles),
            ("recent_touch_count", self.recent_touch_count),
            ("trend_divergence_pct", self.trend_divergence_pct),
            ("volatility_pct", self.volatility_pct),
            ("hour_of_day", self.hour_of_day),
            ("day_of_week", self.day_of_week),
            ("timeframe_confluence", self.timeframe_confluence),
            ("round_price_proximity", self.round_price_proximity),
            ("distance_from_price_pct", self.distance_from_price_pct),
            ("line_strength", self.line_strength),
            ("line_confidence", self.line_confidence),
        ]
    }

    /// Pure normalization into [0, 1] against `FEATURE_RANGES`, clamping
    /// out-of-range values.
    pub fn normalized(&self) -> Vec<(&'static str, f64)> {
        self.raw()
            .into_iter()
            .zip(FEATURE_RANGES.iter())
            .map(|((name, value), range)| {
                debug_assert_eq!(name, range.name);
                (name, normalize_feature(value, range.min, range.max))
            })
            .collect()
    }
}

pub fn normalize_feature(value: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return 0.0;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FeatureVector {
        FeatureVector {
            wick_touch_ratio: 0.5,
            body_touch_ratio: 0.25,
            exact_touch_ratio: 0.1,
            touch_count: 40.0, // above range, must clamp
            avg_touch_volume_ratio: 1.2,
            max_touch_volume_ratio: 2.5,
            avg_bounce_strength: 0.4,
            level_age_candles: 250.0,
            recent_touch_count: 3.0,
            trend_divergence_pct: -20.0, // below range, must clamp
            volatility_pct: 2.0,
            hour_of_day: 14.0,
            day_of_week: 2.0,
            timeframe_confluence: 0.66,
            round_price_proximity: 1.0,
            distance_from_price_pct: 4.0,
            line_strength: 0.7,
            line_confidence: 0.8,
            regime: MarketRegime::Ranging,
        }
    }

    #[test]
    fn schema_and_table_stay_in_sync() {
        let raw = sample().raw();
        assert_eq!(raw.len(), FEATURE_RANGES.len());
        for ((name, _), range) in raw.iter().zip(FEATURE_RANGES.iter()) {
            assert_eq!(*name, range.name);
        }
    }

    #[test]
    fn normalized_values_are_unit_range() {
        for (name, value) in sample().normalized() {
            assert!(
                (0.0..=1.0).contains(&value),
                "{name} out of range: {value}"
            );
        }
    }

    #[test]
    fn out_of_range_values_clamp() {
        let normalized = sample().normalized();
        let touch = normalized.iter().find(|(n, _)| *n == "touch_count").unwrap();
        assert_eq!(touch.1, 1.0);
        let div = normalized
            .iter()
            .find(|(n, _)| *n == "trend_divergence_pct")
            .unwrap();
        assert_eq!(div.1, 0.0);
    }

    #[test]
    fn midpoint_normalizes_to_half() {
        assert_eq!(normalize_feature(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize_feature(0.0, -10.0, 10.0), 0.5);
    }
}
