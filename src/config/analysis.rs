use serde::{Deserialize, Serialize};

use crate::{EngineError, Result};

/// Settings for horizontal-level and trendline detection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelSettings {
    /// Cluster tolerance as a percentage of price.
    pub price_tolerance_pct: f64,
    /// Fraction of the tolerance band that counts as an "exact" touch.
    pub exact_tolerance_fraction: f64,
    pub min_touch_count: usize,
    /// Lines below this strength are dropped before being returned.
    pub strength_threshold: f64,
    /// Consecutive touches closer than this many candles merge into one.
    pub touch_merge_gap: usize,
    /// Candles to look ahead for bounce confirmation after a touch.
    pub bounce_lookback: usize,
    /// Move away from the level (pct of price) that counts as a full bounce.
    pub full_bounce_move_pct: f64,
    /// Volume-confirmation ratio cap, so one huge print cannot dominate.
    pub volume_ratio_cap: f64,
    /// Trailing window for the average-volume baseline.
    pub volume_baseline_window: usize,
    /// Sliding window sizes for trendline fitting.
    pub trendline_windows: Vec<usize>,
    /// OLS fits below this R² are rejected as trendline candidates.
    pub min_r_squared: f64,
}

impl Default for LevelSettings {
    fn default() -> Self {
        LevelSettings {
            price_tolerance_pct: 0.5,
            exact_tolerance_fraction: 0.3,
            min_touch_count: 2,
            strength_threshold: 0.6,
            touch_merge_gap: 3,
            bounce_lookback: 5,
            full_bounce_move_pct: 1.0,
            volume_ratio_cap: 2.0,
            volume_baseline_window: 20,
            trendline_windows: vec![20, 40, 60],
            min_r_squared: 0.70,
        }
    }
}

/// Settings for cross-timeframe confluence grouping and price validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceSettings {
    /// Band width for grouping lines, as a percentage of price.
    pub zone_tolerance_pct: f64,
    /// Zones supported by fewer timeframes are discarded.
    pub min_timeframes: usize,
}

impl Default for ConfluenceSettings {
    fn default() -> Self {
        ConfluenceSettings {
            zone_tolerance_pct: 0.75,
            min_timeframes: 2,
        }
    }
}

/// Settings for the geometric pattern engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternSettings {
    /// Sliding window sizes to scan.
    pub windows: Vec<usize>,
    /// Two extremes count as "equal" when within this pct of each other.
    pub peak_tolerance_pct: f64,
    /// Minimum neckline displacement from the average peak (pct), rejecting
    /// noise-level double tops/bottoms.
    pub min_neckline_move_pct: f64,
    /// Minimum R² for the trending side of a triangle.
    pub min_fit: f64,
    /// Minimum R² for both sides of a channel.
    pub strong_fit: f64,
    /// A side is "flat" when std-dev / mean falls below this.
    pub flat_side_tolerance: f64,
    /// Minimum fractional move across the window for a sloped side.
    pub min_slope_move_pct: f64,
    /// Candidates below this confidence are discarded, not reported.
    pub min_confidence: f64,
    /// Hard ceiling reflecting inherent pattern-detection uncertainty.
    pub confidence_ceiling: f64,
    pub max_proposals: usize,
}

impl Default for PatternSettings {
    fn default() -> Self {
        PatternSettings {
            windows: vec![30, 50, 80],
            peak_tolerance_pct: 1.5,
            min_neckline_move_pct: 1.0,
            min_fit: 0.6,
            strong_fit: 0.75,
            flat_side_tolerance: 0.004,
            min_slope_move_pct: 1.0,
            min_confidence: 0.55,
            confidence_ceiling: 0.95,
            max_proposals: 10,
        }
    }
}

/// Settings for feature extraction and regime classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSettings {
    pub short_ma: usize,
    pub long_ma: usize,
    /// |SMA divergence| above this pct reads as trending.
    pub trend_threshold_pct: f64,
    /// Per-candle return std-dev above this pct reads as volatile.
    pub volatile_threshold_pct: f64,
    /// Touches within this many candles of the series end count as recent.
    pub recency_window: usize,
    pub volume_ratio_cap: f64,
}

impl Default for FeatureSettings {
    fn default() -> Self {
        FeatureSettings {
            short_ma: 10,
            long_ma: 50,
            trend_threshold_pct: 1.0,
            volatile_threshold_pct: 3.0,
            recency_window: 20,
            volume_ratio_cap: 5.0,
        }
    }
}

/// Settings for the multi-timeframe aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Candles requested per timeframe.
    pub candle_limit: usize,
    /// A fetch returning fewer candles than this counts as a failure.
    pub min_candles: usize,
    pub cache_ttl_secs: u64,
    /// Per-fetch timeout; a timed-out timeframe is treated as failed.
    pub fetch_timeout_ms: Option<u64>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        FetchSettings {
            candle_limit: 500,
            min_candles: 50,
            cache_ttl_secs: 300,
            fetch_timeout_ms: None,
        }
    }
}

/// The master analysis configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub level: LevelSettings,
    pub confluence: ConfluenceSettings,
    pub pattern: PatternSettings,
    pub feature: FeatureSettings,
    pub fetch: FetchSettings,
    /// Cap on returned lines after ranking by confidence.
    pub max_lines: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            level: LevelSettings::default(),
            confluence: ConfluenceSettings::default(),
            pattern: PatternSettings::default(),
            feature: FeatureSettings::default(),
            fetch: FetchSettings::default(),
            max_lines: 50,
        }
    }
}

impl AnalysisConfig {
    /// Rejects invalid thresholds before any analysis runs. This is a
    /// configuration failure, deliberately distinct from "no results found".
    pub fn validate(&self) -> Result<()> {
        check_pct("level.price_tolerance_pct", self.level.price_tolerance_pct)?;
        check_unit(
            "level.exact_tolerance_fraction",
            self.level.exact_tolerance_fraction,
        )?;
        check_min_count("level.min_touch_count", self.level.min_touch_count, 2)?;
        check_unit("level.strength_threshold", self.level.strength_threshold)?;
        check_pct("level.full_bounce_move_pct", self.level.full_bounce_move_pct)?;
        check_positive("level.volume_ratio_cap", self.level.volume_ratio_cap)?;
        check_min_count(
            "level.volume_baseline_window",
            self.level.volume_baseline_window,
            1,
        )?;
        check_windows("level.trendline_windows", &self.level.trendline_windows)?;
        check_unit("level.min_r_squared", self.level.min_r_squared)?;

        check_pct(
            "confluence.zone_tolerance_pct",
            self.confluence.zone_tolerance_pct,
        )?;
        check_min_count(
            "confluence.min_timeframes",
            self.confluence.min_timeframes,
            1,
        )?;

        check_windows("pattern.windows", &self.pattern.windows)?;
        check_pct("pattern.peak_tolerance_pct", self.pattern.peak_tolerance_pct)?;
        check_pct(
            "pattern.min_neckline_move_pct",
            self.pattern.min_neckline_move_pct,
        )?;
        check_unit("pattern.min_fit", self.pattern.min_fit)?;
        check_unit("pattern.strong_fit", self.pattern.strong_fit)?;
        check_positive("pattern.flat_side_tolerance", self.pattern.flat_side_tolerance)?;
        check_pct("pattern.min_slope_move_pct", self.pattern.min_slope_move_pct)?;
        check_unit("pattern.min_confidence", self.pattern.min_confidence)?;
        check_unit("pattern.confidence_ceiling", self.pattern.confidence_ceiling)?;
        check_min_count("pattern.max_proposals", self.pattern.max_proposals, 1)?;

        check_min_count("feature.short_ma", self.feature.short_ma, 2)?;
        check_min_count("feature.long_ma", self.feature.long_ma, 2)?;
        if self.feature.long_ma <= self.feature.short_ma {
            return Err(EngineError::InvalidConfig {
                field: "feature.long_ma",
                value: self.feature.long_ma as f64,
                min: self.feature.short_ma as f64 + 1.0,
                max: f64::INFINITY,
            });
        }
        check_positive(
            "feature.trend_threshold_pct",
            self.feature.trend_threshold_pct,
        )?;
        check_positive(
            "feature.volatile_threshold_pct",
            self.feature.volatile_threshold_pct,
        )?;
        check_positive("feature.volume_ratio_cap", self.feature.volume_ratio_cap)?;

        check_min_count("fetch.candle_limit", self.fetch.candle_limit, 10)?;
        check_min_count("fetch.min_candles", self.fetch.min_candles, 10)?;
        check_min_count("max_lines", self.max_lines, 1)?;
        Ok(())
    }

    /// Exact-touch tolerance as a fraction of price (not percent).
    pub fn exact_tolerance(&self) -> f64 {
        self.level.price_tolerance_pct / 100.0 * self.level.exact_tolerance_fraction
    }
}

fn check_pct(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 || value > 100.0 {
        return Err(EngineError::InvalidConfig {
            field,
            value,
            min: 0.0,
            max: 100.0,
        });
    }
    Ok(())
}

fn check_unit(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(EngineError::InvalidConfig {
            field,
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

fn check_positive(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(EngineError::InvalidConfig {
            field,
            value,
            min: 0.0,
            max: f64::INFINITY,
        });
    }
    Ok(())
}

fn check_min_count(field: &'static str, value: usize, min: usize) -> Result<()> {
    if value < min {
        return Err(EngineError::InvalidConfig {
            field,
            value: value as f64,
            min: min as f64,
            max: f64::INFINITY,
        });
    }
    Ok(())
}

fn check_windows(field: &'static str, windows: &[usize]) -> Result<()> {
    if windows.is_empty() || windows.iter().any(|&w| w < 10) {
        return Err(EngineError::InvalidConfig {
            field,
            value: windows.iter().copied().min().unwrap_or(0) as f64,
            min: 10.0,
            max: f64::INFINITY,
        });
    }
    Ok(())
}
