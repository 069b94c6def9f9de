//! Feature extraction: turns one detected line plus its market context into
//! a fixed-schema vector for downstream scoring models. Extraction is pure
//! and recomputed per request, so vectors never go stale against a refreshed
//! dataset.

use chrono::{DateTime, Datelike, Timelike};
use statrs::statistics::Statistics;

use crate::config::FeatureSettings;
use crate::domain::Candle;
use crate::models::{DetectedLine, FeatureVector, MarketRegime, TouchKind};
use crate::utils::trailing_average;

/// Builds the feature vector for `line` against the candle series it was
/// detected on. `analyzed_timeframes` is the number of timeframes the
/// surrounding run actually analyzed, used for the confluence share.
pub fn extract_features(
    line: &DetectedLine,
    candles: &[Candle],
    current_price: f64,
    analyzed_timeframes: usize,
    settings: &FeatureSettings,
) -> FeatureVector {
    let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();
    let series_avg_volume = if volumes.is_empty() {
        0.0
    } else {
        volumes.iter().sum::<f64>() / volumes.len() as f64
    };

    let volume_ratios: Vec<f64> = line
        .touches
        .iter()
        .map(|t| {
            if series_avg_volume > 0.0 {
                (t.volume / series_avg_volume).min(settings.volume_ratio_cap)
            } else {
                0.0
            }
        })
        .collect();
    let avg_touch_volume_ratio = if volume_ratios.is_empty() {
        0.0
    } else {
        volume_ratios.iter().sum::<f64>() / volume_ratios.len() as f64
    };
    let max_touch_volume_ratio = volume_ratios.iter().copied().fold(0.0, f64::max);

    let avg_bounce_strength = if line.touches.is_empty() {
        0.0
    } else {
        line.touches.iter().map(|t| t.bounce_strength).sum::<f64>()
            / line.touches.len() as f64
    };

    let level_age_candles = line
        .touches
        .first()
        .and_then(|first| candles.iter().position(|c| c.time >= first.time))
        .map(|idx| candles.len().saturating_sub(idx + 1))
        .unwrap_or(0);

    let recent_cutoff = candles
        .len()
        .checked_sub(settings.recency_window)
        .and_then(|idx| candles.get(idx))
        .map(|c| c.time)
        .or_else(|| candles.first().map(|c| c.time))
        .unwrap_or(i64::MAX);
    let recent_touch_count = line
        .touches
        .iter()
        .filter(|t| t.time >= recent_cutoff)
        .count();

    let (hour_of_day, day_of_week) = candles
        .last()
        .and_then(|c| DateTime::from_timestamp(c.time, 0))
        .map(|dt| {
            (
                dt.hour() as f64,
                dt.weekday().num_days_from_monday() as f64,
            )
        })
        .unwrap_or((0.0, 0.0));

    let timeframe_confluence = if analyzed_timeframes == 0 {
        0.0
    } else {
        line.supporting_timeframes.len() as f64 / analyzed_timeframes as f64
    };

    let distance_from_price_pct = if current_price > 0.0 {
        (line.price - current_price).abs() / current_price * 100.0
    } else {
        0.0
    };

    FeatureVector {
        wick_touch_ratio: line.touch_kind_ratio(TouchKind::Wick),
        body_touch_ratio: line.touch_kind_ratio(TouchKind::Body),
        exact_touch_ratio: line.touch_kind_ratio(TouchKind::Exact),
        touch_count: line.touch_count() as f64,
        avg_touch_volume_ratio,
        max_touch_volume_ratio,
        avg_bounce_strength,
        level_age_candles: level_age_candles as f64,
        recent_touch_count: recent_touch_count as f64,
        trend_divergence_pct: trend_divergence_pct(&closes, settings),
        volatility_pct: volatility_pct(&closes),
        hour_of_day,
        day_of_week,
        timeframe_confluence,
        round_price_proximity: round_price_proximity(line.price),
        distance_from_price_pct,
        line_strength: line.strength,
        line_confidence: line.confidence,
        regime: classify_regime(&closes, settings),
    }
}

/// SMA divergence plus a volatility proxy. Volatility dominates: a market
/// can trend and whipsaw at once, and the whipsaw is what invalidates
/// level-based entries.
pub fn classify_regime(closes: &[f64], settings: &FeatureSettings) -> MarketRegime {
    if closes.len() < settings.long_ma {
        return MarketRegime::Ranging;
    }
    if volatility_pct(closes) > settings.volatile_threshold_pct {
        return MarketRegime::Volatile;
    }
    if trend_divergence_pct(closes, settings).abs() > settings.trend_threshold_pct {
        return MarketRegime::Trending;
    }
    MarketRegime::Ranging
}

/// Short-vs-long SMA gap as a percentage of the long SMA. Positive means
/// the short average sits above the long one.
fn trend_divergence_pct(closes: &[f64], settings: &FeatureSettings) -> f64 {
    if closes.len() < settings.long_ma {
        return 0.0;
    }
    let last = closes.len() - 1;
    let short = trailing_average(closes, last, settings.short_ma);
    let long = trailing_average(closes, last, settings.long_ma);
    if long <= 0.0 {
        return 0.0;
    }
    (short - long) / long * 100.0
}

/// Standard deviation of per-candle percentage returns.
fn volatility_pct(closes: &[f64]) -> f64 {
    if closes.len() < 3 {
        return 0.0;
    }
    let returns: Vec<f64> = closes
        .windows(2)
        .filter(|w| w[0] > 0.0)
        .map(|w| (w[1] - w[0]) / w[0] * 100.0)
        .collect();
    if returns.len() < 2 {
        return 0.0;
    }
    returns.std_dev()
}

/// Proximity of a price to psychologically round numbers, in [0, 1].
/// The grid scales with the price's order of magnitude, so 50_000 on BTC
/// and 0.50 on a small-cap both score as round.
pub fn round_price_proximity(price: f64) -> f64 {
    if price <= 0.0 || !price.is_finite() {
        return 0.0;
    }
    let magnitude = 10f64.powf(price.abs().log10().floor());

    // Coarser grid lines weigh more: a hit on the full magnitude step beats
    // one on the tenth-of-magnitude step.
    let grid = [
        (magnitude, 1.0),
        (magnitude * 0.5, 0.9),
        (magnitude * 0.25, 0.75),
        (magnitude * 0.1, 0.5),
    ];

    let mut best: f64 = 0.0;
    for (step, weight) in grid {
        let nearest = (price / step).round() * step;
        let rel_dist = (price - nearest).abs() / step;
        let score = weight * (1.0 - 2.0 * rel_dist).max(0.0);
        best = best.max(score);
    }
    best
}
