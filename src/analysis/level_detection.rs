//! Touch-point and level detection for a single timeframe: horizontal
//! support/resistance from clustered swing extremes, and OLS trendlines over
//! sliding windows of highs/lows.

use std::collections::BTreeSet;
use std::ops::Range;

use argminmax::ArgMinMax;
use find_peaks::PeakFinder;

use crate::config::AnalysisConfig;
use crate::domain::{Candle, TimeframeDataset};
use crate::models::{DetectedLine, LineKind, TouchKind, TouchPoint};
use crate::utils::{ols_fit, trailing_average};

/// Touch count at which the count term of strength saturates.
const TOUCHES_FOR_FULL_SCORE: f64 = 6.0;
/// Strength damping applied when not a single touch bounced.
const NO_BOUNCE_DAMPING: f64 = 0.85;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Support,
    Resistance,
}

impl Side {
    fn extreme(&self, candle: &Candle) -> f64 {
        match self {
            Side::Support => candle.low,
            Side::Resistance => candle.high,
        }
    }

    fn line_kind(&self) -> LineKind {
        match self {
            Side::Support => LineKind::Support,
            Side::Resistance => LineKind::Resistance,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SwingPoint {
    index: usize,
    price: f64,
}

/// A touch paired with the candle index it happened at. The index never
/// leaves this module; result records carry timestamps.
#[derive(Debug, Clone)]
struct IndexedTouch {
    index: usize,
    point: TouchPoint,
}

/// All levels and trendlines for one timeframe's dataset, already filtered
/// by the configured touch-count and strength thresholds.
pub fn detect_levels(dataset: &TimeframeDataset, config: &AnalysisConfig) -> Vec<DetectedLine> {
    let mut lines = detect_horizontal_levels(dataset, config);
    lines.extend(detect_trendlines(dataset, config));
    lines
}

// ============================================================
// Horizontal levels
// ============================================================

pub fn detect_horizontal_levels(
    dataset: &TimeframeDataset,
    config: &AnalysisConfig,
) -> Vec<DetectedLine> {
    let candles = &dataset.candles;
    if candles.len() < config.level.min_touch_count.max(3) {
        return Vec::new();
    }

    let mut lines = Vec::new();
    for side in [Side::Support, Side::Resistance] {
        let swings = swing_points(candles, side, config.level.price_tolerance_pct);
        for cluster in cluster_by_price(&swings, config.level.price_tolerance_pct) {
            if let Some(line) = build_horizontal_line(dataset, &cluster, side, config) {
                lines.push(line);
            }
        }
    }
    lines
}

/// Swing extremes on one side, found via prominence-based peak search plus
/// the global extreme (which a plateau-blind peak pass can miss).
fn swing_points(candles: &[Candle], side: Side, tolerance_pct: f64) -> Vec<SwingPoint> {
    let values: Vec<f64> = match side {
        Side::Resistance => candles.iter().map(|c| c.high).collect(),
        // Peaks of the negated lows are the troughs.
        Side::Support => candles.iter().map(|c| -c.low).collect(),
    };
    let mean = values.iter().map(|v| v.abs()).sum::<f64>() / values.len() as f64;
    let prominence = mean * tolerance_pct / 100.0;

    let mut swings: Vec<SwingPoint> = PeakFinder::new(&values)
        .with_min_prominence(prominence)
        .find_peaks()
        .into_iter()
        .map(|p| {
            let index = p.middle_position();
            SwingPoint {
                index,
                price: side.extreme(&candles[index]),
            }
        })
        .collect();

    // The peak pass can miss a plateau at the series boundary; the global
    // extreme (the maximum of `values` on either side, lows being negated)
    // always belongs in the candidate set.
    let (_, global_index) = values.argminmax();
    if !swings.iter().any(|s| s.index == global_index) {
        swings.push(SwingPoint {
            index: global_index,
            price: side.extreme(&candles[global_index]),
        });
    }

    swings.sort_by_key(|s| s.index);
    swings
}

/// Greedy price clustering: sort by price, then grow a cluster while the
/// next swing stays within tolerance of the running mean.
fn cluster_by_price(swings: &[SwingPoint], tolerance_pct: f64) -> Vec<Vec<SwingPoint>> {
    if swings.is_empty() {
        return Vec::new();
    }
    let mut sorted = swings.to_vec();
    sorted.sort_by(|a, b| a.price.total_cmp(&b.price));

    let mut clusters: Vec<Vec<SwingPoint>> = Vec::new();
    let mut current = vec![sorted[0]];
    let mut sum = sorted[0].price;

    for &swing in &sorted[1..] {
        let mean = sum / current.len() as f64;
        if (swing.price - mean).abs() <= mean * tolerance_pct / 100.0 {
            current.push(swing);
            sum += swing.price;
        } else {
            clusters.push(std::mem::take(&mut current));
            current.push(swing);
            sum = swing.price;
        }
    }
    clusters.push(current);
    clusters
}

fn build_horizontal_line(
    dataset: &TimeframeDataset,
    cluster: &[SwingPoint],
    side: Side,
    config: &AnalysisConfig,
) -> Option<DetectedLine> {
    let candles = &dataset.candles;
    let level = cluster.iter().map(|s| s.price).sum::<f64>() / cluster.len() as f64;
    if !level.is_finite() || level <= 0.0 {
        return None;
    }

    let touches = collect_touches(candles, |_| level, 0..candles.len(), side, config, |_| true);
    if touches.len() < config.level.min_touch_count {
        log::debug!(
            "dropping {} cluster at {level:.4}: {} touches < {}",
            side.line_kind(),
            touches.len(),
            config.level.min_touch_count
        );
        return None;
    }

    let strength = line_strength(&touches, candles, config);
    if strength < config.level.strength_threshold {
        return None;
    }
    let confidence =
        (0.7 * strength + 0.3 * dataset.reliability_weight).clamp(0.0, 1.0);

    Some(DetectedLine {
        id: format!("{}-{}-{:.6}", dataset.timeframe, side.line_kind(), level),
        kind: side.line_kind(),
        price: level,
        slope: None,
        intercept: None,
        r_squared: None,
        touches: touches.into_iter().map(|t| t.point).collect(),
        strength,
        confidence,
        supporting_timeframes: BTreeSet::from([dataset.timeframe]),
    })
}

// ============================================================
// Trendlines
// ============================================================

pub fn detect_trendlines(
    dataset: &TimeframeDataset,
    config: &AnalysisConfig,
) -> Vec<DetectedLine> {
    let candles = &dataset.candles;
    let len = candles.len();
    let mut lines = Vec::new();

    for side in [Side::Support, Side::Resistance] {
        let values: Vec<f64> = candles.iter().map(|c| side.extreme(c)).collect();
        let mut best: Option<DetectedLine> = None;

        for &window in &config.level.trendline_windows {
            if window > len {
                continue;
            }
            let step = (window / 2).max(1);
            let mut start = 0;
            while start + window <= len {
                if let Some(candidate) =
                    fit_trendline(dataset, &values, start, window, side, config)
                {
                    let better = best
                        .as_ref()
                        .map(|b| candidate.confidence > b.confidence)
                        .unwrap_or(true);
                    if better {
                        best = Some(candidate);
                    }
                }
                start += step;
            }
        }

        if let Some(line) = best {
            lines.push(line);
        }
    }
    lines
}

fn fit_trendline(
    dataset: &TimeframeDataset,
    values: &[f64],
    start: usize,
    window: usize,
    side: Side,
    config: &AnalysisConfig,
) -> Option<DetectedLine> {
    let candles = &dataset.candles;
    let fit = ols_fit(&values[start..start + window])?;
    if fit.r_squared < config.level.min_r_squared {
        return None;
    }

    // Convert the window-relative fit into absolute candle-index coordinates.
    let slope = fit.slope;
    let intercept = fit.intercept - slope * start as f64;
    let level_at = |i: usize| intercept + slope * i as f64;

    // Trendline touches are pullbacks to the line, so only pivot candles
    // count; otherwise a window hugging the fit would merge into one touch.
    let touches = collect_touches(
        candles,
        level_at,
        start..start + window,
        side,
        config,
        |i| is_pivot(values, i, side),
    );
    if touches.len() < config.level.min_touch_count {
        return None;
    }

    let strength = line_strength(&touches, candles, config);
    if strength < config.level.strength_threshold {
        return None;
    }
    let confidence = (0.5 * strength
        + 0.3 * fit.r_squared
        + 0.2 * dataset.reliability_weight)
        .clamp(0.0, 1.0);

    let end = start + window - 1;
    Some(DetectedLine {
        id: format!(
            "{}-{}-trend-{}-{}",
            dataset.timeframe,
            side.line_kind(),
            start,
            end
        ),
        kind: LineKind::Trendline,
        price: level_at(end),
        slope: Some(slope),
        intercept: Some(intercept),
        r_squared: Some(fit.r_squared),
        touches: touches.into_iter().map(|t| t.point).collect(),
        strength,
        confidence,
        supporting_timeframes: BTreeSet::from([dataset.timeframe]),
    })
}

// ============================================================
// Touch collection and scoring
// ============================================================

/// A local extreme on the relevant side, with at least one strict neighbor.
fn is_pivot(values: &[f64], i: usize, side: Side) -> bool {
    if i == 0 || i + 1 >= values.len() {
        return false;
    }
    let (prev, v, next) = (values[i - 1], values[i], values[i + 1]);
    match side {
        Side::Support => v <= prev && v <= next && (v < prev || v < next),
        Side::Resistance => v >= prev && v >= next && (v > prev || v > next),
    }
}

/// Scan `range` for candles touching the (possibly sloped) level, classify
/// each touch, merge consecutive runs, then confirm bounces. `accept` lets
/// callers restrict which candles may count as touches at all.
fn collect_touches(
    candles: &[Candle],
    level_at: impl Fn(usize) -> f64,
    range: Range<usize>,
    side: Side,
    config: &AnalysisConfig,
    accept: impl Fn(usize) -> bool,
) -> Vec<IndexedTouch> {
    let mut raw: Vec<IndexedTouch> = Vec::new();

    for i in range {
        let candle = &candles[i];
        if !candle.is_well_formed() || !accept(i) {
            continue;
        }
        let level = level_at(i);
        if level <= 0.0 {
            continue;
        }
        let tolerance = level * config.level.price_tolerance_pct / 100.0;
        let exact_tolerance = level * config.exact_tolerance();
        let extreme = side.extreme(candle);

        let mut kinds = Vec::new();
        if (extreme - level).abs() <= tolerance {
            kinds.push(TouchKind::Wick);
        }
        if candle.body_contains(level) {
            kinds.push(TouchKind::Body);
        }
        if (extreme - level).abs() <= exact_tolerance {
            kinds.push(TouchKind::Exact);
        }
        if kinds.is_empty() {
            continue;
        }

        raw.push(IndexedTouch {
            index: i,
            point: TouchPoint {
                time: candle.time,
                price: extreme,
                kinds,
                volume: candle.volume,
                bounce_strength: 0.0,
            },
        });
    }

    let mut merged = merge_touch_runs(raw, &level_at, config.level.touch_merge_gap);
    for touch in &mut merged {
        touch.point.bounce_strength =
            bounce_strength(candles, touch.index, level_at(touch.index), side, config);
    }
    merged
}

/// Consecutive candles hugging a level are one touch, not many. Runs with
/// gaps up to `merge_gap` collapse to the candle closest to the level.
fn merge_touch_runs(
    raw: Vec<IndexedTouch>,
    level_at: &impl Fn(usize) -> f64,
    merge_gap: usize,
) -> Vec<IndexedTouch> {
    let mut merged: Vec<IndexedTouch> = Vec::new();
    let mut run: Vec<IndexedTouch> = Vec::new();

    let flush = |run: &mut Vec<IndexedTouch>, merged: &mut Vec<IndexedTouch>| {
        if run.is_empty() {
            return;
        }
        let best = run
            .drain(..)
            .min_by(|a, b| {
                let da = (a.point.price - level_at(a.index)).abs();
                let db = (b.point.price - level_at(b.index)).abs();
                da.total_cmp(&db)
            })
            .unwrap();
        merged.push(best);
    };

    for touch in raw {
        if let Some(last) = run.last()
            && touch.index - last.index > merge_gap
        {
            flush(&mut run, &mut merged);
        }
        run.push(touch);
    }
    flush(&mut run, &mut merged);
    merged
}

/// How decisively price left the level inside the lookback window after the
/// touch. Zero when it just sat there.
fn bounce_strength(
    candles: &[Candle],
    index: usize,
    level: f64,
    side: Side,
    config: &AnalysisConfig,
) -> f64 {
    let end = (index + 1 + config.level.bounce_lookback).min(candles.len());
    if index + 1 >= end || level <= 0.0 {
        return 0.0;
    }

    let mut best_move = 0.0f64;
    for candle in &candles[index + 1..end] {
        let away = match side {
            Side::Support => candle.close - level,
            Side::Resistance => level - candle.close,
        };
        best_move = best_move.max(away);
    }

    let move_pct = best_move / level * 100.0;
    (move_pct / config.level.full_bounce_move_pct).clamp(0.0, 1.0)
}

/// Strength blends touch count, recency of the latest touch, and a capped
/// volume-confirmation term. Absence of any bounce dampens but never
/// disqualifies.
fn line_strength(
    touches: &[IndexedTouch],
    candles: &[Candle],
    config: &AnalysisConfig,
) -> f64 {
    if touches.is_empty() || candles.len() < 2 {
        return 0.0;
    }
    let volumes: Vec<f64> = candles.iter().map(|c| c.volume).collect();

    let count_score = (touches.len() as f64 / TOUCHES_FOR_FULL_SCORE).min(1.0);

    let last_index = touches.iter().map(|t| t.index).max().unwrap_or(0);
    let recency_score = last_index as f64 / (candles.len() - 1) as f64;

    let volume_score = {
        let cap = config.level.volume_ratio_cap;
        let mut sum = 0.0;
        for touch in touches {
            let baseline =
                trailing_average(&volumes, touch.index, config.level.volume_baseline_window);
            let ratio = if baseline > 0.0 {
                (touch.point.volume / baseline).min(cap)
            } else {
                0.0
            };
            sum += ratio;
        }
        sum / touches.len() as f64 / cap
    };

    let mut strength = 0.45 * count_score + 0.30 * recency_score + 0.25 * volume_score;
    if touches.iter().all(|t| t.point.bounce_strength == 0.0) {
        strength *= NO_BOUNCE_DAMPING;
    }
    strength.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Timeframe;

    /// Flat series oscillating between `low` and `high` over `n` candles.
    fn bouncing_dataset(low: f64, high: f64, n: usize) -> TimeframeDataset {
        let mid = (low + high) / 2.0;
        let amp = (high - low) / 2.0;
        let candles: Vec<Candle> = (0..n)
            .map(|i| {
                // Period-20 triangle wave touching both extremes.
                let phase = (i % 20) as f64 / 20.0;
                let c = mid + amp * (4.0 * (phase - 0.5).abs() - 1.0);
                let o = mid;
                let (lo, hi) = (c.min(o) - amp * 0.02, c.max(o) + amp * 0.02);
                Candle::new(i as i64 * 3600, o, hi, lo, c, 100.0 + (i % 7) as f64)
            })
            .collect();
        TimeframeDataset::new(Timeframe::H1, candles)
    }

    #[test]
    fn flat_bouncing_series_yields_support_and_resistance() {
        let dataset = bouncing_dataset(49_000.0, 51_000.0, 500);
        let config = AnalysisConfig::default();
        let lines = detect_horizontal_levels(&dataset, &config);

        let support_near_low = lines.iter().any(|l| {
            l.kind == LineKind::Support && (l.price - 49_000.0).abs() / 49_000.0 < 0.02
        });
        let resistance_near_high = lines.iter().any(|l| {
            l.kind == LineKind::Resistance && (l.price - 51_000.0).abs() / 51_000.0 < 0.02
        });
        assert!(support_near_low, "no support near 49000: {lines:#?}");
        assert!(resistance_near_high, "no resistance near 51000");

        for line in &lines {
            assert!(line.touch_count() >= config.level.min_touch_count);
            assert!((0.0..=1.0).contains(&line.strength));
            assert!((0.0..=1.0).contains(&line.confidence));
            assert!(!line.supporting_timeframes.is_empty());
        }
    }

    #[test]
    fn detection_is_idempotent() {
        let dataset = bouncing_dataset(49_000.0, 51_000.0, 300);
        let config = AnalysisConfig::default();
        let first = detect_levels(&dataset, &config);
        let second = detect_levels(&dataset, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn too_few_candles_yield_nothing() {
        let dataset = bouncing_dataset(100.0, 102.0, 2);
        let lines = detect_horizontal_levels(&dataset, &AnalysisConfig::default());
        assert!(lines.is_empty());
    }

    #[test]
    fn malformed_candles_are_skipped_not_fatal() {
        let mut dataset = bouncing_dataset(49_000.0, 51_000.0, 300);
        // Corrupt a stretch with impossible OHLC relationships.
        for candle in dataset.candles.iter_mut().take(30) {
            candle.high = candle.low - 10.0;
        }
        // Must not panic; levels may degrade.
        let _ = detect_horizontal_levels(&dataset, &AnalysisConfig::default());
    }

    #[test]
    fn trendline_found_on_clean_uptrend() {
        let candles: Vec<Candle> = (0..120)
            .map(|i| {
                let trend = 1000.0 + i as f64 * 0.5;
                // Every 8th candle pulls back onto the trendline; the rest
                // ride slightly above it, so the pullbacks are pivots.
                let dip = if i % 8 == 0 { 0.0 } else { 0.6 };
                let low = trend + dip;
                Candle::new(i as i64 * 3600, low + 0.5, low + 1.2, low, low + 0.8, 100.0)
            })
            .collect();
        let dataset = TimeframeDataset::new(Timeframe::H1, candles);
        let mut config = AnalysisConfig::default();
        config.level.strength_threshold = 0.3;

        let lines = detect_trendlines(&dataset, &config);
        let support_trend = lines.iter().find(|l| {
            l.is_trendline() && l.slope.map(|s| s > 0.0).unwrap_or(false)
        });
        assert!(support_trend.is_some(), "no rising trendline: {lines:#?}");
        let line = support_trend.unwrap();
        assert!(line.r_squared.unwrap() >= config.level.min_r_squared);
        assert!(line.touch_count() >= config.level.min_touch_count);
    }

    #[test]
    fn choppy_series_produces_no_trendline() {
        // Pure noise around a flat mean: R² should stay under the floor.
        let candles: Vec<Candle> = (0..100)
            .map(|i| {
                let wiggle = ((i * 7919) % 13) as f64 - 6.0;
                let base = 100.0 + wiggle;
                Candle::new(i as i64 * 3600, base, base + 1.0, base - 1.0, base, 100.0)
            })
            .collect();
        let dataset = TimeframeDataset::new(Timeframe::H1, candles);
        let lines = detect_trendlines(&dataset, &AnalysisConfig::default());
        assert!(lines.is_empty(), "unexpected trendlines: {lines:#?}");
    }

    #[test]
    fn cluster_by_price_splits_distant_groups() {
        let swings = vec![
            SwingPoint { index: 0, price: 100.0 },
            SwingPoint { index: 5, price: 100.3 },
            SwingPoint { index: 9, price: 110.0 },
        ];
        let clusters = cluster_by_price(&swings, 0.5);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].len(), 2);
    }

    #[test]
    fn merge_collapses_consecutive_touches() {
        let raw: Vec<IndexedTouch> = [0usize, 1, 2, 10, 11]
            .iter()
            .map(|&i| IndexedTouch {
                index: i,
                point: TouchPoint {
                    time: i as i64,
                    price: 100.0 + i as f64 * 0.01,
                    kinds: vec![TouchKind::Wick],
                    volume: 1.0,
                    bounce_strength: 0.0,
                },
            })
            .collect();
        let merged = merge_touch_runs(raw, &|_| 100.0, 3);
        assert_eq!(merged.len(), 2);
        // Representative of each run is the touch closest to the level.
        assert_eq!(merged[0].index, 0);
        assert_eq!(merged[1].index, 10);
    }
}
