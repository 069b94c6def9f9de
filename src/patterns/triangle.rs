//! Triangles: independent OLS trendlines over window highs and lows.
//! Symmetric needs converging opposite-sign slopes with near-term
//! convergence; ascending/descending need one statistically flat side and
//! one trending side with an adequate fit.

use statrs::statistics::Statistics;

use crate::config::PatternSettings;
use crate::models::{Implication, KeyPoint, PatternCandidate, PatternKind};
use crate::patterns::scoring::score_candidate;
use crate::patterns::WindowCtx;
use crate::utils::LinearFit;

const BASE_CONFIDENCE: f64 = 0.58;

/// How far past the window the apex may sit and still count as "near-term"
/// convergence, in window lengths.
const CONVERGENCE_HORIZON: f64 = 2.5;

pub(crate) fn symmetrical_triangle(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    let high_fit = ctx.high_fit?;
    let low_fit = ctx.low_fit?;
    let min_slope = config.min_slope_move_pct / 100.0;

    if ctx.fractional_move(&high_fit) > -min_slope || ctx.fractional_move(&low_fit) < min_slope {
        return None;
    }
    if high_fit.r_squared < config.min_fit || low_fit.r_squared < config.min_fit {
        return None;
    }

    // Apex where the two lines meet, in window-relative x.
    let slope_gap = high_fit.slope - low_fit.slope;
    if slope_gap.abs() < f64::EPSILON {
        return None;
    }
    let apex_x = (low_fit.intercept - high_fit.intercept) / slope_gap;
    if apex_x <= 0.0 || apex_x > ctx.window as f64 * CONVERGENCE_HORIZON {
        return None;
    }

    Some(build(
        ctx,
        config,
        PatternKind::SymmetricalTriangle,
        Implication::Neutral,
        &high_fit,
        &low_fit,
    ))
}

pub(crate) fn ascending_triangle(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    let high_fit = ctx.high_fit?;
    let low_fit = ctx.low_fit?;

    let highs: Vec<f64> = ctx.candles[ctx.start..=ctx.end()]
        .iter()
        .map(|c| c.high)
        .collect();
    if !is_flat(&highs, config) {
        return None;
    }
    if ctx.fractional_move(&low_fit) < config.min_slope_move_pct / 100.0
        || low_fit.r_squared < config.min_fit
    {
        return None;
    }

    Some(build(
        ctx,
        config,
        PatternKind::AscendingTriangle,
        Implication::Bullish,
        &high_fit,
        &low_fit,
    ))
}

pub(crate) fn descending_triangle(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    let high_fit = ctx.high_fit?;
    let low_fit = ctx.low_fit?;

    let lows: Vec<f64> = ctx.candles[ctx.start..=ctx.end()]
        .iter()
        .map(|c| c.low)
        .collect();
    if !is_flat(&lows, config) {
        return None;
    }
    if ctx.fractional_move(&high_fit) > -config.min_slope_move_pct / 100.0
        || high_fit.r_squared < config.min_fit
    {
        return None;
    }

    Some(build(
        ctx,
        config,
        PatternKind::DescendingTriangle,
        Implication::Bearish,
        &high_fit,
        &low_fit,
    ))
}

/// Statistically flat: standard deviation small relative to the mean.
fn is_flat(values: &[f64], config: &PatternSettings) -> bool {
    let mean = values.mean();
    if mean <= 0.0 {
        return false;
    }
    values.std_dev() / mean < config.flat_side_tolerance
}

fn build(
    ctx: &WindowCtx,
    config: &PatternSettings,
    kind: PatternKind,
    implication: Implication,
    high_fit: &LinearFit,
    low_fit: &LinearFit,
) -> PatternCandidate {
    let last_x = ctx.window as f64 - 1.0;
    let start_time = ctx.candles[ctx.start].time;
    let end_time = ctx.candles[ctx.end()].time;

    let key_indices = [ctx.start, ctx.end()];
    let confidence = score_candidate(ctx.candles, &key_indices, BASE_CONFIDENCE, config);

    PatternCandidate {
        kind,
        confidence,
        start_index: ctx.start,
        end_index: ctx.end(),
        key_points: vec![
            KeyPoint { time: start_time, value: high_fit.value_at(0.0) },
            KeyPoint { time: end_time, value: high_fit.value_at(last_x) },
            KeyPoint { time: start_time, value: low_fit.value_at(0.0) },
            KeyPoint { time: end_time, value: low_fit.value_at(last_x) },
        ],
        implication,
    }
}
