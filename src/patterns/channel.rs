//! Channels: near-parallel high/low trendlines, both with strong fits,
//! direction matching the requested ascending/descending variant.

use crate::config::PatternSettings;
use crate::models::{Implication, KeyPoint, PatternCandidate, PatternKind};
use crate::patterns::scoring::score_candidate;
use crate::patterns::WindowCtx;

const BASE_CONFIDENCE: f64 = 0.60;

/// Slope mismatch allowed between the two rails, relative to their average
/// magnitude.
const PARALLEL_TOLERANCE: f64 = 0.35;

pub(crate) fn ascending_channel(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    detect(ctx, config, true)
}

pub(crate) fn descending_channel(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    detect(ctx, config, false)
}

fn detect(
    ctx: &WindowCtx,
    config: &PatternSettings,
    ascending: bool,
) -> Option<PatternCandidate> {
    let high_fit = ctx.high_fit?;
    let low_fit = ctx.low_fit?;

    if high_fit.r_squared < config.strong_fit || low_fit.r_squared < config.strong_fit {
        return None;
    }

    let min_move = config.min_slope_move_pct / 100.0;
    let high_move = ctx.fractional_move(&high_fit);
    let low_move = ctx.fractional_move(&low_fit);
    let direction_ok = if ascending {
        high_move >= min_move && low_move >= min_move
    } else {
        high_move <= -min_move && low_move <= -min_move
    };
    if !direction_ok {
        return None;
    }

    let avg_slope = (high_fit.slope.abs() + low_fit.slope.abs()) / 2.0;
    if avg_slope <= 0.0 {
        return None;
    }
    if (high_fit.slope - low_fit.slope).abs() > PARALLEL_TOLERANCE * avg_slope {
        return None;
    }

    let last_x = ctx.window as f64 - 1.0;
    let start_time = ctx.candles[ctx.start].time;
    let end_time = ctx.candles[ctx.end()].time;
    let key_indices = [ctx.start, ctx.end()];
    let confidence = score_candidate(ctx.candles, &key_indices, BASE_CONFIDENCE, config);

    Some(PatternCandidate {
        kind: if ascending {
            PatternKind::AscendingChannel
        } else {
            PatternKind::DescendingChannel
        },
        confidence,
        start_index: ctx.start,
        end_index: ctx.end(),
        key_points: vec![
            KeyPoint { time: start_time, value: high_fit.value_at(0.0) },
            KeyPoint { time: end_time, value: high_fit.value_at(last_x) },
            KeyPoint { time: start_time, value: low_fit.value_at(0.0) },
            KeyPoint { time: end_time, value: low_fit.value_at(last_x) },
        ],
        implication: if ascending {
            Implication::Bullish
        } else {
            Implication::Bearish
        },
    })
}
