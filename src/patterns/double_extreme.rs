//! Double top / double bottom: two near-equal extremes of the same sign
//! separated by an opposite extremum (the neckline) displaced far enough
//! from the average peak that the pattern is not just noise.

use crate::config::PatternSettings;
use crate::models::{Implication, PatternCandidate, PatternKind};
use crate::patterns::scoring::score_candidate;
use crate::patterns::{Extreme, WindowCtx};

const BASE_CONFIDENCE: f64 = 0.62;

pub(crate) fn double_top(ctx: &WindowCtx, config: &PatternSettings) -> Option<PatternCandidate> {
    detect(ctx, config, false)
}

pub(crate) fn double_bottom(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    detect(ctx, config, true)
}

fn detect(
    ctx: &WindowCtx,
    config: &PatternSettings,
    inverted: bool,
) -> Option<PatternCandidate> {
    let (extremes, counters) = if inverted {
        (&ctx.troughs, &ctx.peaks)
    } else {
        (&ctx.peaks, &ctx.troughs)
    };
    if extremes.len() < 2 {
        return None;
    }

    let min_separation = (ctx.window / 5).max(2);
    let mut best: Option<(Extreme, Extreme, Extreme)> = None;

    for (i, &first) in extremes.iter().enumerate() {
        for &second in &extremes[i + 1..] {
            if second.index - first.index < min_separation {
                continue;
            }
            let avg = (first.price + second.price) / 2.0;
            if avg <= 0.0 {
                continue;
            }
            if (first.price - second.price).abs() / avg > config.peak_tolerance_pct / 100.0 {
                continue;
            }

            // Neckline: the deepest counter-extreme strictly between the two.
            let neckline = counters
                .iter()
                .filter(|c| c.index > first.index && c.index < second.index)
                .min_by(|a, b| {
                    if inverted {
                        b.price.total_cmp(&a.price)
                    } else {
                        a.price.total_cmp(&b.price)
                    }
                });
            let Some(&neckline) = neckline else { continue };

            let displacement = if inverted {
                (neckline.price - avg) / avg
            } else {
                (avg - neckline.price) / avg
            };
            if displacement < config.min_neckline_move_pct / 100.0 {
                continue;
            }

            // Prefer the most extreme pair; ties resolve to the later one.
            let better = best
                .map(|(a, b, _)| {
                    let prev_avg = (a.price + b.price) / 2.0;
                    if inverted { avg <= prev_avg } else { avg >= prev_avg }
                })
                .unwrap_or(true);
            if better {
                best = Some((first, second, neckline));
            }
        }
    }

    let (first, second, neckline) = best?;
    let key_indices = [first.index, neckline.index, second.index];
    let confidence = score_candidate(ctx.candles, &key_indices, BASE_CONFIDENCE, config);

    Some(PatternCandidate {
        kind: if inverted {
            PatternKind::DoubleBottom
        } else {
            PatternKind::DoubleTop
        },
        confidence,
        start_index: ctx.start,
        end_index: ctx.end(),
        key_points: vec![
            ctx.key_point(&first),
            ctx.key_point(&neckline),
            ctx.key_point(&second),
        ],
        implication: if inverted {
            Implication::Bullish
        } else {
            Implication::Bearish
        },
    })
}
