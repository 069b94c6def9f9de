//! Head-and-shoulders (and its inverse): three extremes where the center
//! clearly exceeds both flanks and the flanks sit within tolerance of each
//! other.

use crate::config::PatternSettings;
use crate::models::{Implication, PatternCandidate, PatternKind};
use crate::patterns::scoring::score_candidate;
use crate::patterns::WindowCtx;

const BASE_CONFIDENCE: f64 = 0.65;

pub(crate) fn head_and_shoulders(
    ctx: &WindowCtx,
    config: &PatternSettings,
) -> Option<PatternCandidate> {
    detect(ctx, config, false)
}

pub(crate) fn inverse_head_and_shoulders(
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
    let extremes = if inverted { &ctx.troughs } else { &ctx.peaks };
    if extremes.len() < 3 {
        return None;
    }

    // Scan consecutive triples; the latest qualifying formation wins.
    for triple in extremes.windows(3).rev() {
        let (left, head, right) = (triple[0], triple[1], triple[2]);

        let head_above = if inverted {
            head.price < left.price && head.price < right.price
        } else {
            head.price > left.price && head.price > right.price
        };
        if !head_above {
            continue;
        }

        let shoulder_avg = (left.price + right.price) / 2.0;
        if shoulder_avg <= 0.0 {
            continue;
        }
        if (left.price - right.price).abs() / shoulder_avg > config.peak_tolerance_pct / 100.0 {
            continue;
        }

        // The head must stand clear of the shoulders, not just edge past.
        let head_clearance = if inverted {
            (shoulder_avg - head.price) / shoulder_avg
        } else {
            (head.price - shoulder_avg) / shoulder_avg
        };
        if head_clearance < config.min_neckline_move_pct / 100.0 {
            continue;
        }

        let key_indices = [left.index, head.index, right.index];
        let confidence = score_candidate(ctx.candles, &key_indices, BASE_CONFIDENCE, config);

        return Some(PatternCandidate {
            kind: if inverted {
                PatternKind::InverseHeadAndShoulders
            } else {
                PatternKind::HeadAndShoulders
            },
            confidence,
            start_index: ctx.start,
            end_index: ctx.end(),
            key_points: vec![
                ctx.key_point(&left),
                ctx.key_point(&head),
                ctx.key_point(&right),
            ],
            implication: if inverted {
                Implication::Bullish
            } else {
                Implication::Bearish
            },
        });
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::test_support::candles_from_closes;

    fn ctx<'a>(
        candles: &'a [crate::domain::Candle],
        config: &PatternSettings,
    ) -> WindowCtx<'a> {
        WindowCtx::new(candles, 0, candles.len(), config)
    }

    /// Shoulders at ~108, head at 115, valleys at 100.
    fn hs_closes() -> Vec<f64> {
        let mut closes = Vec::new();
        for i in 0..8 {
            closes.push(100.0 + i as f64); // up to 107
        }
        closes.push(108.0); // left shoulder
        for i in 0..8 {
            closes.push(107.0 - i as f64); // down to 100
        }
        for i in 0..15 {
            closes.push(101.0 + i as f64); // up to 115 (head)
        }
        for i in 0..15 {
            closes.push(114.0 - i as f64); // down to 100
        }
        for i in 0..8 {
            closes.push(101.0 + i as f64); // up to 108 (right shoulder)
        }
        for i in 0..8 {
            closes.push(107.0 - i as f64);
        }
        closes
    }

    #[test]
    fn detects_head_and_shoulders() {
        let candles = candles_from_closes(&hs_closes());
        let config = PatternSettings::default();
        let candidate =
            head_and_shoulders(&ctx(&candles, &config), &config).expect("head and shoulders");

        assert_eq!(candidate.kind, PatternKind::HeadAndShoulders);
        assert_eq!(candidate.implication, Implication::Bearish);
        assert_eq!(candidate.key_points.len(), 3);
        // The head is the middle key point and the highest.
        let head = candidate.key_points[1].value;
        assert!(head > candidate.key_points[0].value);
        assert!(head > candidate.key_points[2].value);
    }

    #[test]
    fn detects_inverse_formation_when_mirrored() {
        let closes: Vec<f64> = hs_closes().iter().map(|c| 220.0 - c).collect();
        let candles = candles_from_closes(&closes);
        let config = PatternSettings::default();
        let candidate = inverse_head_and_shoulders(&ctx(&candles, &config), &config)
            .expect("inverse head and shoulders");
        assert_eq!(candidate.kind, PatternKind::InverseHeadAndShoulders);
        assert_eq!(candidate.implication, Implication::Bullish);
    }

    #[test]
    fn lopsided_shoulders_are_rejected() {
        // Right shoulder 6% above the left.
        let mut closes = Vec::new();
        for i in 0..8 {
            closes.push(100.0 + i as f64);
        }
        for i in 0..8 {
            closes.push(107.0 - i as f64);
        }
        for i in 0..15 {
            closes.push(101.0 + i as f64);
        }
        for i in 0..15 {
            closes.push(114.0 - i as f64);
        }
        for i in 0..14 {
            closes.push(101.0 + i as f64); // right shoulder peaks at 114
        }
        for i in 0..8 {
            closes.push(113.0 - i as f64);
        }
        let candles = candles_from_closes(&closes);
        let config = PatternSettings::default();
        assert!(head_and_shoulders(&ctx(&candles, &config), &config).is_none());
    }
}
