//! Confidence scoring shared by all pattern detectors: a per-kind base plus
//! bonuses for volume confirmation and nearby single-candle reversal
//! signatures, capped below 1.0 because geometric matches are never certain.

use crate::config::PatternSettings;
use crate::domain::Candle;

/// Base confidence, then bonuses, then the ceiling.
pub(crate) fn score_candidate(
    candles: &[Candle],
    key_indices: &[usize],
    base: f64,
    config: &PatternSettings,
) -> f64 {
    let score = base + volume_bonus(candles, key_indices) + reversal_bonus(candles, key_indices);
    score.min(config.confidence_ceiling)
}

/// Above-average volume at the key points strengthens a pattern.
fn volume_bonus(candles: &[Candle], key_indices: &[usize]) -> f64 {
    if candles.is_empty() || key_indices.is_empty() {
        return 0.0;
    }
    let series_avg = candles.iter().map(|c| c.volume).sum::<f64>() / candles.len() as f64;
    if series_avg <= 0.0 {
        return 0.0;
    }
    let key_avg = key_indices
        .iter()
        .filter_map(|&i| candles.get(i))
        .map(|c| c.volume)
        .sum::<f64>()
        / key_indices.len() as f64;

    let ratio = key_avg / series_avg;
    if ratio > 1.3 {
        0.10
    } else if ratio > 1.0 {
        0.05
    } else {
        0.0
    }
}

/// A reversal-shaped candle within two bars of any key point.
fn reversal_bonus(candles: &[Candle], key_indices: &[usize]) -> f64 {
    for &key in key_indices {
        let lo = key.saturating_sub(2);
        let hi = (key + 2).min(candles.len().saturating_sub(1));
        for i in lo..=hi {
            let candle = &candles[i];
            if is_hammer(candle) || is_shooting_star(candle) {
                return 0.05;
            }
            if i > 0 && is_engulfing(&candles[i - 1], candle) {
                return 0.05;
            }
        }
    }
    0.0
}

/// Long lower wick, small body near the top of the range.
pub(crate) fn is_hammer(candle: &Candle) -> bool {
    let body = candle.body();
    let range = candle.range();
    range > 0.0
        && body > 0.0
        && candle.lower_wick() >= 2.0 * body
        && candle.upper_wick() <= 0.5 * body
}

/// Mirror image of the hammer: long upper wick, body near the bottom.
pub(crate) fn is_shooting_star(candle: &Candle) -> bool {
    let body = candle.body();
    let range = candle.range();
    range > 0.0
        && body > 0.0
        && candle.upper_wick() >= 2.0 * body
        && candle.lower_wick() <= 0.5 * body
}

/// Opposite color and the second body swallows the first.
pub(crate) fn is_engulfing(prev: &Candle, candle: &Candle) -> bool {
    if prev.kind() == candle.kind() {
        return false;
    }
    let (prev_lo, prev_hi) = prev.body_range();
    let (lo, hi) = candle.body_range();
    lo < prev_lo && hi > prev_hi
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hammer_geometry() {
        // Open 10.0, close 10.25, low 9.0, high 10.3: long lower wick,
        // upper wick well under half the body.
        let hammer = Candle::new(0, 10.0, 10.3, 9.0, 10.25, 1.0);
        assert!(is_hammer(&hammer));
        assert!(!is_shooting_star(&hammer));

        let star = Candle::new(0, 10.2, 11.4, 9.95, 10.0, 1.0);
        assert!(is_shooting_star(&star));
        assert!(!is_hammer(&star));
    }

    #[test]
    fn engulfing_requires_opposite_color_and_larger_body() {
        let small_bear = Candle::new(0, 10.2, 10.3, 9.9, 10.0, 1.0);
        let big_bull = Candle::new(1, 9.9, 10.6, 9.8, 10.5, 1.0);
        assert!(is_engulfing(&small_bear, &big_bull));

        let same_color = Candle::new(1, 9.9, 10.6, 9.8, 10.5, 1.0);
        assert!(!is_engulfing(&big_bull, &same_color));
    }

    #[test]
    fn volume_bonus_tiers() {
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| Candle::new(i, 10.0, 10.2, 9.8, 10.1, 100.0))
            .collect();
        candles[5].volume = 400.0; // key point with a volume spike
        assert_eq!(volume_bonus(&candles, &[5]), 0.10);
        assert_eq!(volume_bonus(&candles, &[3]), 0.0);
    }

    #[test]
    fn score_never_exceeds_ceiling() {
        let mut candles: Vec<Candle> = (0..20)
            .map(|i| Candle::new(i, 10.0, 10.2, 9.8, 10.1, 100.0))
            .collect();
        candles[5].volume = 500.0;
        candles[6] = Candle::new(6, 10.0, 10.3, 9.0, 10.25, 100.0); // hammer
        let config = PatternSettings::default();
        let score = score_candidate(&candles, &[5], 0.9, &config);
        assert_eq!(score, config.confidence_ceiling);
    }
}
