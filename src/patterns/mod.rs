//! Geometric chart-pattern recognition over a single timeframe's candles.
//!
//! Each pattern kind is an independent pure test over a sliding window.
//! Overlapping candidates across window sizes are intentionally not
//! deduplicated here; the caller ranks by confidence and keeps the top N.

pub mod channel;
pub mod double_extreme;
pub mod head_shoulders;
pub mod scoring;
pub mod triangle;

use std::collections::BTreeSet;

use find_peaks::PeakFinder;

use crate::config::PatternSettings;
use crate::domain::Candle;
use crate::models::{KeyPoint, PatternCandidate};
use crate::utils::{LinearFit, ols_fit};

/// A swing extreme inside one window. `index` is absolute in the scanned
/// candle series.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Extreme {
    pub index: usize,
    pub price: f64,
}

/// Everything the per-kind detectors need about one window, computed once.
pub(crate) struct WindowCtx<'a> {
    pub candles: &'a [Candle],
    pub start: usize,
    pub window: usize,
    /// Swing highs, ascending by index.
    pub peaks: Vec<Extreme>,
    /// Swing lows, ascending by index.
    pub troughs: Vec<Extreme>,
    /// OLS fit of window highs, x relative to `start`.
    pub high_fit: Option<LinearFit>,
    /// OLS fit of window lows, x relative to `start`.
    pub low_fit: Option<LinearFit>,
    pub mean_price: f64,
}

impl<'a> WindowCtx<'a> {
    fn new(candles: &'a [Candle], start: usize, window: usize, config: &PatternSettings) -> Self {
        let slice = &candles[start..start + window];
        let highs: Vec<f64> = slice.iter().map(|c| c.high).collect();
        let lows: Vec<f64> = slice.iter().map(|c| c.low).collect();
        let mean_price =
            slice.iter().map(|c| c.close).sum::<f64>() / window as f64;
        let prominence = mean_price * config.peak_tolerance_pct / 100.0 * 0.5;

        let peaks = PeakFinder::new(&highs)
            .with_min_prominence(prominence)
            .find_peaks()
            .into_iter()
            .map(|p| {
                let i = p.middle_position();
                Extreme {
                    index: start + i,
                    price: highs[i],
                }
            })
            .collect::<Vec<_>>();
        let negated: Vec<f64> = lows.iter().map(|&v| -v).collect();
        let troughs = PeakFinder::new(&negated)
            .with_min_prominence(prominence)
            .find_peaks()
            .into_iter()
            .map(|p| {
                let i = p.middle_position();
                Extreme {
                    index: start + i,
                    price: lows[i],
                }
            })
            .collect::<Vec<_>>();

        let mut ctx = WindowCtx {
            candles,
            start,
            window,
            peaks,
            troughs,
            high_fit: ols_fit(&highs),
            low_fit: ols_fit(&lows),
            mean_price,
        };
        ctx.peaks.sort_by_key(|e| e.index);
        ctx.troughs.sort_by_key(|e| e.index);
        ctx
    }

    pub fn end(&self) -> usize {
        self.start + self.window - 1
    }

    pub fn key_point(&self, extreme: &Extreme) -> KeyPoint {
        KeyPoint {
            time: self.candles[extreme.index].time,
            value: extreme.price,
        }
    }

    /// Fractional price move across the window implied by a fit's slope.
    pub fn fractional_move(&self, fit: &LinearFit) -> f64 {
        if self.mean_price <= 0.0 {
            return 0.0;
        }
        fit.slope * (self.window as f64 - 1.0) / self.mean_price
    }
}

type Detector = fn(&WindowCtx, &PatternSettings) -> Option<PatternCandidate>;

/// Fixed detector order keeps the scan deterministic.
const DETECTORS: &[Detector] = &[
    double_extreme::double_top,
    double_extreme::double_bottom,
    head_shoulders::head_and_shoulders,
    head_shoulders::inverse_head_and_shoulders,
    triangle::symmetrical_triangle,
    triangle::ascending_triangle,
    triangle::descending_triangle,
    channel::ascending_channel,
    channel::descending_channel,
];

/// Run every detector over every configured window size, sliding by half a
/// window. Candidates below `min_confidence` are dropped, nothing else is
/// filtered.
pub fn scan(candles: &[Candle], config: &PatternSettings) -> Vec<PatternCandidate> {
    let mut out = Vec::new();

    for &window in &config.windows {
        if candles.len() < window {
            continue;
        }
        let step = (window / 2).max(1);
        let mut starts: BTreeSet<usize> = (0..=candles.len() - window).step_by(step).collect();
        starts.insert(candles.len() - window);

        for start in starts {
            let ctx = WindowCtx::new(candles, start, window, config);
            for detect in DETECTORS {
                if let Some(candidate) = detect(&ctx, config)
                    && candidate.confidence >= config.min_confidence
                {
                    out.push(candidate);
                }
            }
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use test_support::*;

    #[test]
    fn scan_is_idempotent_and_sorted_input_independent() {
        let candles = candles_from_closes(&wave(100.0, 110.0, 10, 4));
        let config = PatternSettings::default();
        let first = scan(&candles, &config);
        let second = scan(&candles, &config);
        assert_eq!(first, second);
    }

    #[test]
    fn short_series_yields_nothing() {
        let candles = candles_from_closes(&[100.0, 101.0, 102.0]);
        assert!(scan(&candles, &PatternSettings::default()).is_empty());
    }

    #[test]
    fn all_candidates_respect_bounds() {
        let candles = candles_from_closes(&wave(100.0, 108.0, 12, 5));
        let config = PatternSettings::default();
        for candidate in scan(&candles, &config) {
            assert!(candidate.confidence >= config.min_confidence);
            assert!(candidate.confidence <= config.confidence_ceiling);
            assert!(candidate.start_index < candidate.end_index);
            assert!(candidate.end_index < candles.len());
            assert!(!candidate.key_points.is_empty());
            // Every candidate spans exactly one configured window.
            assert!(config.windows.contains(&candidate.window_len()));
        }
    }
}
