use std::time::Instant;

use crate::domain::candle::Candle;
use crate::domain::timeframe::Timeframe;

/// Candle series for one (symbol, timeframe). Immutable once fetched;
/// a refresh replaces the whole dataset rather than patching candles.
#[derive(Debug, Clone)]
pub struct TimeframeDataset {
    pub timeframe: Timeframe,
    pub candles: Vec<Candle>,
    pub reliability_weight: f64,
    pub fetched_at: Instant,
}

impl TimeframeDataset {
    pub fn new(timeframe: Timeframe, candles: Vec<Candle>) -> Self {
        TimeframeDataset {
            timeframe,
            candles,
            reliability_weight: timeframe.reliability_weight(),
            fetched_at: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.volume).collect()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.candles.last().map(|c| c.close)
    }

    /// Candle open times must be strictly increasing. Out-of-order data is
    /// tolerated (detection degrades), but it is worth a warning.
    pub fn is_chronological(&self) -> bool {
        self.candles.windows(2).all(|w| w[0].time < w[1].time)
    }
}
