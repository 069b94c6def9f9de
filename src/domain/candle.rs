use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandleKind {
    Bullish,
    Bearish,
}

/// A single OHLCV candle. `time` is the open time in unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Candle {
            time,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn kind(&self) -> CandleKind {
        if self.close >= self.open {
            CandleKind::Bullish
        } else {
            CandleKind::Bearish
        }
    }

    /// Low and high of the candle body as a tuple.
    pub fn body_range(&self) -> (f64, f64) {
        match self.kind() {
            CandleKind::Bullish => (self.open, self.close),
            CandleKind::Bearish => (self.close, self.open),
        }
    }

    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.body_range().1
    }

    pub fn lower_wick(&self) -> f64 {
        self.body_range().0 - self.low
    }

    /// True when the price falls inside the candle body (inclusive).
    pub fn body_contains(&self, price: f64) -> bool {
        let (lo, hi) = self.body_range();
        price >= lo && price <= hi
    }

    /// OHLC consistency check. Malformed candles are tolerated downstream
    /// (degraded results, never a panic), but detection skips scoring them.
    pub fn is_well_formed(&self) -> bool {
        let (body_lo, body_hi) = self.body_range();
        self.low <= body_lo
            && self.high >= body_hi
            && self.low.is_finite()
            && self.high.is_finite()
            && self.open.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
            && self.volume >= 0.0
    }
}
