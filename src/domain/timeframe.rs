use serde::{Deserialize, Serialize};
use strum_macros::EnumIter;

/// Candle interval sizes the engine analyzes. Ordered smallest to largest so
/// `Ord` reflects interval width.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumIter,
)]
pub enum Timeframe {
    M5,
    M15,
    M30,
    H1,
    H4,
    D1,
}

impl Timeframe {
    /// Binance-style shorthand (`5m`, `1h`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            "30m" => Some(Timeframe::M30),
            "1h" => Some(Timeframe::H1),
            "4h" => Some(Timeframe::H4),
            "1d" => Some(Timeframe::D1),
            _ => None,
        }
    }

    pub fn seconds(&self) -> i64 {
        match self {
            Timeframe::M5 => 5 * 60,
            Timeframe::M15 => 15 * 60,
            Timeframe::M30 => 30 * 60,
            Timeframe::H1 => 60 * 60,
            Timeframe::H4 => 4 * 60 * 60,
            Timeframe::D1 => 24 * 60 * 60,
        }
    }

    /// Static reliability weight in (0, 1]. Larger timeframes carry more
    /// signal per candle, so levels found there are trusted more.
    pub fn reliability_weight(&self) -> f64 {
        match self {
            Timeframe::M5 => 0.5,
            Timeframe::M15 => 0.6,
            Timeframe::M30 => 0.7,
            Timeframe::H1 => 0.8,
            Timeframe::H4 => 0.9,
            Timeframe::D1 => 1.0,
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}
