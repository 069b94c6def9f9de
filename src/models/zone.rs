use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ZoneKind {
    Support,
    Resistance,
    /// Contributing lines disagree on side (or include trendlines).
    Pivot,
}

/// A price band where independently detected lines from multiple timeframes
/// agree. Derived, never mutated. Invariants: `price_min < price_max` and
/// `price_min <= price_center <= price_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfluenceZone {
    pub price_min: f64,
    /// Touch-count-weighted mean of contributing line prices.
    pub price_center: f64,
    pub price_max: f64,
    pub kind: ZoneKind,
    pub timeframe_count: usize,
    pub supporting_timeframes: BTreeSet<Timeframe>,
}

impl ConfluenceZone {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.price_min && price <= self.price_max
    }

    pub fn width_pct(&self) -> f64 {
        if self.price_center <= 0.0 {
            return 0.0;
        }
        (self.price_max - self.price_min) / self.price_center * 100.0
    }
}
