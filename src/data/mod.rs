//! The data boundary: the external candle provider contract, the per-key
//! TTL cache, and the settle-all multi-timeframe aggregator.

pub mod aggregator;
pub mod cache;
pub mod provider;

pub use aggregator::TimeframeAggregator;
pub use cache::{CacheKey, CandleCache};
pub use provider::CandleProvider;
