use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{Candle, Timeframe};

/// The external market-data collaborator. Implementations wrap whatever
/// transport the host uses (REST, WebSocket replay, disk fixtures).
///
/// Failures are transient-error signals carried as `anyhow::Error`; the
/// aggregator isolates them per timeframe and never retries on its own.
#[async_trait]
pub trait CandleProvider: Send + Sync {
    /// Fetch up to `limit` candles for one symbol/timeframe, ordered by
    /// strictly increasing open time.
    async fn fetch_candles(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        limit: usize,
    ) -> Result<Vec<Candle>>;
}
