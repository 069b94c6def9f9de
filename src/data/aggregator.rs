use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::future::join_all;

use crate::config::FetchSettings;
use crate::data::cache::{CacheKey, CandleCache};
use crate::data::provider::CandleProvider;
use crate::domain::{Timeframe, TimeframeDataset};

/// Fetches and caches candle series across timeframes with a
/// "settle all, fail none" policy: every requested timeframe resolves to
/// either a dataset or an omission, and one slow or failing timeframe never
/// blocks or aborts the others.
pub struct TimeframeAggregator<P> {
    provider: Arc<P>,
    cache: Arc<CandleCache>,
    settings: FetchSettings,
}

impl<P: CandleProvider> TimeframeAggregator<P> {
    pub fn new(provider: Arc<P>, settings: FetchSettings) -> Self {
        let cache = Arc::new(CandleCache::new(Duration::from_secs(settings.cache_ttl_secs)));
        TimeframeAggregator {
            provider,
            cache,
            settings,
        }
    }

    pub fn cache(&self) -> &CandleCache {
        &self.cache
    }

    /// Fetch every requested timeframe concurrently. Failed timeframes are
    /// omitted from the result map; zero successes yields an empty map (not
    /// an error) so downstream stages degrade gracefully.
    pub async fn fetch(
        &self,
        symbol: &str,
        timeframes: &[Timeframe],
    ) -> HashMap<Timeframe, TimeframeDataset> {
        let futures = timeframes
            .iter()
            .map(|&tf| self.fetch_one(symbol, tf));
        let settled = join_all(futures).await;

        let mut datasets = HashMap::new();
        for (&tf, outcome) in timeframes.iter().zip(settled) {
            match outcome {
                Ok(dataset) => {
                    datasets.insert(tf, dataset);
                }
                Err(e) => {
                    log::warn!("omitting timeframe {tf} for {symbol}: {e:#}");
                }
            }
        }
        datasets
    }

    /// One key's check-fetch-insert sequence under that key's lock, so
    /// duplicate concurrent requests collapse to a single provider call.
    async fn fetch_one(&self, symbol: &str, timeframe: Timeframe) -> Result<TimeframeDataset> {
        let key = CacheKey::new(symbol, timeframe);
        let key_lock = self.cache.key_lock(&key).await;
        let _guard = key_lock.lock().await;

        if let Some(dataset) = self.cache.get_fresh(&key) {
            return Ok(dataset);
        }

        let fetch = self
            .provider
            .fetch_candles(symbol, timeframe, self.settings.candle_limit);
        let candles = match self.settings.fetch_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), fetch)
                .await
                .with_context(|| format!("fetch timed out after {ms}ms"))??,
            None => fetch.await?,
        };

        if candles.len() < self.settings.min_candles {
            bail!(
                "insufficient candles: got {}, need at least {}",
                candles.len(),
                self.settings.min_candles
            );
        }

        let dataset = TimeframeDataset::new(timeframe, candles);
        if !dataset.is_chronological() {
            // Tolerated: detection degrades rather than aborting.
            log::warn!("{key}: candle times are not strictly increasing");
        }

        self.cache.insert(key, dataset.clone());
        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::domain::Candle;

    /// Scripted provider: succeeds for all timeframes except those listed,
    /// counting every underlying call.
    struct ScriptedProvider {
        failing: Vec<Timeframe>,
        calls: AtomicUsize,
    }

    impl ScriptedProvider {
        fn new(failing: Vec<Timeframe>) -> Self {
            ScriptedProvider {
                failing,
                calls: AtomicUsize::new(0),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CandleProvider for ScriptedProvider {
        async fn fetch_candles(
            &self,
            _symbol: &str,
            timeframe: Timeframe,
            limit: usize,
        ) -> anyhow::Result<Vec<Candle>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failing.contains(&timeframe) {
                bail!("simulated transient failure");
            }
            let step = timeframe.seconds();
            Ok((0..limit)
                .map(|i| Candle::new(i as i64 * step, 100.0, 101.0, 99.0, 100.5, 10.0))
                .collect())
        }
    }

    fn settings() -> FetchSettings {
        FetchSettings {
            candle_limit: 100,
            min_candles: 50,
            cache_ttl_secs: 300,
            fetch_timeout_ms: None,
        }
    }

    #[tokio::test]
    async fn failed_timeframes_are_omitted_not_fatal() {
        let provider = Arc::new(ScriptedProvider::new(vec![Timeframe::H4]));
        let aggregator = TimeframeAggregator::new(provider, settings());

        let requested = [Timeframe::M15, Timeframe::H1, Timeframe::H4, Timeframe::D1];
        let datasets = aggregator.fetch("BTCUSDT", &requested).await;

        assert_eq!(datasets.len(), 3);
        assert!(!datasets.contains_key(&Timeframe::H4));
        assert!(datasets.contains_key(&Timeframe::H1));
    }

    #[tokio::test]
    async fn all_failures_yield_empty_map() {
        let provider = Arc::new(ScriptedProvider::new(vec![Timeframe::H1, Timeframe::H4]));
        let aggregator = TimeframeAggregator::new(provider, settings());

        let datasets = aggregator
            .fetch("BTCUSDT", &[Timeframe::H1, Timeframe::H4])
            .await;
        assert!(datasets.is_empty());
    }

    #[tokio::test]
    async fn repeat_fetch_within_ttl_hits_cache() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let aggregator = TimeframeAggregator::new(Arc::clone(&provider), settings());

        aggregator.fetch("BTCUSDT", &[Timeframe::H1]).await;
        aggregator.fetch("BTCUSDT", &[Timeframe::H1]).await;

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn concurrent_requests_collapse_to_one_fetch() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let aggregator =
            Arc::new(TimeframeAggregator::new(Arc::clone(&provider), settings()));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let agg = Arc::clone(&aggregator);
                tokio::spawn(async move { agg.fetch("BTCUSDT", &[Timeframe::H1]).await })
            })
            .collect();
        for task in tasks {
            let datasets = task.await.unwrap();
            assert_eq!(datasets.len(), 1);
        }

        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn short_series_counts_as_failure() {
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let mut s = settings();
        s.candle_limit = 20; // provider returns 20, below min_candles
        let aggregator = TimeframeAggregator::new(provider, s);

        let datasets = aggregator.fetch("BTCUSDT", &[Timeframe::H1]).await;
        assert!(datasets.is_empty());
    }
}
