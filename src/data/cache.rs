use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::domain::TimeframeDataset;
use crate::domain::Timeframe;

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
pub struct CacheKey {
    pub symbol: String,
    pub timeframe: Timeframe,
}

impl CacheKey {
    pub fn new(symbol: &str, timeframe: Timeframe) -> Self {
        CacheKey {
            symbol: symbol.to_string(),
            timeframe,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.symbol, self.timeframe)
    }
}

/// Time-expiring store of fetched datasets, keyed by (symbol, timeframe).
///
/// Reads go through a plain mutex-guarded map: lock, check, compute
/// elsewhere, insert. The per-key async locks exist so
/// duplicate in-flight requests for the same key collapse to one underlying
/// fetch instead of issuing N redundant calls.
pub struct CandleCache {
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, TimeframeDataset>>,
    key_locks: tokio::sync::Mutex<HashMap<CacheKey, Arc<tokio::sync::Mutex<()>>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CandleCache {
    pub fn new(ttl: Duration) -> Self {
        CandleCache {
            ttl,
            entries: Mutex::new(HashMap::new()),
            key_locks: tokio::sync::Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Returns the cached dataset if it is still inside the expiry window.
    pub fn get_fresh(&self, key: &CacheKey) -> Option<TimeframeDataset> {
        let entries = self.entries.lock().ok()?;
        match entries.get(key) {
            Some(dataset) if dataset.fetched_at.elapsed() < self.ttl => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                log::debug!("candle cache HIT for {key} ({} candles)", dataset.len());
                Some(dataset.clone())
            }
            Some(_) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                log::debug!("candle cache EXPIRED for {key}");
                None
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: CacheKey, dataset: TimeframeDataset) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, dataset);
        }
    }

    /// The async lock guarding fetches for one key. Hold it across the
    /// check-fetch-insert sequence to get single-flight behavior.
    pub async fn key_lock(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    /// (hits, misses) counters since construction.
    pub fn stats(&self) -> (u64, u64) {
        (
            self.hits.load(Ordering::Relaxed),
            self.misses.load(Ordering::Relaxed),
        )
    }

    /// Drop every entry, e.g. when the host knows upstream data changed.
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Candle;

    fn dataset(n: usize) -> TimeframeDataset {
        let candles = (0..n)
            .map(|i| Candle::new(i as i64 * 3600, 1.0, 2.0, 0.5, 1.5, 10.0))
            .collect();
        TimeframeDataset::new(Timeframe::H1, candles)
    }

    #[test]
    fn fresh_entry_hits() {
        let cache = CandleCache::new(Duration::from_secs(60));
        let key = CacheKey::new("BTCUSDT", Timeframe::H1);
        assert!(cache.get_fresh(&key).is_none());

        cache.insert(key.clone(), dataset(3));
        let cached = cache.get_fresh(&key).unwrap();
        assert_eq!(cached.len(), 3);

        let (hits, misses) = cache.stats();
        assert_eq!((hits, misses), (1, 1));
    }

    #[test]
    fn zero_ttl_entry_expires_immediately() {
        let cache = CandleCache::new(Duration::from_secs(0));
        let key = CacheKey::new("BTCUSDT", Timeframe::H1);
        cache.insert(key.clone(), dataset(3));
        assert!(cache.get_fresh(&key).is_none());
    }

    #[test]
    fn keys_are_per_symbol_and_timeframe() {
        let cache = CandleCache::new(Duration::from_secs(60));
        cache.insert(CacheKey::new("BTCUSDT", Timeframe::H1), dataset(3));
        assert!(cache.get_fresh(&CacheKey::new("BTCUSDT", Timeframe::H4)).is_none());
        assert!(cache.get_fresh(&CacheKey::new("ETHUSDT", Timeframe::H1)).is_none());
    }

    #[test]
    fn clear_empties_the_cache() {
        let cache = CandleCache::new(Duration::from_secs(60));
        let key = CacheKey::new("BTCUSDT", Timeframe::H1);
        cache.insert(key.clone(), dataset(3));
        cache.clear();
        assert!(cache.get_fresh(&key).is_none());
    }
}
