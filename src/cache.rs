// =============================================================================
// Result Cache — last good verdict per instrument
// =============================================================================
//
// Host-side store shared across instrument tasks via `Arc<ResultCache>`.
// The aggregator never touches it.
//
//   conclusive result    -> replaces the entry, clears any stale marker
//   inconclusive result  -> keeps the previous good entry, marks it stale
//                           with the reason (no entry yet -> nothing stored)
//
// Thread safety: parking_lot::RwLock around the map, AtomicU64 version bumped
// on every mutation.
// =============================================================================

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::bias::BiasResult;
use crate::error::BiasError;
use crate::types::Mode;

/// A stored verdict plus its bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct CachedBias {
    pub symbol: String,
    pub cycle_id: Uuid,
    pub updated_at: DateTime<Utc>,
    /// Why the entry is no longer current, if it isn't.
    pub stale: Option<String>,
    pub result: BiasResult,
}

impl CachedBias {
    pub fn is_stale(&self) -> bool {
        self.stale.is_some()
    }
}

/// What `record` did with a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheUpdate {
    Stored,
    MarkedStale,
    Skipped,
}

#[derive(Debug, Default)]
pub struct ResultCache {
    entries: RwLock<HashMap<String, CachedBias>>,
    version: AtomicU64,
}

impl ResultCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a cycle's result under `symbol`.
    pub fn record(&self, symbol: &str, result: BiasResult) -> CacheUpdate {
        if let Some(inconclusive) = result.inconclusive {
            let reason = BiasError::from(inconclusive).to_string();
            return if self.mark_stale(symbol, reason) {
                CacheUpdate::MarkedStale
            } else {
                debug!(symbol, "Inconclusive result with no prior entry; nothing cached");
                CacheUpdate::Skipped
            };
        }

        let entry = CachedBias {
            symbol: symbol.to_string(),
            cycle_id: Uuid::new_v4(),
            updated_at: Utc::now(),
            stale: None,
            result,
        };
        debug!(
            symbol,
            cycle_id = %entry.cycle_id,
            direction = %entry.result.overall_direction,
            mode = %entry.result.mode,
            "Bias result cached"
        );
        self.entries.write().insert(symbol.to_string(), entry);
        self.bump();
        CacheUpdate::Stored
    }

    /// Flag the entry for `symbol` as stale. Returns false when there is no
    /// entry to flag.
    pub fn mark_stale(&self, symbol: &str, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        let mut entries = self.entries.write();
        match entries.get_mut(symbol) {
            Some(entry) => {
                warn!(symbol, reason = %reason, "Cached bias marked stale");
                entry.stale = Some(reason);
                drop(entries);
                self.bump();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, symbol: &str) -> Option<CachedBias> {
        self.entries.read().get(symbol).cloned()
    }

    /// Mode to carry into the next cycle. A stale entry carries nothing.
    pub fn carried_mode(&self, symbol: &str) -> Option<Mode> {
        self.entries
            .read()
            .get(symbol)
            .filter(|e| !e.is_stale())
            .map(|e| e.result.mode)
    }

    /// All entries, ordered by symbol.
    pub fn snapshot(&self) -> Vec<CachedBias> {
        let mut all: Vec<CachedBias> = self.entries.read().values().cloned().collect();
        all.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        all
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Incremented on every mutation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::Relaxed)
    }

    fn bump(&self) {
        self.version.fetch_add(1, Ordering::Relaxed);
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::basket::BasketPerformance;
    use crate::bias::{TierVotes, TieredBiasAggregator};
    use crate::config::BiasConfig;
    use crate::market_data::{Candle, PriceSeries};
    use crate::signals::SignalVote;
    use crate::types::Direction;
    use std::sync::Arc;

    fn aggregator() -> TieredBiasAggregator {
        TieredBiasAggregator::new(BiasConfig::default()).unwrap()
    }

    fn bearish_reversal() -> BiasResult {
        let votes = |n: usize, score: f64| -> Vec<SignalVote> {
            (0..n).map(|i| SignalVote::from_score(format!("v{i}"), score)).collect()
        };
        aggregator().aggregate(
            TierVotes {
                fast: votes(8, -50.0),
                medium: votes(1, -50.0),
                slow: votes(3, 50.0),
            },
            None,
            None,
        )
    }

    fn short_result() -> BiasResult {
        let candles = (0..10)
            .map(|i| Candle {
                timestamp: i * 60_000,
                open: 100.0,
                high: 101.0,
                low: 99.0,
                close: 100.0,
                volume: 10.0,
            })
            .collect();
        let series = PriceSeries::new(candles).unwrap();
        aggregator().evaluate(&series, &BasketPerformance::default(), None)
    }

    #[test]
    fn record_and_get() {
        let cache = ResultCache::new();
        assert!(cache.is_empty());
        assert_eq!(cache.record("NIFTY", bearish_reversal()), CacheUpdate::Stored);

        let entry = cache.get("NIFTY").unwrap();
        assert!(!entry.is_stale());
        assert_eq!(entry.result.overall_direction, Direction::Bearish);
        assert_eq!(cache.carried_mode("NIFTY"), Some(Mode::Reversal));
        assert_eq!(cache.carried_mode("BANKNIFTY"), None);
        assert_eq!(cache.version(), 1);
    }

    #[test]
    fn inconclusive_marks_previous_entry_stale() {
        let cache = ResultCache::new();
        cache.record("NIFTY", bearish_reversal());
        let first = cache.get("NIFTY").unwrap();

        assert_eq!(cache.record("NIFTY", short_result()), CacheUpdate::MarkedStale);
        let entry = cache.get("NIFTY").unwrap();
        assert_eq!(entry.cycle_id, first.cycle_id);
        assert_eq!(entry.result, first.result);
        let reason = entry.stale.unwrap();
        assert!(reason.contains("need at least 50"), "{reason}");
        assert_eq!(cache.carried_mode("NIFTY"), None);
    }

    #[test]
    fn inconclusive_without_entry_is_skipped() {
        let cache = ResultCache::new();
        assert_eq!(cache.record("NIFTY", short_result()), CacheUpdate::Skipped);
        assert!(cache.get("NIFTY").is_none());
        assert_eq!(cache.version(), 0);
    }

    #[test]
    fn new_good_result_clears_stale() {
        let cache = ResultCache::new();
        cache.record("NIFTY", bearish_reversal());
        assert!(cache.mark_stale("NIFTY", "feed down"));
        cache.record("NIFTY", bearish_reversal());
        assert!(!cache.get("NIFTY").unwrap().is_stale());
        assert!(!cache.mark_stale("SENSEX", "feed down"));
    }

    #[test]
    fn snapshot_is_sorted_and_shared_across_threads() {
        let cache = Arc::new(ResultCache::new());
        let handles: Vec<_> = ["C", "A", "B"]
            .into_iter()
            .map(|symbol| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    cache.record(symbol, bearish_reversal());
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let symbols: Vec<String> = cache.snapshot().into_iter().map(|e| e.symbol).collect();
        assert_eq!(symbols, vec!["A", "B", "C"]);
        assert_eq!(cache.len(), 3);
    }
}
