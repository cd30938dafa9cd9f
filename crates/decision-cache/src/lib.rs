//! Process-lifetime cache of oracle decisions keyed by request URL.
//!
//! Entries expire on read: a lookup older than the TTL reports a miss but the
//! entry stays in the map until the next store for the same key overwrites
//! it. Without a capacity the map grows for the lifetime of the process.

pub mod metrics;

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::time::Instant;
use tracing::debug;

pub const DEFAULT_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct CacheEntry {
    /// `true` means block.
    decision: bool,
    stored_at: Instant,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Lookup {
    /// Carries the stored decision, `true` meaning block.
    Hit(bool),
    Miss,
}

impl Lookup {
    pub fn decision(&self) -> Option<bool> {
        match self {
            Lookup::Hit(decision) => Some(*decision),
            Lookup::Miss => None,
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CacheConfig {
    pub ttl: Duration,
    /// `None` keeps every key until the process exits.
    pub capacity: Option<usize>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_TTL,
            capacity: None,
        }
    }
}

#[derive(Debug)]
pub struct DecisionCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
}

impl Default for DecisionCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl DecisionCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Returns the decision for `key` while it is younger than the TTL.
    /// Never mutates the map.
    pub fn lookup(&self, key: &str) -> Lookup {
        let entries = self.entries.read();
        match entries.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.config.ttl => {
                metrics::record_lookup("hit");
                debug!(key, decision = entry.decision, "decision cache hit");
                Lookup::Hit(entry.decision)
            }
            Some(_) => {
                metrics::record_lookup("stale");
                debug!(key, "decision cache entry expired");
                Lookup::Miss
            }
            None => {
                metrics::record_lookup("miss");
                Lookup::Miss
            }
        }
    }

    /// Inserts or overwrites `key` stamped with the current time.
    pub fn store(&self, key: impl Into<String>, decision: bool) {
        let key = key.into();
        let mut entries = self.entries.write();
        if let Some(capacity) = self.config.capacity {
            if !entries.contains_key(&key) && entries.len() >= capacity.max(1) {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.stored_at)
                    .map(|(key, _)| key.clone());
                if let Some(oldest) = oldest {
                    entries.remove(&oldest);
                    metrics::record_eviction();
                    debug!(evicted = %oldest, "decision cache at capacity");
                }
            }
        }
        entries.insert(
            key,
            CacheEntry {
                decision,
                stored_at: Instant::now(),
            },
        );
        metrics::set_entries(entries.len());
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_ttl(ttl: Duration) -> DecisionCache {
        DecisionCache::new(CacheConfig {
            ttl,
            ..CacheConfig::default()
        })
    }

    #[tokio::test(start_paused = true)]
    async fn store_then_lookup_within_ttl_is_fresh() {
        let cache = DecisionCache::default();
        cache.store("https://example.com/docs", false);
        tokio::time::advance(Duration::from_secs(59 * 60)).await;

        assert_eq!(
            cache.lookup("https://example.com/docs"),
            Lookup::Hit(false)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_exactly_at_ttl() {
        let cache = cache_with_ttl(Duration::from_secs(10));
        cache.store("https://game-site.com", true);

        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(cache.lookup("https://game-site.com"), Lookup::Miss);
        // Expired entries linger until overwritten.
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn store_overwrites_and_restamps() {
        let cache = cache_with_ttl(Duration::from_secs(10));
        cache.store("https://a.dev", true);
        tokio::time::advance(Duration::from_secs(11)).await;
        cache.store("https://a.dev", false);

        assert_eq!(cache.lookup("https://a.dev").decision(), Some(false));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn unknown_key_misses_without_inserting() {
        let cache = DecisionCache::default();
        assert_eq!(cache.lookup("https://nowhere.test"), Lookup::Miss);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_evicts_oldest_entry() {
        let cache = DecisionCache::new(CacheConfig {
            ttl: DEFAULT_TTL,
            capacity: Some(2),
        });
        cache.store("https://one.test", true);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.store("https://two.test", false);
        tokio::time::advance(Duration::from_secs(1)).await;
        cache.store("https://three.test", true);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.lookup("https://one.test"), Lookup::Miss);
        assert_eq!(cache.lookup("https://two.test"), Lookup::Hit(false));
        assert_eq!(cache.lookup("https://three.test"), Lookup::Hit(true));
    }
}
