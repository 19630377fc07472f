//! LRU Image Cache
//!
//! Byte-budgeted blob cache keyed by URL. Eviction order is by last access
//! time, so images that keep being viewed outlive ones fetched once.
//!
//! Access-time bumps on hits are sent to a background toucher task and never
//! delay the read.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::cache::stats::{CacheStats, StatsCounters};
use crate::error::{CacheError, Result};
use crate::store::images::{self, ImageMeta};
use crate::store::Store;

/// After evicting, the cache is brought down to this share of the ceiling.
pub const EVICTION_TARGET_PERCENT: u64 = 80;

pub fn eviction_target(max_bytes: u64) -> u64 {
    max_bytes / 100 * EVICTION_TARGET_PERCENT + max_bytes % 100 * EVICTION_TARGET_PERCENT / 100
}

// == Plan Eviction ==
/// Picks the URLs to evict so the cache fits its budget.
///
/// Nothing is evicted while the total is within `max_bytes`. Once over, the
/// least recently accessed entries go first until the total is at or below
/// [`eviction_target`]. The entry named by `keep` is never chosen.
pub fn plan_eviction(entries: &[ImageMeta], max_bytes: u64, keep: Option<&str>) -> Vec<String> {
    let mut total: u64 = entries.iter().map(|e| e.size_bytes).sum();
    if total <= max_bytes {
        return Vec::new();
    }

    let target = eviction_target(max_bytes);
    let mut by_access: Vec<&ImageMeta> = entries.iter().collect();
    by_access.sort_by(|a, b| {
        a.last_accessed_at
            .cmp(&b.last_accessed_at)
            .then_with(|| a.url.cmp(&b.url))
    });

    let mut evicted = Vec::new();
    for entry in by_access {
        if total <= target {
            break;
        }
        if keep == Some(entry.url.as_str()) {
            continue;
        }
        total -= entry.size_bytes;
        evicted.push(entry.url.clone());
    }
    evicted
}

fn evict_over_budget(
    conn: &rusqlite::Connection,
    max_bytes: u64,
    keep: Option<&str>,
) -> Result<usize> {
    let metas = images::list_meta(conn)?;
    let plan = plan_eviction(&metas, max_bytes, keep);
    for url in &plan {
        images::remove(conn, url)?;
    }
    Ok(plan.len())
}

// == Toucher ==
enum ToucherMsg {
    Touch { url: String, at: i64 },
    Flush(oneshot::Sender<()>),
}

fn spawn_toucher(store: Store) -> mpsc::UnboundedSender<ToucherMsg> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match msg {
                ToucherMsg::Touch { url, at } => {
                    let result = store
                        .with_conn({
                            let url = url.clone();
                            move |conn| images::touch(conn, &url, at)
                        })
                        .await;
                    if let Err(e) = result {
                        warn!("Failed to bump access time for {}: {}", url, e);
                    }
                }
                ToucherMsg::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("Image toucher stopped");
    });
    tx
}

// == Image Cache ==
#[derive(Debug, Clone)]
pub struct ImageCache {
    store: Store,
    max_bytes: u64,
    touches: mpsc::UnboundedSender<ToucherMsg>,
    counters: Arc<StatsCounters>,
}

impl std::fmt::Debug for ToucherMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToucherMsg::Touch { url, at } => write!(f, "Touch({}, {})", url, at),
            ToucherMsg::Flush(_) => f.write_str("Flush"),
        }
    }
}

impl ImageCache {
    /// Creates the cache and its toucher task. Must be called inside a Tokio
    /// runtime.
    pub fn new(store: Store, max_bytes: u64) -> Self {
        let touches = spawn_toucher(store.clone());
        Self {
            store,
            max_bytes,
            touches,
            counters: Arc::new(StatsCounters::default()),
        }
    }

    // == Put ==
    /// Stores an image and enforces the budget in the same transaction.
    ///
    /// The image just written is never evicted by its own insert. Images
    /// larger than the whole ceiling are rejected. Returns the number of
    /// entries evicted.
    pub async fn put(&self, url: &str, bytes: Vec<u8>) -> Result<usize> {
        let size = bytes.len() as u64;
        if size > self.max_bytes {
            return Err(CacheError::ImageTooLarge {
                url: url.to_string(),
                size,
                max: self.max_bytes,
            });
        }

        let now = self.store.now_ms();
        let max_bytes = self.max_bytes;
        let key = url.to_string();
        let evicted = self
            .store
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                images::upsert(&tx, &key, &bytes, now)?;
                let evicted = evict_over_budget(&tx, max_bytes, Some(&key))?;
                tx.commit()?;
                Ok(evicted)
            })
            .await?;

        self.note_evictions(evicted);
        Ok(evicted)
    }

    // == Get ==
    /// Returns the cached bytes, bumping the entry's access time in the
    /// background on a hit.
    pub async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let key = url.to_string();
        let data = self
            .store
            .with_conn(move |conn| images::fetch(conn, &key))
            .await?;

        match data {
            Some(bytes) => {
                self.counters.record_hit();
                let touch = ToucherMsg::Touch {
                    url: url.to_string(),
                    at: self.store.now_ms(),
                };
                if self.touches.send(touch).is_err() {
                    warn!("Image toucher is gone; access time for {} not updated", url);
                }
                Ok(Some(bytes))
            }
            None => {
                self.counters.record_miss();
                Ok(None)
            }
        }
    }

    /// Waits until every access-time bump sent so far has been applied.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.touches.send(ToucherMsg::Flush(tx)).is_ok() {
            let _ = rx.await;
        }
    }

    // == Enforce Budget ==
    /// Evicts least recently accessed images if the cache is over budget.
    pub async fn enforce_budget(&self) -> Result<usize> {
        let max_bytes = self.max_bytes;
        let evicted = self
            .store
            .with_conn(move |conn| {
                let tx = conn.transaction()?;
                let evicted = evict_over_budget(&tx, max_bytes, None)?;
                tx.commit()?;
                Ok(evicted)
            })
            .await?;

        self.note_evictions(evicted);
        Ok(evicted)
    }

    pub async fn total_bytes(&self) -> Result<u64> {
        self.store.with_conn(|conn| images::total_bytes(conn)).await
    }

    pub async fn entries(&self) -> Result<Vec<ImageMeta>> {
        self.store.with_conn(|conn| images::list_meta(conn)).await
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }

    fn note_evictions(&self, evicted: usize) {
        if evicted > 0 {
            self.counters.record_evictions(evicted);
            info!(
                "Image cache over {} bytes: evicted {} entries",
                self.max_bytes, evicted
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, ManualClock};

    fn meta(url: &str, size: u64, at: i64) -> ImageMeta {
        ImageMeta {
            url: url.to_string(),
            size_bytes: size,
            last_accessed_at: at,
        }
    }

    fn setup(max_bytes: u64) -> (ImageCache, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let store = Store::in_memory(clock.clone() as Arc<dyn Clock>);
        (ImageCache::new(store, max_bytes), clock)
    }

    #[test]
    fn test_eviction_target() {
        assert_eq!(eviction_target(1000), 800);
        assert_eq!(eviction_target(52_428_800), 41_943_040);
        assert_eq!(eviction_target(5), 4);
    }

    #[test]
    fn test_plan_within_budget_evicts_nothing() {
        let entries = [meta("a", 500, 0), meta("b", 500, 1)];
        assert!(plan_eviction(&entries, 1000, None).is_empty());
    }

    #[test]
    fn test_plan_evicts_oldest_access_first() {
        let entries = [meta("new", 400, 30), meta("old", 400, 10), meta("mid", 400, 20)];
        assert_eq!(plan_eviction(&entries, 1000, None), ["old"]);
    }

    #[test]
    fn test_plan_evicts_down_to_target() {
        let entries = [
            meta("a", 300, 1),
            meta("b", 300, 2),
            meta("c", 300, 3),
            meta("d", 300, 4),
        ];
        // 1200 > 1000, evicting "a" leaves 900 which is still above 800
        assert_eq!(plan_eviction(&entries, 1000, None), ["a", "b"]);
    }

    #[test]
    fn test_plan_skips_kept_entry() {
        let entries = [meta("fresh", 900, 0), meta("other", 300, 1)];
        assert_eq!(plan_eviction(&entries, 1000, Some("fresh")), ["other"]);
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (cache, _) = setup(1000);
        cache.put("https://cdn/a.png", vec![1, 2, 3]).await.unwrap();

        assert_eq!(
            cache.get("https://cdn/a.png").await.unwrap(),
            Some(vec![1, 2, 3])
        );
        assert_eq!(cache.get("https://cdn/missing.png").await.unwrap(), None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_over_budget_insert_evicts_older() {
        let (cache, clock) = setup(1000);
        cache.put("a", vec![0; 600]).await.unwrap();
        clock.set(1);
        let evicted = cache.put("b", vec![0; 600]).await.unwrap();

        assert_eq!(evicted, 1);
        assert_eq!(cache.get("a").await.unwrap(), None);
        assert!(cache.get("b").await.unwrap().is_some());
        assert_eq!(cache.total_bytes().await.unwrap(), 600);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[tokio::test]
    async fn test_hit_refreshes_lru_position() {
        let (cache, clock) = setup(1000);
        cache.put("stale", vec![0; 300]).await.unwrap();
        cache.put("viewed", vec![0; 300]).await.unwrap();

        clock.set(10);
        assert!(cache.get("viewed").await.unwrap().is_some());
        cache.flush().await;

        clock.set(20);
        cache.put("incoming", vec![0; 500]).await.unwrap();

        assert!(cache.get("viewed").await.unwrap().is_some());
        assert!(cache.get("stale").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_image_rejected() {
        let (cache, _) = setup(100);
        let result = cache.put("huge", vec![0; 101]).await;

        assert!(matches!(result, Err(CacheError::ImageTooLarge { .. })));
        assert_eq!(cache.total_bytes().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_enforce_budget_without_insert() {
        let (small, clock) = setup(10_000);
        small.put("a", vec![0; 600]).await.unwrap();
        clock.set(1);
        small.put("b", vec![0; 600]).await.unwrap();

        // Same store, tighter ceiling
        let tight = ImageCache::new(small.store.clone(), 1000);
        assert_eq!(tight.enforce_budget().await.unwrap(), 1);
        let remaining: Vec<_> = tight
            .entries()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.url)
            .collect();
        assert_eq!(remaining, ["b"]);
    }
}
