//! Per-business entitlement cache with single-flight loading.
//!
//! Each business id owns an async slot. The first caller to find the
//! slot empty or stale loads while holding the slot lock; concurrent
//! callers for the same business wait on that lock and then read the
//! fresh value instead of issuing their own backing reads. Failed loads
//! are not cached and drop their slot.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reservo_core::error::ReservoResult;
use tokio::sync::Mutex;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::MAX_ENTITLEMENT_CACHE_TTL_SECS;

/// Resource codes a business may use.
pub type EntitledResources = Arc<BTreeSet<String>>;

struct Entry {
    resources: EntitledResources,
    loaded_at: Instant,
}

type Slot = Arc<Mutex<Option<Entry>>>;

pub struct EntitlementCache {
    ttl: Duration,
    slots: DashMap<Uuid, Slot>,
}

impl EntitlementCache {
    /// `ttl` is clamped to the 60 second ceiling.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl: ttl.min(Duration::from_secs(MAX_ENTITLEMENT_CACHE_TTL_SECS)),
            slots: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the cached set for `business_id`, loading it with `load`
    /// when absent or older than the TTL.
    pub async fn get_or_load<F, Fut>(&self, business_id: Uuid, load: F) -> ReservoResult<EntitledResources>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ReservoResult<BTreeSet<String>>>,
    {
        // Clone the slot out so no shard lock is held across an await.
        let slot = self.slots.entry(business_id).or_default().clone();
        let mut entry = slot.lock().await;

        if let Some(cached) = entry.as_ref()
            && cached.loaded_at.elapsed() < self.ttl
        {
            return Ok(Arc::clone(&cached.resources));
        }

        let resources = match load().await {
            Ok(resources) => Arc::new(resources),
            Err(e) => {
                // Ids that fail to load keep no slot.
                *entry = None;
                drop(entry);
                self.slots
                    .remove_if(&business_id, |_, current| Arc::ptr_eq(current, &slot));
                return Err(e);
            }
        };
        *entry = Some(Entry {
            resources: Arc::clone(&resources),
            loaded_at: Instant::now(),
        });
        Ok(resources)
    }

    /// Drop the entry for one business. A load already in flight
    /// finishes into the detached slot and is never served.
    pub fn invalidate(&self, business_id: Uuid) {
        self.slots.remove(&business_id);
    }

    pub fn invalidate_many(&self, business_ids: impl IntoIterator<Item = Uuid>) {
        for id in business_ids {
            self.slots.remove(&id);
        }
    }

    pub fn clear(&self) {
        self.slots.clear();
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reservo_core::error::ReservoError;

    use super::*;

    fn set(codes: &[&str]) -> BTreeSet<String> {
        codes.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn concurrent_misses_share_one_load() {
        let cache = EntitlementCache::new(Duration::from_secs(30));
        let counter = AtomicUsize::new(0);
        let loads = &counter;
        let business = Uuid::new_v4();

        let load = move || async move {
            loads.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(set(&["reservations"]))
        };

        let (a, b, c) = tokio::join!(
            cache.get_or_load(business, load),
            cache.get_or_load(business, load),
            cache.get_or_load(business, load),
        );

        assert_eq!(counter.load(Ordering::SeqCst), 1);
        for result in [a, b, c] {
            assert!(result.unwrap().contains("reservations"));
        }
    }

    #[tokio::test]
    async fn stale_entries_reload_after_ttl() {
        let cache = EntitlementCache::new(Duration::from_millis(20));
        let business = Uuid::new_v4();

        cache
            .get_or_load(business, || async { Ok(set(&["tables"])) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        let fresh = cache
            .get_or_load(business, || async { Ok(set(&["rooms"])) })
            .await
            .unwrap();
        assert!(fresh.contains("rooms"));
    }

    #[tokio::test]
    async fn errors_are_not_cached() {
        let cache = EntitlementCache::new(Duration::from_secs(30));
        let business = Uuid::new_v4();

        let failed = cache
            .get_or_load(business, || async {
                Err(ReservoError::unavailable("store down"))
            })
            .await;
        assert!(failed.is_err());

        let ok = cache
            .get_or_load(business, || async { Ok(set(&["tables"])) })
            .await
            .unwrap();
        assert!(ok.contains("tables"));
    }

    #[tokio::test]
    async fn failed_lookups_leave_no_slots() {
        let cache = EntitlementCache::new(Duration::from_secs(30));

        for _ in 0..100 {
            let result = cache
                .get_or_load(Uuid::new_v4(), || async {
                    Err(ReservoError::not_found("business", "missing"))
                })
                .await;
            assert!(result.is_err());
        }
        assert!(cache.is_empty());

        // A failed reload of a stale entry drops it as well.
        let cache = EntitlementCache::new(Duration::from_millis(10));
        let business = Uuid::new_v4();
        cache
            .get_or_load(business, || async { Ok(set(&["tables"])) })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = cache
            .get_or_load(business, || async {
                Err(ReservoError::not_found("business", "deleted"))
            })
            .await;
        assert!(result.is_err());
        assert_eq!(cache.len(), 0);
    }

    #[tokio::test]
    async fn invalidation_forces_reload() {
        let cache = EntitlementCache::new(Duration::from_secs(30));
        let business = Uuid::new_v4();

        cache
            .get_or_load(business, || async { Ok(set(&["tables"])) })
            .await
            .unwrap();
        cache.invalidate(business);
        assert!(cache.is_empty());

        let fresh = cache
            .get_or_load(business, || async { Ok(set(&["reservations"])) })
            .await
            .unwrap();
        assert!(fresh.contains("reservations"));
    }

    #[test]
    fn ttl_is_clamped() {
        let cache = EntitlementCache::new(Duration::from_secs(600));
        assert_eq!(cache.ttl(), Duration::from_secs(60));
    }
}
