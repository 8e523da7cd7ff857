//! Statistic provider that caches counts and refreshes them periodically.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use relplan_core::trace::emit_event;

use crate::container::DataContainer;
use crate::error::Result;
use crate::provider::StatisticProvider;

/// Cache key: the container's name plus the address of the container object,
/// so a container re-registered under the same name starts a fresh entry.
type CacheKey = (String, usize);

fn cache_key(container: &dyn DataContainer) -> CacheKey {
    let ptr: *const (dyn DataContainer + '_) = container;
    (container.name().to_string(), ptr.cast::<()>() as usize)
}

/// Wraps another provider; each container's count is re-read at most once
/// per `refresh` interval. Errors are never cached.
pub struct CachingStatisticProvider<P> {
    inner: P,
    refresh: Duration,
    entries: RwLock<HashMap<CacheKey, (u64, Instant)>>,
}

impl<P: StatisticProvider> CachingStatisticProvider<P> {
    pub fn new(inner: P, refresh: Duration) -> Self {
        Self {
            inner,
            refresh,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Drop every cached count.
    pub fn invalidate(&self) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    fn cached(&self, key: &CacheKey, now: Instant) -> Option<u64> {
        let guard = self.entries.read().unwrap_or_else(|e| e.into_inner());
        guard
            .get(key)
            .filter(|(_, at)| now.duration_since(*at) < self.refresh)
            .map(|(rows, _)| *rows)
    }
}

impl<P: StatisticProvider> StatisticProvider for CachingStatisticProvider<P> {
    fn row_count(&self, container: &dyn DataContainer) -> Result<u64> {
        let now = Instant::now();
        let key = cache_key(container);
        if let Some(rows) = self.cached(&key, now) {
            return Ok(rows);
        }
        let rows = self.inner.row_count(container)?;
        emit_event(
            "stats.refresh",
            &[
                ("container", container.name().to_string()),
                ("rows", rows.to_string()),
            ],
        );
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, (rows, now));
        Ok(rows)
    }
}
