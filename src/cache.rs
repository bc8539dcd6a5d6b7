// src/cache.rs
//! # TTL cache
//! Process-local, age-bounded key/value store for district averages.
//!
//! Entries are never served once `now - stored_at >= ttl`. Expired entries
//! stay in the map until [`TtlCache::sweep`] removes them; the binary runs
//! the sweep on a fixed interval via [`spawn_sweeper`].

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use metrics::counter;
use tokio::task::JoinHandle;

/// Time source, injectable so tests can move time forward.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually advanced clock for tests and simulations.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(step) = chrono::Duration::from_std(by) {
            let mut g = self.now.lock().unwrap_or_else(|p| p.into_inner());
            *g += step;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn age(&self, now: DateTime<Utc>, stored_at: DateTime<Utc>) -> Duration {
        (now - stored_at).to_std().unwrap_or(Duration::ZERO)
    }

    /// Stored value while younger than the ttl. Expired entries are left in place.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.clock.now();
        let map = self.lock();
        let entry = map.get(key)?;
        (self.age(now, entry.stored_at) < self.ttl).then(|| entry.value.clone())
    }

    /// Unconditional overwrite. Returns the timestamp recorded for the entry.
    pub fn set(&self, key: K, value: V) -> DateTime<Utc> {
        let stored_at = self.clock.now();
        self.lock().insert(key, Entry { value, stored_at });
        stored_at
    }

    /// Drop every entry older than the ttl. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, e| self.age(now, e.stored_at) <= self.ttl);
        before - map.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Sweep `cache` every `every` for as long as the runtime lives.
/// The first sweep happens one full interval after start.
pub fn spawn_sweeper<K, V>(cache: Arc<TtlCache<K, V>>, every: Duration) -> JoinHandle<()>
where
    K: Eq + Hash + Send + 'static,
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.sweep();
            counter!("district_cache_entries_swept_total").increment(removed as u64);
            tracing::info!(removed, remaining = cache.len(), "cache sweep");
        }
    })
}
