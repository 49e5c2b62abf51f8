//! In-memory cache of computed assessments.
//!
//! Entries expire after a TTL and the map is bounded: inserts and the periodic
//! sweep both evict the least-recently-calculated entries above the cap. A
//! poisoned lock never fails a scoring request; lookups degrade to recomputing.

mod clock;
mod key;

pub use clock::{Clock, ManualClock, SystemClock};
pub use key::{responses_digest, CacheKey};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::scoring::AssessmentResult;

/// Sizing for [`ScoreCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSettings {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    assessment: AssessmentResult,
    last_calculated: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CacheEntry>,
    latest_stamp: Option<DateTime<Utc>>,
}

/// Whether a lookup was answered from memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Hit,
    Miss,
}

#[derive(Debug, Clone)]
pub struct CacheLookup {
    pub assessment: AssessmentResult,
    pub status: CacheStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub expired: usize,
    pub evicted: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
}

pub struct ScoreCache {
    settings: CacheSettings,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<CacheState>,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    expirations: AtomicU64,
}

impl ScoreCache {
    pub fn new(settings: CacheSettings) -> Self {
        Self::with_clock(settings, Arc::new(SystemClock))
    }

    pub fn with_clock(settings: CacheSettings, clock: Arc<dyn Clock>) -> Self {
        // TTLs beyond chrono's range clamp to a year.
        let ttl = chrono::Duration::from_std(settings.ttl)
            .unwrap_or_else(|_| chrono::Duration::days(365));

        Self {
            settings,
            ttl,
            clock,
            state: Mutex::new(CacheState::default()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
        }
    }

    pub fn settings(&self) -> CacheSettings {
        self.settings
    }

    /// Return the live entry for `key`, or run `compute` and store its result.
    ///
    /// `compute` runs without the cache lock held. Concurrent misses on one key
    /// may both compute; the later insert wins. The stored and returned
    /// assessment carry the insert stamp as `calculated_at`.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> CacheLookup
    where
        F: FnOnce() -> AssessmentResult,
    {
        let now = self.clock.now();

        match self.lock() {
            Some(state) => {
                if let Some(entry) = state.entries.get(&key) {
                    if entry.expires_at > now {
                        self.hits.fetch_add(1, Ordering::Relaxed);
                        return CacheLookup {
                            assessment: entry.assessment.clone(),
                            status: CacheStatus::Hit,
                        };
                    }
                }
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                return CacheLookup {
                    assessment: compute(),
                    status: CacheStatus::Miss,
                };
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let mut assessment = compute();

        let Some(mut state) = self.lock() else {
            return CacheLookup {
                assessment,
                status: CacheStatus::Miss,
            };
        };

        let now = self.clock.now();
        let stamp = state.latest_stamp.map_or(now, |latest| latest.max(now));
        state.latest_stamp = Some(stamp);
        assessment.calculated_at = stamp;

        state.entries.insert(
            key.clone(),
            CacheEntry {
                assessment: assessment.clone(),
                last_calculated: stamp,
                expires_at: stamp + self.ttl,
            },
        );

        let evicted = evict_over_capacity(&mut state.entries, self.settings.max_entries, &key);
        drop(state);

        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
        }

        CacheLookup {
            assessment,
            status: CacheStatus::Miss,
        }
    }

    /// Remove expired entries, then trim to capacity.
    ///
    /// Victims are chosen from a snapshot taken under a short lock. The second
    /// lock only removes them, skipping any entry recalculated in between.
    pub fn sweep(&self) -> SweepReport {
        let now = self.clock.now();

        let Some(state) = self.lock() else {
            return SweepReport::default();
        };
        let snapshot: Vec<(CacheKey, DateTime<Utc>, DateTime<Utc>)> = state
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_calculated, entry.expires_at))
            .collect();
        drop(state);

        let (expired, mut live): (Vec<_>, Vec<_>) = snapshot
            .into_iter()
            .partition(|(_, _, expires_at)| *expires_at <= now);

        let overflow = live.len().saturating_sub(self.settings.max_entries);
        live.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        let victims: Vec<_> = live.into_iter().take(overflow).collect();

        let Some(mut state) = self.lock() else {
            return SweepReport::default();
        };
        let mut report = SweepReport::default();
        for (key, stamp, _) in expired {
            if remove_if_unchanged(&mut state.entries, &key, stamp) {
                report.expired += 1;
            }
        }
        for (key, stamp, _) in victims {
            if remove_if_unchanged(&mut state.entries, &key, stamp) {
                report.evicted += 1;
            }
        }
        drop(state);

        self.expirations
            .fetch_add(report.expired as u64, Ordering::Relaxed);
        self.evictions
            .fetch_add(report.evicted as u64, Ordering::Relaxed);

        report
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        match self.lock() {
            Some(mut state) => {
                let removed = state.entries.len();
                state.entries.clear();
                removed
            }
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock()
            .map(|state| state.entries.contains_key(key))
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            max_entries: self.settings.max_entries,
            ttl_secs: self.settings.ttl.as_secs(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }

    /// Run [`ScoreCache::sweep`] every `interval` on the current tokio runtime.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        let period = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let report = cache.sweep();
                if report.expired > 0 || report.evicted > 0 {
                    debug!(
                        expired = report.expired,
                        evicted = report.evicted,
                        remaining = cache.len(),
                        "score cache swept"
                    );
                }
            }
        })
    }

    fn lock(&self) -> Option<MutexGuard<'_, CacheState>> {
        match self.state.lock() {
            Ok(guard) => Some(guard),
            Err(_) => {
                warn!("score cache lock poisoned; recomputing without cache");
                None
            }
        }
    }
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("settings", &self.settings)
            .field("entries", &self.len())
            .finish()
    }
}

fn evict_over_capacity(
    entries: &mut HashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    keep: &CacheKey,
) -> usize {
    let overflow = entries.len().saturating_sub(max_entries);
    if overflow == 0 {
        return 0;
    }

    let mut candidates: Vec<(DateTime<Utc>, CacheKey)> = entries
        .iter()
        .filter(|(key, _)| *key != keep)
        .map(|(key, entry)| (entry.last_calculated, key.clone()))
        .collect();
    candidates.sort();

    let mut evicted = 0;
    for (_, key) in candidates.into_iter().take(overflow) {
        entries.remove(&key);
        evicted += 1;
    }
    evicted
}

fn remove_if_unchanged(
    entries: &mut HashMap<CacheKey, CacheEntry>,
    key: &CacheKey,
    stamp: DateTime<Utc>,
) -> bool {
    match entries.get(key) {
        Some(entry) if entry.last_calculated == stamp => {
            entries.remove(key);
            true
        }
        _ => false,
    }
}
