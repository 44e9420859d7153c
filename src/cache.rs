/// Time-bounded cache for the most recent set of readings.
///
/// The CHG page is fetched at most once per validity window. One entry exists
/// process-wide; it is replaced wholesale after every successful refresh and
/// left untouched when a refresh fails.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so freshness is deterministic in tests.
///
/// # Concurrency
/// The entry lock is held across the refresh. Requests arriving while a
/// refresh is in flight wait for it and are then served the new entry, so a
/// staleness episode costs one remote fetch.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

use crate::logging::DataSource;
use crate::model::{RainfallError, Reading};

// ---------------------------------------------------------------------------
// Freshness check
// ---------------------------------------------------------------------------

/// Returns `true` while the time elapsed since `stored_at` is strictly less
/// than `validity`.
///
///   elapsed <  validity  →  fresh
///   elapsed == validity  →  stale
///
/// A `now` earlier than `stored_at` (clock stepped back) counts as fresh.
pub fn is_fresh_at(stored_at: DateTime<Utc>, validity: Duration, now: DateTime<Utc>) -> bool {
    now.signed_duration_since(stored_at) < validity
}

// ---------------------------------------------------------------------------
// Cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct CacheEntry {
    stored_at: DateTime<Utc>,
    readings: Arc<[Reading]>,
}

/// Whether a snapshot came from the stored entry or a fresh refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheStatus::Hit => "HIT",
            CacheStatus::Miss => "MISS",
        }
    }
}

/// Readings handed back by the cache.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub readings: Arc<[Reading]>,
    /// When the readings were fetched.
    pub fetched_at: DateTime<Utc>,
    pub status: CacheStatus,
}

pub struct FreshnessCache {
    validity: Duration,
    entry: Mutex<Option<CacheEntry>>,
}

impl FreshnessCache {
    /// An empty cache. Nothing is fetched until the first request.
    pub fn new(validity: Duration) -> Self {
        FreshnessCache {
            validity,
            entry: Mutex::new(None),
        }
    }

    pub fn validity(&self) -> Duration {
        self.validity
    }

    /// Timestamp of the stored entry, if any.
    pub async fn stored_at(&self) -> Option<DateTime<Utc>> {
        self.entry.lock().await.as_ref().map(|e| e.stored_at)
    }

    /// Returns the stored readings if still fresh at `now`, otherwise runs
    /// `refresh` and stores its result stamped with `now`.
    ///
    /// A failed refresh is propagated and the previous entry, stale or not,
    /// stays in place.
    pub async fn get_or_refresh<F, Fut>(&self, now: DateTime<Utc>, refresh: F) -> Result<Snapshot, RainfallError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Reading>, RainfallError>>,
    {
        let mut guard = self.entry.lock().await;

        if let Some(entry) = guard.as_ref() {
            if is_fresh_at(entry.stored_at, self.validity, now) {
                return Ok(Snapshot {
                    readings: Arc::clone(&entry.readings),
                    fetched_at: entry.stored_at,
                    status: CacheStatus::Hit,
                });
            }
            tracing::debug!(
                source = %DataSource::Cache,
                stored_at = %entry.stored_at,
                "cached readings are stale, refreshing"
            );
        }

        let readings: Arc<[Reading]> = refresh().await?.into();
        *guard = Some(CacheEntry {
            stored_at: now,
            readings: Arc::clone(&readings),
        });

        Ok(Snapshot {
            readings,
            fetched_at: now,
            status: CacheStatus::Miss,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Gauge, Province};
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reading(code: &str) -> Reading {
        Reading {
            gauge: Gauge {
                code: code.to_string(),
                name: "TEST".to_string(),
            },
            province: Province::fallback(),
            current_hour: "0".to_string(),
            last_12_hours: "0".to_string(),
            today_accumulated: "0".to_string(),
            yesterday_accumulated: "0".to_string(),
            unit: "mm".to_string(),
            location: None,
        }
    }

    /// A fixed "now" used across all tests: 2024-05-01 13:00:00 UTC.
    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap()
    }

    fn window() -> Duration {
        Duration::minutes(10)
    }

    // --- Freshness predicate ------------------------------------------------

    #[test]
    fn test_one_ms_before_window_is_fresh() {
        let t = fixed_now();
        assert!(is_fresh_at(t, window(), t + window() - Duration::milliseconds(1)));
    }

    #[test]
    fn test_exactly_at_window_is_stale() {
        let t = fixed_now();
        assert!(!is_fresh_at(t, window(), t + window()));
    }

    #[test]
    fn test_one_ms_after_window_is_stale() {
        let t = fixed_now();
        assert!(!is_fresh_at(t, window(), t + window() + Duration::milliseconds(1)));
    }

    #[test]
    fn test_hours_old_entry_is_stale() {
        // Comparing against "now + window" would call this fresh.
        let t = fixed_now();
        assert!(!is_fresh_at(t - Duration::hours(4), window(), t));
    }

    #[test]
    fn test_clock_stepping_back_counts_as_fresh() {
        let t = fixed_now();
        assert!(is_fresh_at(t, window(), t - Duration::seconds(30)));
    }

    // --- get_or_refresh -----------------------------------------------------

    #[tokio::test]
    async fn test_empty_cache_refreshes_and_stores() {
        let cache = FreshnessCache::new(window());
        assert!(cache.stored_at().await.is_none());

        let snap = cache
            .get_or_refresh(fixed_now(), || async { Ok(vec![reading("A01")]) })
            .await
            .unwrap();
        assert_eq!(snap.status, CacheStatus::Miss);
        assert_eq!(snap.fetched_at, fixed_now());
        assert_eq!(snap.readings.len(), 1);
        assert_eq!(cache.stored_at().await, Some(fixed_now()));
    }

    #[tokio::test]
    async fn test_fresh_entry_is_reused_without_refresh() {
        let cache = FreshnessCache::new(window());
        let calls = AtomicUsize::new(0);
        let t = fixed_now();

        for now in [t, t + window() - Duration::milliseconds(1)] {
            cache
                .get_or_refresh(now, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(vec![reading("A01")])
                })
                .await
                .unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_entry_is_replaced() {
        let cache = FreshnessCache::new(window());
        let t = fixed_now();
        cache
            .get_or_refresh(t, || async { Ok(vec![reading("OLD")]) })
            .await
            .unwrap();

        let later = t + window() + Duration::milliseconds(1);
        let snap = cache
            .get_or_refresh(later, || async { Ok(vec![reading("NEW"), reading("NEW2")]) })
            .await
            .unwrap();
        assert_eq!(snap.status, CacheStatus::Miss);
        assert_eq!(snap.readings[0].gauge.code, "NEW");
        assert_eq!(snap.readings.len(), 2);
        assert_eq!(cache.stored_at().await, Some(later));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_stale_entry() {
        let cache = FreshnessCache::new(window());
        let t = fixed_now();
        cache
            .get_or_refresh(t, || async { Ok(vec![reading("OLD")]) })
            .await
            .unwrap();

        let later = t + Duration::hours(1);
        let err = cache
            .get_or_refresh(later, || async { Err(RainfallError::HttpStatus(503)) })
            .await
            .unwrap_err();
        assert_eq!(err, RainfallError::HttpStatus(503));
        assert_eq!(cache.stored_at().await, Some(t), "stale entry must survive a failed refresh");

        // The next request tries again rather than caching the failure.
        let snap = cache
            .get_or_refresh(later, || async { Ok(vec![reading("NEW")]) })
            .await
            .unwrap();
        assert_eq!(snap.readings[0].gauge.code, "NEW");
    }

    #[tokio::test]
    async fn test_failed_first_refresh_leaves_cache_empty() {
        let cache = FreshnessCache::new(window());
        let res = cache
            .get_or_refresh(fixed_now(), || async { Err(RainfallError::Transport("refused".into())) })
            .await;
        assert!(res.is_err());
        assert!(cache.stored_at().await.is_none());
    }

    #[tokio::test]
    async fn test_concurrent_stale_requests_share_one_refresh() {
        let cache = Arc::new(FreshnessCache::new(window()));
        let calls = Arc::new(AtomicUsize::new(0));
        let now = fixed_now();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(now, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(vec![reading("A01")])
                    })
                    .await
                    .map(|s| s.status)
            }));
        }

        let mut misses = 0;
        for h in handles {
            if h.await.unwrap().unwrap() == CacheStatus::Miss {
                misses += 1;
            }
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(misses, 1);
    }
}
