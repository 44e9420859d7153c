/// Orchestration of fetch → parse → decode behind the freshness cache.
///
/// `RainfallService` is what the HTTP layer talks to. It owns the page
/// source, the province directory and the single cache entry.
///
/// The cache lock is held while a refresh runs, so a fetch that never
/// returns would stall every caller. `refresh_timeout` bounds it.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::cache::{FreshnessCache, Snapshot};
use crate::config::AppConfig;
use crate::ingest::chg::{self, ChgPageSource};
use crate::ingest::decode::{self, DecodeSummary};
use crate::ingest::PageSource;
use crate::logging;
use crate::model::{RainfallError, Reading};
use crate::provinces::ProvinceDirectory;

pub struct RainfallService {
    source: Arc<dyn PageSource>,
    directory: ProvinceDirectory,
    cache: FreshnessCache,
    refresh_timeout: Option<std::time::Duration>,
}

impl RainfallService {
    pub fn new(source: Arc<dyn PageSource>, directory: ProvinceDirectory, validity: chrono::Duration) -> Self {
        RainfallService {
            source,
            directory,
            cache: FreshnessCache::new(validity),
            refresh_timeout: None,
        }
    }

    /// Fails a page fetch that has not completed within `limit`.
    pub fn with_refresh_timeout(mut self, limit: std::time::Duration) -> Self {
        self.refresh_timeout = Some(limit);
        self
    }

    /// Live service against the configured CHG page.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, RainfallError> {
        let source = ChgPageSource::from_config(&cfg.source)?;
        let directory = ProvinceDirectory::from_registry().with_overrides(&cfg.provinces)?;
        let service = Self::new(Arc::new(source), directory, cfg.cache_validity());
        Ok(match cfg.fetch_timeout() {
            Some(limit) => service.with_refresh_timeout(limit),
            None => service,
        })
    }

    pub fn directory(&self) -> &ProvinceDirectory {
        &self.directory
    }

    pub fn cache(&self) -> &FreshnessCache {
        &self.cache
    }

    /// Fetches, parses and decodes the page once, bypassing the cache.
    pub async fn fetch_readings(&self) -> Result<(Vec<Reading>, DecodeSummary), RainfallError> {
        let markup = match self.refresh_timeout {
            Some(limit) => tokio::time::timeout(limit, self.source.fetch_page())
                .await
                .map_err(|_| {
                    RainfallError::Transport(format!(
                        "{} page fetch did not complete within {:?}",
                        self.source.name(),
                        limit
                    ))
                })??,
            None => self.source.fetch_page().await?,
        };
        let rows = chg::parse_rain_table(&markup)?;
        Ok(decode::decode_rows(&rows, &self.directory))
    }

    /// Readings as of `now`: cached while fresh, refreshed otherwise.
    pub async fn readings_at(&self, now: DateTime<Utc>) -> Result<Snapshot, RainfallError> {
        let result = self
            .cache
            .get_or_refresh(now, || async {
                let (readings, summary) = self.fetch_readings().await?;
                logging::log_decode_summary(self.source.name(), &summary);
                Ok(readings)
            })
            .await;

        if let Err(e) = &result {
            logging::log_refresh_failure(self.source.name(), "refresh readings", e);
        }
        result
    }

    /// Convenience wrapper that uses the real current time.
    /// Use `readings_at` in tests to keep them deterministic.
    pub async fn readings(&self) -> Result<Snapshot, RainfallError> {
        self.readings_at(Utc::now()).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
