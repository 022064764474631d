//! In-memory time-series cache in front of a data provider.
//!
//! Rows are keyed by (symbol, interval) and upserted by timestamp. A request
//! is served from memory when the recorded coverage already spans it, within
//! a tolerance; otherwise the provider is asked for the full range.

use crate::types::{SeriesInterval, Timestamped};
use dashmap::DashMap;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

/// Series cache errors.
#[derive(Debug, Error, PartialEq)]
pub enum CacheError {
    #[error("Invalid range: start {start} is after end {end}")]
    InvalidRange { start: i64, end: i64 },

    #[error("Provider error: {0}")]
    Provider(String),
}

/// Source of historical points for a symbol.
pub trait PointProvider<T>: Send + Sync {
    /// Load every point in `[start_ms, end_ms]`.
    fn load_points(
        &self,
        symbol: &str,
        interval: SeriesInterval,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<T>, CacheError>;
}

/// Outcome of [`SeriesCache::ensure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheReport {
    /// Whether the provider was called
    pub fetched: bool,
    /// Rows now cached inside the requested range
    pub row_count: usize,
}

#[derive(Debug)]
struct CachedSeries<T> {
    rows: BTreeMap<i64, T>,
    coverage: Option<(i64, i64)>,
}

impl<T> Default for CachedSeries<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            coverage: None,
        }
    }
}

impl<T> CachedSeries<T> {
    fn covers(&self, start: i64, end: i64, tolerance_ms: i64) -> bool {
        match self.coverage {
            Some((from, to)) => {
                from <= start.saturating_add(tolerance_ms) && to >= end.saturating_sub(tolerance_ms)
            }
            None => false,
        }
    }

    fn count(&self, start: i64, end: i64) -> usize {
        self.rows.range(start..=end).count()
    }
}

type SeriesKey = (String, SeriesInterval);

/// Thread-safe cache of provider series.
pub struct SeriesCache<T, P> {
    provider: P,
    series: DashMap<SeriesKey, CachedSeries<T>>,
}

impl<T, P> SeriesCache<T, P>
where
    T: Timestamped + Clone,
    P: PointProvider<T>,
{
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            series: DashMap::new(),
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Make sure `[start, end]` is cached, fetching only when coverage falls
    /// short by more than `tolerance_ms` at either end.
    pub fn ensure(
        &self,
        symbol: &str,
        interval: SeriesInterval,
        start: i64,
        end: i64,
        tolerance_ms: i64,
    ) -> Result<CacheReport, CacheError> {
        if start > end {
            return Err(CacheError::InvalidRange { start, end });
        }
        let key = (symbol.to_string(), interval);
        let tolerance_ms = tolerance_ms.max(0);

        if let Some(cached) = self.series.get(&key) {
            if cached.covers(start, end, tolerance_ms) {
                return Ok(CacheReport {
                    fetched: false,
                    row_count: cached.count(start, end),
                });
            }
        }

        // No map guard is held while the provider runs
        let points = self.provider.load_points(symbol, interval, start, end)?;
        debug!(
            "Fetched {} {} points for {} [{}, {}]",
            points.len(),
            interval,
            symbol,
            start,
            end
        );

        let mut cached = self.series.entry(key).or_default();
        for point in points {
            cached.rows.insert(point.time_ms(), point);
        }
        let coverage = match cached.coverage {
            Some((from, to))
                if start <= to.saturating_add(tolerance_ms)
                    && end >= from.saturating_sub(tolerance_ms) =>
            {
                (from.min(start), to.max(end))
            }
            _ => (start, end),
        };
        cached.coverage = Some(coverage);

        Ok(CacheReport {
            fetched: true,
            row_count: cached.count(start, end),
        })
    }

    /// Cached rows in `[start, end]`, sorted by time.
    pub fn points(&self, symbol: &str, interval: SeriesInterval, start: i64, end: i64) -> Vec<T> {
        if start > end {
            return Vec::new();
        }
        self.series
            .get(&(symbol.to_string(), interval))
            .map(|cached| cached.rows.range(start..=end).map(|(_, p)| p.clone()).collect())
            .unwrap_or_default()
    }

    /// Drop everything cached for a symbol and interval.
    pub fn invalidate(&self, symbol: &str, interval: SeriesInterval) {
        self.series.remove(&(symbol.to_string(), interval));
    }

    /// Number of cached series.
    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}
