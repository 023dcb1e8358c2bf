//! Per-table cache of spatial catalog rows
//!
//! Looking up `geometry_columns` / `geography_columns` is the expensive part
//! of reflecting a table, so the rows are fetched once per table and kept
//! until they are explicitly evicted. There is no expiry: entries only go
//! away through [`SpatialInfoCache::evict`] or [`SpatialInfoCache::clear`].

use crate::adapter::SpatialColumnRow;
use pgspatial_core::TableIdentifier;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

/// Spatial rows of one table, keyed by column name
pub type SpatialRows = Arc<HashMap<String, SpatialColumnRow>>;

/// Hit/miss counters and current size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Spatial catalog cache
///
/// ## Usage
///
/// ```rust,ignore
/// let cache = SpatialInfoCache::new();
///
/// if cache.get(&table).is_none() {
///     let rows = adapter.fetch_spatial_columns(&table).await?;
///     cache.insert(&table, rows);
/// }
/// ```
#[derive(Default)]
pub struct SpatialInfoCache {
    /// Rows by table FQN
    cache: RwLock<HashMap<String, SpatialRows>>,

    hits: AtomicU64,

    misses: AtomicU64,
}

impl SpatialInfoCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the rows for a table, replacing any previous entry
    pub fn insert(&self, table: &TableIdentifier, rows: Vec<SpatialColumnRow>) -> SpatialRows {
        let rows: SpatialRows = Arc::new(
            rows.into_iter()
                .map(|row| (row.column.clone(), row))
                .collect(),
        );

        if let Ok(mut cache) = self.cache.write() {
            cache.insert(table.fqn(), Arc::clone(&rows));
        }
        tracing::debug!(table = %table, columns = rows.len(), "cached spatial column info");
        rows
    }

    /// Cached rows for a table, if it has been fetched
    pub fn get(&self, table: &TableIdentifier) -> Option<SpatialRows> {
        let found = self
            .cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&table.fqn()).map(Arc::clone));

        match found {
            Some(_) => self.hits.fetch_add(1, Ordering::Relaxed),
            None => self.misses.fetch_add(1, Ordering::Relaxed),
        };
        found
    }

    /// Cached rows for a table, without touching the counters
    pub fn peek(&self, table: &TableIdentifier) -> Option<SpatialRows> {
        self.cache
            .read()
            .ok()
            .and_then(|cache| cache.get(&table.fqn()).map(Arc::clone))
    }

    /// Whether a table has an entry, without touching the counters
    pub fn contains(&self, table: &TableIdentifier) -> bool {
        self.peek(table).is_some()
    }

    /// Drop the entry for one table
    pub fn evict(&self, table: &TableIdentifier) {
        if let Ok(mut cache) = self.cache.write() {
            if cache.remove(&table.fqn()).is_some() {
                tracing::debug!(table = %table, "evicted spatial column info");
            }
        }
    }

    /// Drop every entry
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.write() {
            cache.clear();
        }
        tracing::debug!("cleared spatial column cache");
    }

    pub fn len(&self) -> usize {
        if let Ok(cache) = self.cache.read() {
            cache.len()
        } else {
            0
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
