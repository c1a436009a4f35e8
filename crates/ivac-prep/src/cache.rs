//! Cache of the most recent successful load and clean.
//!
//! The cache holds a single entry keyed by a [`SourceFingerprint`]. A reload
//! only replaces the entry once loading and cleaning have both succeeded, so a
//! failed refresh leaves the last good result in place.

use crate::cleaner::{CleanedTable, clean};
use crate::error::{IvacError, Result};
use crate::loader::{self, SourceLocation};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use polars::prelude::DataFrame;
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info};

/// Identity of a source at a point in time.
///
/// Local files are identified by path, length and modification time; URLs by
/// the URL alone, so remote sources are only refreshed by [`SourceCache::invalidate`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFingerprint {
    pub location: SourceLocation,
    pub len: Option<u64>,
    pub modified: Option<SystemTime>,
}

impl SourceFingerprint {
    /// Fingerprint the current state of a source.
    pub fn of(location: &SourceLocation) -> Result<Self> {
        match location {
            SourceLocation::Path(path) => {
                let metadata = std::fs::metadata(path).map_err(|_| IvacError::SourceNotFound {
                    path: path.display().to_string(),
                })?;
                Ok(Self {
                    location: location.clone(),
                    len: Some(metadata.len()),
                    modified: metadata.modified().ok(),
                })
            }
            SourceLocation::Url(_) => Ok(Self {
                location: location.clone(),
                len: None,
                modified: None,
            }),
        }
    }
}

/// A loaded raw table and its cleaned form.
#[derive(Debug, Clone)]
pub struct CachedSource {
    pub fingerprint: SourceFingerprint,
    pub raw: DataFrame,
    pub cleaned: CleanedTable,
    pub loaded_at: DateTime<Utc>,
}

/// Single-entry, swap-on-success cache shared between callers.
#[derive(Debug, Default)]
pub struct SourceCache {
    entry: RwLock<Option<Arc<CachedSource>>>,
}

impl SourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached entry for `location`, loading and cleaning it on a miss.
    pub fn get_or_load(&self, location: &SourceLocation) -> Result<Arc<CachedSource>> {
        let fingerprint = SourceFingerprint::of(location)?;
        self.get_or_insert_with(fingerprint, || loader::load(location))
    }

    /// Return the entry matching `fingerprint`, or build one from `load`.
    ///
    /// On failure the previous entry is kept and the error is returned.
    pub fn get_or_insert_with<F>(
        &self,
        fingerprint: SourceFingerprint,
        load: F,
    ) -> Result<Arc<CachedSource>>
    where
        F: FnOnce() -> Result<DataFrame>,
    {
        if let Some(hit) = self.lookup(&fingerprint) {
            debug!("Cache hit for {}", fingerprint.location);
            return Ok(hit);
        }

        debug!("Cache miss for {}", fingerprint.location);
        let raw = load()?;
        let cleaned = clean(&raw)?;

        let entry = Arc::new(CachedSource {
            fingerprint,
            raw,
            cleaned,
            loaded_at: Utc::now(),
        });
        *self.entry.write() = Some(Arc::clone(&entry));
        info!("Cached {} at {}", entry.fingerprint.location, entry.loaded_at);

        Ok(entry)
    }

    /// Current entry, whatever its fingerprint.
    pub fn current(&self) -> Option<Arc<CachedSource>> {
        self.entry.read().clone()
    }

    /// Drop the cached entry.
    pub fn invalidate(&self) {
        *self.entry.write() = None;
        debug!("Source cache invalidated");
    }

    fn lookup(&self, fingerprint: &SourceFingerprint) -> Option<Arc<CachedSource>> {
        self.entry
            .read()
            .as_ref()
            .filter(|entry| entry.fingerprint == *fingerprint)
            .cloned()
    }
}

static_assertions::assert_impl_all!(SourceCache: Send, Sync);
