//! Memoising wrapper around a [`GateMatrixSource`].

use std::sync::{Mutex, PoisonError};

use arvak_device::Precision;
use rustc_hash::FxHashMap;
use tracing::trace;

use super::matrix::GateMatrix;
use super::standard::{GateMatrixSource, StandardGates};
use crate::error::SimResult;

/// Default upper bound on cached matrices.
pub const DEFAULT_CACHE_ENTRIES: usize = 1024;

type CacheKey = (String, Vec<u64>);

/// Caches matrices by gate name and exact parameter bits.
///
/// Once `max_entries` matrices are held, further lookups are computed but no
/// longer stored.
pub struct GateCache<P: Precision, S = StandardGates> {
    source: S,
    max_entries: usize,
    entries: Mutex<FxHashMap<CacheKey, GateMatrix<P>>>,
}

impl<P: Precision> GateCache<P, StandardGates> {
    /// Cache over the standard gate set.
    pub fn standard() -> Self {
        Self::new(StandardGates, DEFAULT_CACHE_ENTRIES)
    }
}

impl<P: Precision, S: GateMatrixSource<P>> GateCache<P, S> {
    /// Wrap `source`, keeping at most `max_entries` matrices.
    pub fn new(source: S, max_entries: usize) -> Self {
        Self {
            source,
            max_entries,
            entries: Mutex::new(FxHashMap::default()),
        }
    }

    /// Number of cached matrices.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached matrix.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl<P: Precision, S: GateMatrixSource<P>> GateMatrixSource<P> for GateCache<P, S> {
    fn matrix(&self, name: &str, params: &[P]) -> SimResult<GateMatrix<P>> {
        let key: CacheKey = (
            name.to_string(),
            params.iter().map(|p| p.into_f64().to_bits()).collect(),
        );
        if let Some(m) = self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            trace!(gate = name, "Gate matrix cache hit");
            return Ok(m.clone());
        }

        let m = self.source.matrix(name, params)?;
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() < self.max_entries {
            entries.insert(key, m.clone());
        }
        Ok(m)
    }
}
