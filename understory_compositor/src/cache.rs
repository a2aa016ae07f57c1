// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded cache for rendered or rescaled images.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

use crate::raster::Raster;

/// A least-recently-used cache of rasters with a fixed capacity.
///
/// Meant for images derived from parameters that rarely change, for example
/// a sprite sheet frame rescaled to the current window size, or a background
/// rendered for one target size. When full, inserting evicts the entry that
/// was used least recently.
///
/// ```
/// use understory_compositor::{Raster, ScaleCache};
/// use understory_damage::PixelSize;
///
/// let mut cache = ScaleCache::new(2);
/// let a = cache.get_or_insert_with(PixelSize::new(4, 4), || Raster::new(PixelSize::new(4, 4)));
/// let b = cache.get_or_insert_with(PixelSize::new(4, 4), || unreachable!());
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// ```
pub struct ScaleCache<K: Hash + Eq> {
    entries: LruCache<K, Arc<Raster>>,
}

impl<K: Hash + Eq> ScaleCache<K> {
    /// Creates an empty cache holding at most `capacity` entries (at least 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Maximum number of entries.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns `true` if `key` is cached. Does not count as a use.
    #[must_use]
    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains(key)
    }

    /// Looks up `key`, marking it as recently used.
    pub fn get(&mut self, key: &K) -> Option<Arc<Raster>> {
        self.entries.get(key).map(Arc::clone)
    }

    /// Looks up `key`, producing and caching the value on a miss.
    pub fn get_or_insert_with(&mut self, key: K, make: impl FnOnce() -> Raster) -> Arc<Raster> {
        Arc::clone(self.entries.get_or_insert(key, || Arc::new(make())))
    }

    /// Inserts or replaces an entry, evicting the least recently used one if
    /// the cache is full.
    pub fn insert(&mut self, key: K, raster: Arc<Raster>) {
        self.entries.put(key, raster);
    }

    /// Removes every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Hash + Eq> fmt::Debug for ScaleCache<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScaleCache")
            .field("capacity", &self.entries.cap())
            .field("len", &self.entries.len())
            .finish_non_exhaustive()
    }
}
