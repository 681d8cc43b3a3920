//! Listing cache
//!
//! Memoizes children-of-prefix queries so tab completion does not hammer
//! the backend on every keystroke. Keyed by `(canonical path, fragment
//! mode)`: a complete-segment listing and a partial-name listing are
//! different queries and cached separately. No TTL; entries live until a
//! mutation invalidates them or the user asks for a refresh.

use crate::error::Result;
use crate::paths::{ListingEntry, S3Path};
use log::debug;
use std::collections::HashMap;

#[derive(Default)]
pub struct ListingCache {
    entries: HashMap<(String, bool), Vec<ListingEntry>>,
}

impl ListingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached listing for `(path, fragment)` or fetch it.
    ///
    /// Empty results are never memoized: an empty listing is often
    /// transient (eventual consistency after a write, or a prefix about to
    /// spring into existence), so those queries always re-hit the backend.
    pub fn get_or_fetch<F>(
        &mut self,
        path: &S3Path,
        fragment: bool,
        fetch: F,
    ) -> Result<Vec<ListingEntry>>
    where
        F: FnOnce() -> Result<Vec<ListingEntry>>,
    {
        let key = (path.canonical(), fragment);

        if let Some(hit) = self.entries.get(&key) {
            debug!("cache hit: {} fragment={}", key.0, fragment);
            return Ok(hit.clone());
        }

        debug!("cache miss: {} fragment={}", key.0, fragment);
        let fetched = fetch()?;

        if !fetched.is_empty() {
            self.entries.insert(key, fetched.clone());
        }

        Ok(fetched)
    }

    /// Drop cached listings for `path` and every ancestor up to the bucket
    /// root, both fragment modes.
    ///
    /// Prefixes are synthesized from key names, so deleting the last key
    /// under a prefix makes the prefix itself vanish; any cached ancestor
    /// listing may be stale after a mutation. The walk operates on its own
    /// copy of the path and stops at the fixed point where the key is
    /// exhausted.
    pub fn invalidate_prefix_chain(&mut self, path: &S3Path) {
        let mut walk = path.clone();

        loop {
            let canonical = walk.canonical();
            debug!("invalidating cached listings for {}", canonical);
            self.entries.remove(&(canonical.clone(), false));
            self.entries.remove(&(canonical, true));

            if walk.key.is_none() {
                break;
            }
            walk = walk.parent();
        }
    }

    /// Drop everything; returns how many entries were removed so the
    /// refresh command can report it.
    pub fn clear(&mut self) -> usize {
        let size = self.entries.len();
        self.entries.clear();
        size
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn entries() -> Vec<ListingEntry> {
        vec![
            ListingEntry::prefix("ash/"),
            ListingEntry::key("tric.txt", None),
        ]
    }

    #[test]
    fn test_non_empty_results_are_cached() {
        let mut cache = ListingCache::new();
        let path = S3Path::from_path("bucket/a");
        let calls = Cell::new(0);

        let fetch = || {
            calls.set(calls.get() + 1);
            Ok(entries())
        };

        assert_eq!(cache.get_or_fetch(&path, false, fetch).unwrap(), entries());
        assert_eq!(calls.get(), 1);

        // second hit comes from the cache
        let fetch = || {
            calls.set(calls.get() + 1);
            Ok(entries())
        };
        assert_eq!(cache.get_or_fetch(&path, false, fetch).unwrap(), entries());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_empty_results_are_not_cached() {
        let mut cache = ListingCache::new();
        let path = S3Path::from_path("bucket/missing");
        let calls = Cell::new(0);

        for _ in 0..2 {
            let fetch = || {
                calls.set(calls.get() + 1);
                Ok(Vec::new())
            };
            assert!(cache.get_or_fetch(&path, true, fetch).unwrap().is_empty());
        }

        assert_eq!(calls.get(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_fragment_modes_are_distinct_entries() {
        let mut cache = ListingCache::new();
        let path = S3Path::from_path("bucket/a");

        cache.get_or_fetch(&path, false, || Ok(entries())).unwrap();
        cache
            .get_or_fetch(&path, true, || Ok(vec![ListingEntry::prefix("other/")]))
            .unwrap();

        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_invalidate_prefix_chain() {
        let mut cache = ListingCache::new();
        let chain = ["bucket/a/b/c", "bucket/a/b", "bucket/a", "bucket"];

        for p in chain {
            let path = S3Path::from_path(p);
            cache.get_or_fetch(&path, false, || Ok(entries())).unwrap();
            cache.get_or_fetch(&path, true, || Ok(entries())).unwrap();
        }
        let unrelated = S3Path::from_path("other-bucket/x");
        cache
            .get_or_fetch(&unrelated, false, || Ok(entries()))
            .unwrap();

        cache.invalidate_prefix_chain(&S3Path::from_path("bucket/a/b/c"));

        // every ancestor gone, both fragment modes; the unrelated entry stays
        assert_eq!(cache.len(), 1);
        let calls = Cell::new(0);
        for p in chain {
            for fragment in [false, true] {
                let fetch = || {
                    calls.set(calls.get() + 1);
                    Ok(entries())
                };
                cache
                    .get_or_fetch(&S3Path::from_path(p), fragment, fetch)
                    .unwrap();
            }
        }
        assert_eq!(calls.get(), 8);
    }

    #[test]
    fn test_invalidation_walk_terminates_at_root() {
        let mut cache = ListingCache::new();
        cache.invalidate_prefix_chain(&S3Path::from_path("/"));
        cache.invalidate_prefix_chain(&S3Path::from_path("bucket"));
    }

    #[test]
    fn test_clear_reports_count() {
        let mut cache = ListingCache::new();
        for p in ["a", "b", "c"] {
            cache
                .get_or_fetch(&S3Path::from_path(p), false, || Ok(entries()))
                .unwrap();
        }

        assert_eq!(cache.clear(), 3);
        assert_eq!(cache.clear(), 0);
    }
}
