use lru::LruCache;
use std::num::NonZeroUsize;

use crate::domain::episode::EpisodeId;
use crate::matching::extract_episode_info;

/// Smallest capacity a cache is created with, whatever the batch size.
pub const MIN_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
    pub capacity: usize,
}

/// Memoised episode detection, keyed by raw file name.
///
/// Misses are stored too, so a name that matches no rule is only scanned
/// once. Nothing is invalidated automatically; call [`EpisodeCache::clear`]
/// between unrelated batches.
#[derive(Debug)]
pub struct EpisodeCache {
    entries: LruCache<String, Option<EpisodeId>>,
    hits: u64,
    misses: u64,
}

impl EpisodeCache {
    pub fn new() -> Self {
        Self::with_capacity(MIN_CAPACITY)
    }

    /// Sized for a batch of `expected_files` names, never below [`MIN_CAPACITY`].
    pub fn with_capacity(expected_files: usize) -> Self {
        let capacity = NonZeroUsize::new(expected_files.saturating_mul(2).max(MIN_CAPACITY))
            .unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    pub fn lookup(&mut self, filename: &str) -> Option<EpisodeId> {
        if let Some(cached) = self.entries.get(filename) {
            self.hits += 1;
            return cached.clone();
        }

        self.misses += 1;
        let episode = extract_episode_info(filename).map(|(s, e)| EpisodeId::new(s, e));
        self.entries.put(filename.to_string(), episode.clone());
        episode
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.hits = 0;
        self.misses = 0;
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
            capacity: self.entries.cap().get(),
        }
    }
}

impl Default for EpisodeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeated_lookups_hit() {
        let mut cache = EpisodeCache::new();
        let first = cache.lookup("Show.S01E05.mkv");
        assert_eq!(first, Some(EpisodeId::new(1, 5)));
        assert_eq!(cache.lookup("Show.S01E05.mkv"), first);
        assert_eq!(cache.lookup("Show.S01E05.mkv"), first);

        let stats = cache.stats();
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.entries, 1);
    }

    #[test]
    fn test_no_match_is_cached() {
        let mut cache = EpisodeCache::new();
        assert_eq!(cache.lookup("Random.Movie.2023.mkv"), None);
        assert_eq!(cache.lookup("Random.Movie.2023.mkv"), None);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_clear_resets_entries_and_counters() {
        let mut cache = EpisodeCache::new();
        cache.lookup("Show.S01E01.mkv");
        cache.lookup("Show.S01E01.mkv");
        cache.clear();

        let stats = cache.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.entries, 0);

        assert_eq!(cache.lookup("Show.S01E01.mkv"), Some(EpisodeId::new(1, 1)));
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_capacity_has_a_floor_and_scales() {
        assert_eq!(EpisodeCache::with_capacity(0).stats().capacity, MIN_CAPACITY);
        assert_eq!(EpisodeCache::with_capacity(3000).stats().capacity, 6000);
    }
}
