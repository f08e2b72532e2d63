//! Query-result cache (§4.8, §9 "Query cache"): process-wide, keyed on
//! `(index_id, query-shape-fingerprint, schema-fingerprint)`, refcounted
//! entries, LRU-evicted by a configurable byte budget.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

use crate::ranker::Match;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub index_id: u32,
    pub shape_fingerprint: u64,
    pub schema_fingerprint: u64,
}

#[derive(Debug)]
struct Entry {
    matches: Arc<Vec<Match>>,
    byte_size: usize,
}

/// Readers clone the `Arc<Vec<Match>>` out lock-free after a short-held
/// lookup; writers take the mutex for the whole insert/evict cycle
/// (§5 "writers under a mutex, readers lock-free with reference counting").
pub struct QueryCache {
    inner: Mutex<Inner>,
    byte_budget: usize,
}

struct Inner {
    entries: FxHashMap<CacheKey, Entry>,
    lru: VecDeque<CacheKey>,
    bytes_used: usize,
}

impl QueryCache {
    pub fn new(byte_budget: usize) -> QueryCache {
        QueryCache { inner: Mutex::new(Inner { entries: FxHashMap::default(), lru: VecDeque::new(), bytes_used: 0 }), byte_budget }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<Vec<Match>>> {
        let mut inner = self.inner.lock().unwrap();
        let found = inner.entries.get(key).map(|e| e.matches.clone());
        if found.is_some() {
            inner.lru.retain(|k| k != key);
            inner.lru.push_back(*key);
        }
        found
    }

    /// The only insertion point (§9 "Insertion happens only at
    /// finalize_cache and only when the caller did not ask to skip
    /// caching").
    pub fn finalize_cache(&self, key: CacheKey, matches: Vec<Match>, skip: bool) {
        if skip {
            return;
        }
        let byte_size = std::mem::size_of::<Match>() * matches.len();
        let mut inner = self.inner.lock().unwrap();
        if byte_size > self.byte_budget {
            return;
        }
        if let Some(old) = inner.entries.remove(&key) {
            inner.bytes_used -= old.byte_size;
            inner.lru.retain(|k| *k != key);
        }
        inner.bytes_used += byte_size;
        inner.entries.insert(key, Entry { matches: Arc::new(matches), byte_size });
        inner.lru.push_back(key);
        while inner.bytes_used > self.byte_budget {
            let Some(evict_key) = inner.lru.pop_front() else { break };
            if let Some(evicted) = inner.entries.remove(&evict_key) {
                inner.bytes_used -= evicted.byte_size;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> CacheKey {
        CacheKey { index_id: 0, shape_fingerprint: n as u64, schema_fingerprint: 1 }
    }

    #[test]
    fn hit_after_insert() {
        let cache = QueryCache::new(1_000_000);
        cache.finalize_cache(key(1), vec![Match::new(1)], false);
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
    }

    #[test]
    fn skip_caching_does_not_insert() {
        let cache = QueryCache::new(1_000_000);
        cache.finalize_cache(key(1), vec![Match::new(1)], true);
        assert!(cache.is_empty());
    }

    #[test]
    fn exceeding_the_byte_budget_evicts_the_oldest_entry() {
        let one_match_bytes = std::mem::size_of::<Match>();
        let cache = QueryCache::new(one_match_bytes);
        cache.finalize_cache(key(1), vec![Match::new(1)], false);
        cache.finalize_cache(key(2), vec![Match::new(2)], false);
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(2)).is_some());
    }
}
