use ahash::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash, Hasher};

use crate::gc::GcRef;

/// String interning table - every string object goes through here
/// - Same content always returns the same GcRef
/// - Buckets keyed by content hash (ahash), collisions resolved by content
/// - Entries are NOT roots: the collector removes an entry when it sweeps
///   the string it points to
pub struct StringInterner {
    map: HashMap<u64, Vec<GcRef>, RandomState>,

    hashbuilder: RandomState,
}

impl StringInterner {
    pub fn new() -> Self {
        Self {
            map: HashMap::with_capacity_and_hasher(256, RandomState::new()),
            hashbuilder: RandomState::new(),
        }
    }

    #[inline(always)]
    pub fn hash_string(&self, s: &str) -> u64 {
        let mut hasher = self.hashbuilder.build_hasher();
        s.hash(&mut hasher);
        hasher.finish()
    }

    /// Find an interned string with `hash` for which `same_content` holds
    #[inline]
    pub fn find(&self, hash: u64, mut same_content: impl FnMut(GcRef) -> bool) -> Option<GcRef> {
        self.map
            .get(&hash)?
            .iter()
            .copied()
            .find(|&r| same_content(r))
    }

    pub fn insert(&mut self, hash: u64, r: GcRef) {
        self.map.entry(hash).or_default().push(r);
    }

    /// Remove a dead string (called by the sweep)
    pub fn remove(&mut self, hash: u64, r: GcRef) {
        if let Some(refs) = self.map.get_mut(&hash) {
            refs.retain(|&i| i != r);
            if refs.is_empty() {
                self.map.remove(&hash);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for StringInterner {
    fn default() -> Self {
        Self::new()
    }
}
