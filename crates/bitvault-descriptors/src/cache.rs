//! LRU cache of parsed descriptors, keyed by the full descriptor string
//! (including checksum, if present).

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::DescriptorInfo;

const DEFAULT_CAPACITY: usize = 50;

pub struct DescriptorCache {
    inner: Mutex<LruCache<String, DescriptorInfo>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let cap = NonZeroUsize::new(capacity.max(1)).expect("capacity is at least 1");
        Self {
            inner: Mutex::new(LruCache::new(cap)),
        }
    }

    pub fn get(&self, descriptor: &str) -> Option<DescriptorInfo> {
        let mut cache = self.inner.lock().expect("descriptor cache lock poisoned");
        cache.get(descriptor).cloned()
    }

    pub fn insert(&self, descriptor: String, info: DescriptorInfo) {
        let mut cache = self.inner.lock().expect("descriptor cache lock poisoned");
        cache.put(descriptor, info);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("descriptor cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.inner.lock().expect("descriptor cache lock poisoned").clear();
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new()
    }
}
