/// LRU-bounded arena of open segment handles, keyed by path
///
/// Replaces ambient global reader caches: the cache is an explicit object the
/// caller constructs and injects into `ExecState::build`, so handle reuse
/// across scans has clear ownership. The caching sorted-merge strategy does
/// not use it: that strategy's open-handle bound must hold exactly, and a
/// shared arena would keep evicted handles alive
use crate::error::ScanResult;
use crate::segment::{SegmentHandle, SegmentSource};
use fxhash::FxHashMap;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub struct HandleCache {
    index: FxHashMap<PathBuf, Arc<dyn SegmentHandle>>,
    lru: VecDeque<PathBuf>,
    capacity: usize,
}

impl HandleCache {
    /// `capacity` of 0 means unbounded
    pub fn new(capacity: usize) -> Self {
        Self {
            index: FxHashMap::default(),
            lru: VecDeque::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Return the cached handle for `path`, opening and inserting on miss
    pub fn get_or_open(
        &mut self,
        source: &dyn SegmentSource,
        path: &Path,
    ) -> ScanResult<Arc<dyn SegmentHandle>> {
        if let Some(handle) = self.index.get(path) {
            let handle = Arc::clone(handle);
            self.touch(path);
            return Ok(handle);
        }
        let handle = source.open(path)?;
        self.index.insert(path.to_path_buf(), Arc::clone(&handle));
        self.lru.push_back(path.to_path_buf());
        while self.capacity > 0 && self.index.len() > self.capacity {
            self.evict_one();
        }
        Ok(handle)
    }

    fn touch(&mut self, path: &Path) {
        if let Some(pos) = self.lru.iter().position(|p| p == path) {
            if let Some(entry) = self.lru.remove(pos) {
                self.lru.push_back(entry);
            }
        }
    }

    fn evict_one(&mut self) {
        if let Some(victim) = self.lru.pop_front() {
            self.index.remove(&victim);
            debug!(path = %victim.display(), "evicted cached segment handle");
        }
    }
}
