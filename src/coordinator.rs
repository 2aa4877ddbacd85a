/// Parallel work coordinator
///
/// Shared across cooperating workers: two counters behind one short-held
/// lock, plus the immutable per-reader group counts. The critical section is
/// pure index arithmetic; no I/O happens under the lock and no Reader
/// reference ever crosses it
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ParallelCoordinator {
    groups_per_reader: Vec<usize>,
    inner: Mutex<CoordInner>,
}

struct CoordInner {
    next_reader: usize,
    next_group: usize,
}

impl ParallelCoordinator {
    /// Bytes the shared state occupies, for callers that pre-size a shared
    /// arena before parallel execution begins
    pub fn estimate_shared_state_size(num_files: usize) -> usize {
        std::mem::size_of::<ParallelCoordinator>() + num_files * std::mem::size_of::<usize>()
    }

    /// Leader-side initialization with the matched group count per reader
    pub fn init_shared_state(groups_per_reader: Vec<usize>) -> Arc<ParallelCoordinator> {
        debug!(
            readers = groups_per_reader.len(),
            groups = groups_per_reader.iter().sum::<usize>(),
            "initialized parallel coordinator"
        );
        Arc::new(ParallelCoordinator {
            groups_per_reader,
            inner: Mutex::new(CoordInner {
                next_reader: 0,
                next_group: 0,
            }),
        })
    }

    /// Worker-side attachment
    pub fn attach(coordinator: &Arc<ParallelCoordinator>) -> Arc<ParallelCoordinator> {
        Arc::clone(coordinator)
    }

    /// Next row-group ordinal for a reader all workers share, or None when
    /// its groups are exhausted
    pub fn next_rowgroup(&self, reader_id: usize) -> Option<usize> {
        let cap = *self.groups_per_reader.get(reader_id)?;
        let mut inner = self.inner.lock().unwrap();
        if inner.next_group < cap {
            let group = inner.next_group;
            inner.next_group += 1;
            Some(group)
        } else {
            None
        }
    }

    /// Next (reader, group) assignment for multi-file scans
    /// The currently shared file is drained before the file index advances,
    /// keeping workers on the same file for locality
    pub fn next_file_or_rowgroup(&self) -> Option<(usize, usize)> {
        let mut inner = self.inner.lock().unwrap();
        loop {
            if inner.next_reader >= self.groups_per_reader.len() {
                return None;
            }
            if inner.next_group < self.groups_per_reader[inner.next_reader] {
                let assignment = (inner.next_reader, inner.next_group);
                inner.next_group += 1;
                return Some(assignment);
            }
            inner.next_reader += 1;
            inner.next_group = 0;
        }
    }

    /// Rearm both counters (collective rescan)
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.next_reader = 0;
        inner.next_group = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_single_reader_distribution() {
        let coord = ParallelCoordinator::init_shared_state(vec![3]);
        assert_eq!(coord.next_rowgroup(0), Some(0));
        assert_eq!(coord.next_rowgroup(0), Some(1));
        assert_eq!(coord.next_rowgroup(0), Some(2));
        assert_eq!(coord.next_rowgroup(0), None);
        assert_eq!(coord.next_rowgroup(7), None);
    }

    #[test]
    fn test_multifile_drains_current_file_first() {
        let coord = ParallelCoordinator::init_shared_state(vec![2, 0, 1]);
        assert_eq!(coord.next_file_or_rowgroup(), Some((0, 0)));
        assert_eq!(coord.next_file_or_rowgroup(), Some((0, 1)));
        // file 1 has no groups and is skipped entirely
        assert_eq!(coord.next_file_or_rowgroup(), Some((2, 0)));
        assert_eq!(coord.next_file_or_rowgroup(), None);
    }

    #[test]
    fn test_reset_rearms_counters() {
        let coord = ParallelCoordinator::init_shared_state(vec![1, 1]);
        assert_eq!(coord.next_file_or_rowgroup(), Some((0, 0)));
        coord.reset();
        assert_eq!(coord.next_file_or_rowgroup(), Some((0, 0)));
    }

    #[test]
    fn test_two_workers_no_duplicates_no_omissions() {
        let coord = ParallelCoordinator::init_shared_state(vec![5, 1]);
        let mut handles = Vec::new();
        for _ in 0..2 {
            let coord = ParallelCoordinator::attach(&coord);
            handles.push(thread::spawn(move || {
                let mut taken = Vec::new();
                while let Some(assignment) = coord.next_file_or_rowgroup() {
                    taken.push(assignment);
                }
                taken
            }));
        }
        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        let unique: HashSet<_> = all.iter().copied().collect();
        assert_eq!(all.len(), 6);
        assert_eq!(unique.len(), 6);
        for g in 0..5 {
            assert!(unique.contains(&(0, g)));
        }
        assert!(unique.contains(&(1, 0)));
    }
}
