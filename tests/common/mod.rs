/// Shared fixtures: segment builders and a handle-counting source wrapper
use segscan::{
    ColumnMeta, ColumnType, ExecState, LocalSource, ReadOutcome, Record, ScanResult,
    SegmentBuilder, SegmentHandle, SegmentSource, Value,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Write a single-column Int64 segment with one row group per slice
/// An empty slice produces a zero-row group
pub fn write_int_segment(dir: &Path, name: &str, groups: &[&[i64]]) -> PathBuf {
    let path = dir.join(name);
    let mut builder = SegmentBuilder::new(
        &path,
        vec![ColumnMeta {
            name: "k".into(),
            column_type: ColumnType::Int64,
        }],
        1 << 20,
    )
    .unwrap();
    for group in groups {
        for v in *group {
            builder.push_row(vec![Value::Int64(*v)]).unwrap();
        }
        builder.cut_group().unwrap();
    }
    builder.finish().unwrap();
    path
}

/// Drain a state, returning the Int64 key in output slot 0 of every record
pub fn collect_keys(state: &mut ExecState) -> Vec<i64> {
    let mut out = Vec::new();
    let mut record = Record::new();
    loop {
        match state.next(&mut record).unwrap() {
            ReadOutcome::Success => match &record.values[0] {
                Value::Int64(v) => out.push(*v),
                other => panic!("expected Int64 key, got {}", other),
            },
            ReadOutcome::EndOfData => return out,
            ReadOutcome::Inactive => panic!("strategy leaked Inactive to the caller"),
        }
    }
}

/// Source wrapper that tracks how many handles are open at once
pub struct TrackingSource {
    inner: LocalSource,
    open_now: Arc<AtomicUsize>,
    peak_open: Arc<AtomicUsize>,
    total_opens: Arc<AtomicUsize>,
}

impl TrackingSource {
    pub fn new() -> Self {
        Self {
            inner: LocalSource::new(),
            open_now: Arc::new(AtomicUsize::new(0)),
            peak_open: Arc::new(AtomicUsize::new(0)),
            total_opens: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn peak_open(&self) -> usize {
        self.peak_open.load(Ordering::SeqCst)
    }

    pub fn open_now(&self) -> usize {
        self.open_now.load(Ordering::SeqCst)
    }

    pub fn total_opens(&self) -> usize {
        self.total_opens.load(Ordering::SeqCst)
    }
}

struct TrackingHandle {
    inner: Arc<dyn SegmentHandle>,
    open_now: Arc<AtomicUsize>,
}

impl SegmentHandle for TrackingHandle {
    fn read_at(&self, offset: u64, len: usize) -> ScanResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn size(&self) -> u64 {
        self.inner.size()
    }
}

impl Drop for TrackingHandle {
    fn drop(&mut self) {
        self.open_now.fetch_sub(1, Ordering::SeqCst);
    }
}

impl SegmentSource for TrackingSource {
    fn open(&self, path: &Path) -> ScanResult<Arc<dyn SegmentHandle>> {
        let inner = self.inner.open(path)?;
        self.total_opens.fetch_add(1, Ordering::SeqCst);
        let now = self.open_now.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_open.fetch_max(now, Ordering::SeqCst);
        Ok(Arc::new(TrackingHandle {
            inner,
            open_now: Arc::clone(&self.open_now),
        }))
    }
}
