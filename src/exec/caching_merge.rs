/// Bounded sorted merge
///
/// Same merge discipline as `SortedMergeState`, but over closeable readers
/// and with at most `max_open_files` handles open at once. Activation stamps
/// come from a monotone counter; eviction closes the open reader with the
/// oldest stamp (linear scan — only the bound is a contract, not the
/// eviction order)
use crate::error::{ScanError, ScanResult};
use crate::reader::{CachingReader, ReadOutcome, Record};
use std::cmp::Reverse;
use std::collections::BinaryHeap;
use tracing::debug;

use super::merge::{extract_key, KeySlot, MergeSlot};

pub struct CachingSortedMergeState {
    readers: Vec<CachingReader>,
    key_slots: Vec<KeySlot>,
    heap: BinaryHeap<Reverse<MergeSlot>>,
    max_open_files: usize,
    /// Last-activation stamp per reader
    stamps: Vec<u64>,
    clock: u64,
}

impl CachingSortedMergeState {
    pub(crate) fn new(
        readers: Vec<CachingReader>,
        key_slots: Vec<KeySlot>,
        max_open_files: usize,
    ) -> ScanResult<Self> {
        let stamps = vec![0; readers.len()];
        let mut state = Self {
            readers,
            key_slots,
            heap: BinaryHeap::new(),
            max_open_files,
            stamps,
            clock: 0,
        };
        state.init()?;
        Ok(state)
    }

    fn init(&mut self) -> ScanResult<()> {
        debug!(
            readers = self.readers.len(),
            max_open_files = self.max_open_files,
            "initializing bounded sorted merge"
        );
        for reader_id in 0..self.readers.len() {
            let mut record = Record::new();
            match self.read_activating(reader_id, &mut record)? {
                ReadOutcome::Success => {
                    let key = extract_key(&record, &self.key_slots);
                    self.heap.push(Reverse(MergeSlot {
                        key,
                        reader_id,
                        record,
                    }));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// No-op when the reader is already open (the stamp still refreshes);
    /// otherwise evict the least recently activated open reader if the bound
    /// is reached, then open the target
    fn activate(&mut self, reader_id: usize) -> ScanResult<()> {
        self.clock += 1;
        let stamp = self.clock;
        if self.readers[reader_id].is_open() {
            self.stamps[reader_id] = stamp;
            return Ok(());
        }
        if self.max_open_files > 0 {
            let open_count = self.readers.iter().filter(|r| r.is_open()).count();
            if open_count >= self.max_open_files {
                let victim = self
                    .readers
                    .iter()
                    .enumerate()
                    .filter(|(_, r)| r.is_open())
                    .min_by_key(|(i, _)| self.stamps[*i])
                    .map(|(i, _)| i)
                    .ok_or_else(|| {
                        ScanError::consistency("open-handle bound reached with nothing to evict")
                    })?;
                debug!(victim, for_reader = reader_id, "evicting reader handle");
                self.readers[victim].close();
            }
        }
        self.readers[reader_id].open()?;
        self.stamps[reader_id] = stamp;
        Ok(())
    }

    /// `next()` with inactive-retry: an evicted reader is activated and the
    /// same call repeated. A reader still inactive after activation breaks
    /// the strategy's invariant
    fn read_activating(
        &mut self,
        reader_id: usize,
        record: &mut Record,
    ) -> ScanResult<ReadOutcome> {
        for _ in 0..2 {
            match self.readers[reader_id].next(record)? {
                ReadOutcome::Inactive => self.activate(reader_id)?,
                outcome => return Ok(outcome),
            }
        }
        Err(ScanError::consistency(
            "reader remained inactive after activation",
        ))
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        let Some(Reverse(mut slot)) = self.heap.pop() else {
            return Ok(ReadOutcome::EndOfData);
        };
        std::mem::swap(&mut out.values, &mut slot.record.values);
        match self.read_activating(slot.reader_id, &mut slot.record)? {
            ReadOutcome::Success => {
                slot.key = extract_key(&slot.record, &self.key_slots);
                self.heap.push(Reverse(slot));
            }
            _ => {}
        }
        Ok(ReadOutcome::Success)
    }

    pub fn rescan(&mut self) -> ScanResult<()> {
        self.heap.clear();
        for reader in &mut self.readers {
            reader.reset();
        }
        self.init()
    }

    /// Open-handle count, for invariant checks
    pub fn open_readers(&self) -> usize {
        self.readers.iter().filter(|r| r.is_open()).count()
    }
}
