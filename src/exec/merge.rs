/// Sorted-merge execution
///
/// A binary min-heap of merge slots keyed by the configured sort comparator:
/// nulls first, keys compared in declaration order, ties broken by reader id
/// so the merge is deterministic. Init reads one record per reader and
/// heapifies — O(N log N); each emitted record costs one pop and at most one
/// push — O(log N)
use crate::error::{ScanError, ScanResult};
use crate::reader::{EagerReader, ReadOutcome, Record};
use crate::value::Value;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use tracing::debug;

/// Where a sort-key value lives in an output record
pub(crate) enum KeySlot {
    /// Output slot index (typed mode)
    Typed(usize),
    /// Field name inside the schemaless document
    Doc(String),
}

pub(crate) fn extract_key(record: &Record, slots: &[KeySlot]) -> Vec<Value> {
    slots
        .iter()
        .map(|slot| match slot {
            KeySlot::Typed(i) => record.values.get(*i).cloned().unwrap_or(Value::Null),
            KeySlot::Doc(name) => record
                .values
                .first()
                .and_then(|doc| doc.map_get(name))
                .cloned()
                .unwrap_or(Value::Null),
        })
        .collect()
}

/// Transient (reader id, buffered record) pairing in the merge heap
pub(crate) struct MergeSlot {
    pub key: Vec<Value>,
    pub reader_id: usize,
    pub record: Record,
}

impl Ord for MergeSlot {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.key.iter().zip(&other.key) {
            match a.total_cmp(b) {
                Ordering::Equal => {}
                unequal => return unequal,
            }
        }
        self.reader_id.cmp(&other.reader_id)
    }
}

impl PartialOrd for MergeSlot {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for MergeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeSlot {}

/// K-way merge over always-open readers
/// Requires every input file pre-sorted by the same keys; mis-sorted input
/// yields mis-ordered output without detection
pub struct SortedMergeState {
    readers: Vec<EagerReader>,
    key_slots: Vec<KeySlot>,
    heap: BinaryHeap<Reverse<MergeSlot>>,
}

impl SortedMergeState {
    pub(crate) fn new(readers: Vec<EagerReader>, key_slots: Vec<KeySlot>) -> ScanResult<Self> {
        let mut state = Self {
            readers,
            key_slots,
            heap: BinaryHeap::new(),
        };
        state.init()?;
        Ok(state)
    }

    fn init(&mut self) -> ScanResult<()> {
        debug!(readers = self.readers.len(), "initializing sorted merge");
        for reader_id in 0..self.readers.len() {
            let mut record = Record::new();
            match self.readers[reader_id].next(&mut record)? {
                ReadOutcome::Success => {
                    let key = extract_key(&record, &self.key_slots);
                    self.heap.push(Reverse(MergeSlot {
                        key,
                        reader_id,
                        record,
                    }));
                }
                ReadOutcome::EndOfData => {}
                ReadOutcome::Inactive => {
                    return Err(ScanError::consistency(
                        "eager reader reported inactive during merge init",
                    ))
                }
            }
        }
        Ok(())
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        let Some(Reverse(mut slot)) = self.heap.pop() else {
            return Ok(ReadOutcome::EndOfData);
        };
        std::mem::swap(&mut out.values, &mut slot.record.values);
        match self.readers[slot.reader_id].next(&mut slot.record)? {
            ReadOutcome::Success => {
                slot.key = extract_key(&slot.record, &self.key_slots);
                self.heap.push(Reverse(slot));
            }
            ReadOutcome::EndOfData => {}
            ReadOutcome::Inactive => {
                return Err(ScanError::consistency(
                    "eager reader reported inactive during merge",
                ))
            }
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
}
