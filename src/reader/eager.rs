/// Always-open reader
/// The handle opens once and stays open for the object's lifetime; closing is
/// dropping the reader. Each row group is fully decoded before iteration
/// resumes. When a coordinator is attached, the next group ordinal comes from
/// the shared counters instead of the local cursor
use crate::config::OutputLayout;
use crate::coordinator::ParallelCoordinator;
use crate::error::{ScanError, ScanResult};
use crate::segment::{SegmentHandle, SegmentMeta};
use std::sync::Arc;

use super::{decode_group, GroupBuffer, ReadOutcome, Record};

pub struct EagerReader {
    reader_id: usize,
    path: String,
    handle: Arc<dyn SegmentHandle>,
    meta: SegmentMeta,
    layout: Arc<OutputLayout>,
    /// Surviving row-group ordinals, in file order
    matched: Vec<usize>,
    coordinator: Option<Arc<ParallelCoordinator>>,
    next_matched_pos: usize,
    buffer: Option<GroupBuffer>,
    row_in_group: usize,
}

impl EagerReader {
    pub fn new(
        reader_id: usize,
        path: String,
        handle: Arc<dyn SegmentHandle>,
        meta: SegmentMeta,
        layout: Arc<OutputLayout>,
        matched: Vec<usize>,
        coordinator: Option<Arc<ParallelCoordinator>>,
    ) -> Self {
        Self {
            reader_id,
            path,
            handle,
            meta,
            layout,
            matched,
            coordinator,
            next_matched_pos: 0,
            buffer: None,
            row_in_group: 0,
        }
    }

    pub fn reader_id(&self) -> usize {
        self.reader_id
    }

    /// Emit the next buffered row, if the current group has one left
    pub(crate) fn emit_next(&mut self, out: &mut Record) -> bool {
        if let Some(buffer) = &self.buffer {
            if self.row_in_group < buffer.rows {
                buffer.fill_record(self.row_in_group, out);
                self.row_in_group += 1;
                return true;
            }
        }
        false
    }

    /// Decode the matched group at position `pos`, replacing the buffer
    /// Used by externally driven scans (multi-file under a coordinator)
    pub(crate) fn load_group_at(&mut self, pos: usize) -> ScanResult<()> {
        let ordinal = *self.matched.get(pos).ok_or_else(|| {
            ScanError::consistency(format!(
                "assigned group position {} exceeds {} matched groups",
                pos,
                self.matched.len()
            ))
        })?;
        self.buffer = Some(decode_group(
            self.handle.as_ref(),
            &self.meta,
            &self.layout,
            ordinal,
            &self.path,
        )?);
        self.row_in_group = 0;
        Ok(())
    }

    fn acquire_next_pos(&mut self) -> Option<usize> {
        match &self.coordinator {
            Some(coordinator) => coordinator.next_rowgroup(self.reader_id),
            None => {
                if self.next_matched_pos < self.matched.len() {
                    let pos = self.next_matched_pos;
                    self.next_matched_pos += 1;
                    Some(pos)
                } else {
                    None
                }
            }
        }
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        loop {
            if self.emit_next(out) {
                return Ok(ReadOutcome::Success);
            }
            match self.acquire_next_pos() {
                Some(pos) => self.load_group_at(pos)?,
                None => return Ok(ReadOutcome::EndOfData),
            }
        }
    }

    /// Return the cursor to its initial position
    pub fn reset(&mut self) {
        self.next_matched_pos = 0;
        self.buffer = None;
        self.row_in_group = 0;
    }
}
