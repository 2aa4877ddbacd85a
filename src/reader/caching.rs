/// Closeable, reopenable reader
///
/// Built for eviction: `close()` drops the handle and the decoded buffer but
/// preserves the cursor, so a later `open()` resumes mid-group without
/// re-reading anything already emitted. The segment footer is retained across
/// close/open so reopening costs one transport `open` call. `next()` reports
/// `Inactive` while the handle is absent; only the owning strategy ever
/// closes the reader
use crate::config::OutputLayout;
use crate::error::{ScanError, ScanResult};
use crate::segment::{SegmentHandle, SegmentMeta, SegmentSource};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use super::{decode_group, GroupBuffer, ReadOutcome, Record};

pub struct CachingReader {
    reader_id: usize,
    path: PathBuf,
    source: Arc<dyn SegmentSource>,
    handle: Option<Arc<dyn SegmentHandle>>,
    meta: Option<SegmentMeta>,
    layout: Arc<OutputLayout>,
    matched: Vec<usize>,
    next_matched_pos: usize,
    /// Matched position currently buffered (or to re-decode after reopen)
    current_pos: Option<usize>,
    buffer: Option<GroupBuffer>,
    row_in_group: usize,
    exhausted: bool,
    open_calls: u64,
    close_calls: u64,
}

impl CachingReader {
    /// Construction performs no I/O; the strategy activates the reader before
    /// first use
    pub fn new(
        reader_id: usize,
        path: PathBuf,
        source: Arc<dyn SegmentSource>,
        layout: Arc<OutputLayout>,
        matched: Vec<usize>,
    ) -> Self {
        Self {
            reader_id,
            path,
            source,
            handle: None,
            meta: None,
            layout,
            matched,
            next_matched_pos: 0,
            current_pos: None,
            buffer: None,
            row_in_group: 0,
            exhausted: false,
            open_calls: 0,
            close_calls: 0,
        }
    }

    pub fn reader_id(&self) -> usize {
        self.reader_id
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    pub fn open_calls(&self) -> u64 {
        self.open_calls
    }

    pub fn close_calls(&self) -> u64 {
        self.close_calls
    }

    /// Open (or reopen) the handle; idempotent when already open
    pub fn open(&mut self) -> ScanResult<()> {
        if self.handle.is_some() {
            return Ok(());
        }
        let handle = self.source.open(&self.path)?;
        if self.meta.is_none() {
            self.meta = Some(SegmentMeta::read_from(
                handle.as_ref(),
                &self.path.to_string_lossy(),
            )?);
        }
        self.handle = Some(handle);
        self.open_calls += 1;
        debug!(path = %self.path.display(), reader = self.reader_id, "reader activated");
        Ok(())
    }

    /// Drop the handle and decoded buffer, preserving the cursor
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            self.buffer = None;
            self.close_calls += 1;
            debug!(path = %self.path.display(), reader = self.reader_id, "reader closed");
        }
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        if self.exhausted {
            return Ok(ReadOutcome::EndOfData);
        }
        let Some(handle) = self.handle.clone() else {
            return Ok(ReadOutcome::Inactive);
        };
        loop {
            match &self.buffer {
                Some(buffer) if self.row_in_group < buffer.rows => {
                    buffer.fill_record(self.row_in_group, out);
                    self.row_in_group += 1;
                    return Ok(ReadOutcome::Success);
                }
                Some(_) => {
                    // current group consumed
                    self.buffer = None;
                    self.current_pos = None;
                    self.row_in_group = 0;
                }
                None => {
                    let pos = match self.current_pos {
                        // resuming a group that was buffered before close()
                        Some(pos) => pos,
                        None => {
                            if self.next_matched_pos >= self.matched.len() {
                                self.exhausted = true;
                                return Ok(ReadOutcome::EndOfData);
                            }
                            let pos = self.next_matched_pos;
                            self.next_matched_pos += 1;
                            self.current_pos = Some(pos);
                            self.row_in_group = 0;
                            pos
                        }
                    };
                    let meta = self.meta.as_ref().ok_or_else(|| {
                        ScanError::consistency("caching reader has a handle but no footer")
                    })?;
                    self.buffer = Some(decode_group(
                        handle.as_ref(),
                        meta,
                        &self.layout,
                        self.matched[pos],
                        &self.path.to_string_lossy(),
                    )?);
                }
            }
        }
    }

    /// Return the cursor to its initial position; the handle keeps its
    /// current open/closed state
    pub fn reset(&mut self) {
        self.next_matched_pos = 0;
        self.current_pos = None;
        self.buffer = None;
        self.row_in_group = 0;
        self.exhausted = false;
    }
}
