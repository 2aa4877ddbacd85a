/// Non-merging strategies: trivial, single-file, and strictly sequential
/// multi-file scans
use crate::config::{MatchedFile, OutputLayout};
use crate::coordinator::ParallelCoordinator;
use crate::error::{ScanError, ScanResult};
use crate::handle_cache::HandleCache;
use crate::reader::{EagerReader, ReadOutcome, Record};
use crate::segment::SegmentSource;
use std::sync::{Arc, Mutex};

use super::open_eager;

/// No file matched: end of data from the first call
pub struct TrivialState;

impl TrivialState {
    pub fn next(&mut self, _out: &mut Record) -> ScanResult<ReadOutcome> {
        Ok(ReadOutcome::EndOfData)
    }

    pub fn rescan(&mut self) -> ScanResult<()> {
        Ok(())
    }
}

/// Exactly one matched file: delegate straight to its reader
pub struct SingleFileState {
    reader: EagerReader,
    coordinator: Option<Arc<ParallelCoordinator>>,
}

impl SingleFileState {
    pub(crate) fn new(reader: EagerReader, coordinator: Option<Arc<ParallelCoordinator>>) -> Self {
        Self {
            reader,
            coordinator,
        }
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        self.reader.next(out)
    }

    pub fn rescan(&mut self) -> ScanResult<()> {
        self.reader.reset();
        if let Some(coordinator) = &self.coordinator {
            coordinator.reset();
        }
        Ok(())
    }
}

/// N files consumed strictly in sequence: file i+1's reader is created only
/// after file i is exhausted. Output order is per-file order, never global.
/// Under a coordinator, (file, group) assignments come from the shared
/// counters; the coordinator drains the current file before advancing, so a
/// worker keeps its reader while the shared file still has groups
pub struct MultiFileState {
    source: Arc<dyn SegmentSource>,
    cache: Option<Arc<Mutex<HandleCache>>>,
    files: Vec<MatchedFile>,
    layout: Arc<OutputLayout>,
    coordinator: Option<Arc<ParallelCoordinator>>,
    current: Option<(usize, EagerReader)>,
    next_file: usize,
}

impl MultiFileState {
    pub(crate) fn new(
        source: Arc<dyn SegmentSource>,
        cache: Option<Arc<Mutex<HandleCache>>>,
        files: Vec<MatchedFile>,
        layout: Arc<OutputLayout>,
        coordinator: Option<Arc<ParallelCoordinator>>,
    ) -> Self {
        Self {
            source,
            cache,
            files,
            layout,
            coordinator,
            current: None,
            next_file: 0,
        }
    }

    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        match self.coordinator.clone() {
            Some(coordinator) => self.next_parallel(&coordinator, out),
            None => self.next_sequential(out),
        }
    }

    fn next_sequential(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        loop {
            if let Some((_, reader)) = &mut self.current {
                match reader.next(out)? {
                    ReadOutcome::Success => return Ok(ReadOutcome::Success),
                    ReadOutcome::EndOfData => self.current = None,
                    ReadOutcome::Inactive => {
                        return Err(ScanError::consistency(
                            "eager reader reported inactive in sequential scan",
                        ))
                    }
                }
            }
            if self.current.is_none() {
                if self.next_file >= self.files.len() {
                    return Ok(ReadOutcome::EndOfData);
                }
                let idx = self.next_file;
                self.next_file += 1;
                let reader = open_eager(
                    &self.source,
                    &self.cache,
                    idx,
                    &self.files[idx],
                    &self.layout,
                    None,
                )?;
                self.current = Some((idx, reader));
            }
        }
    }

    fn next_parallel(
        &mut self,
        coordinator: &Arc<ParallelCoordinator>,
        out: &mut Record,
    ) -> ScanResult<ReadOutcome> {
        loop {
            if let Some((_, reader)) = &mut self.current {
                if reader.emit_next(out) {
                    return Ok(ReadOutcome::Success);
                }
            }
            let Some((file_idx, pos)) = coordinator.next_file_or_rowgroup() else {
                return Ok(ReadOutcome::EndOfData);
            };
            let needs_new_reader = match &self.current {
                Some((current_idx, _)) => *current_idx != file_idx,
                None => true,
            };
            if needs_new_reader {
                let file = self.files.get(file_idx).ok_or_else(|| {
                    ScanError::consistency(format!(
                        "coordinator assigned file {} of {}",
                        file_idx,
                        self.files.len()
                    ))
                })?;
                let reader =
                    open_eager(&self.source, &self.cache, file_idx, file, &self.layout, None)?;
                self.current = Some((file_idx, reader));
            }
            if let Some((_, reader)) = &mut self.current {
                reader.load_group_at(pos)?;
            }
        }
    }

    pub fn rescan(&mut self) -> ScanResult<()> {
        self.current = None;
        self.next_file = 0;
        if let Some(coordinator) = &self.coordinator {
            coordinator.reset();
        }
        Ok(())
    }
}
