/// Execution states
///
/// One strategy is chosen at construction and fixed for the scan's lifetime:
/// a closed sum type with a single dispatch site instead of a class
/// hierarchy. Every strategy owns its readers and destroys them with itself;
/// any failure surfaced from `next()` aborts the whole scan, with handles
/// released on the unwind
use crate::config::{MatchedFile, OutputLayout, ScanConfig, ScanPlan};
use crate::coordinator::ParallelCoordinator;
use crate::error::{ScanError, ScanResult};
use crate::handle_cache::HandleCache;
use crate::reader::{CachingReader, EagerReader, ReadOutcome, Record};
use crate::segment::{SegmentMeta, SegmentSource};
use std::sync::{Arc, Mutex};
use tracing::info;

pub mod caching_merge;
pub mod merge;
pub mod sequence;

pub use caching_merge::CachingSortedMergeState;
pub use merge::SortedMergeState;
pub use sequence::{MultiFileState, SingleFileState, TrivialState};

use merge::KeySlot;

pub enum ExecState {
    Trivial(TrivialState),
    SingleFile(SingleFileState),
    MultiFile(MultiFileState),
    SortedMerge(SortedMergeState),
    CachingSortedMerge(CachingSortedMergeState),
}

impl std::fmt::Debug for ExecState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExecState::Trivial(_) => "Trivial",
            ExecState::SingleFile(_) => "SingleFile",
            ExecState::MultiFile(_) => "MultiFile",
            ExecState::SortedMerge(_) => "SortedMerge",
            ExecState::CachingSortedMerge(_) => "CachingSortedMerge",
        };
        f.debug_tuple(name).finish()
    }
}

impl ExecState {
    /// Pick and construct the strategy for a plan
    ///
    /// No files → trivial. Sort keys present → sorted merge, bounded when
    /// `max_open_files` is set and smaller than the file count. Otherwise
    /// single-file or sequential multi-file, optionally coordinator-driven
    pub fn build(
        source: Arc<dyn SegmentSource>,
        plan: ScanPlan,
        config: &ScanConfig,
        coordinator: Option<Arc<ParallelCoordinator>>,
        cache: Option<Arc<Mutex<HandleCache>>>,
    ) -> ScanResult<ExecState> {
        let layout = Arc::new(plan.layout);
        let files: Vec<MatchedFile> = plan
            .files
            .into_iter()
            .filter(|f| !f.row_groups.is_empty())
            .collect();
        if files.is_empty() {
            info!("no matched files, trivial scan");
            return Ok(ExecState::Trivial(TrivialState));
        }
        if !plan.sort_keys.is_empty() {
            if coordinator.is_some() {
                return Err(ScanError::consistency(
                    "sorted merge does not run under a parallel coordinator",
                ));
            }
            let key_slots = resolve_key_slots(&layout, &plan.sort_keys)?;
            let bounded = config.max_open_files > 0 && files.len() > config.max_open_files;
            if bounded {
                info!(
                    files = files.len(),
                    max_open_files = config.max_open_files,
                    "bounded sorted-merge scan"
                );
                let readers = files
                    .iter()
                    .enumerate()
                    .map(|(i, f)| {
                        CachingReader::new(
                            i,
                            f.path.clone(),
                            Arc::clone(&source),
                            Arc::clone(&layout),
                            f.row_groups.clone(),
                        )
                    })
                    .collect();
                return Ok(ExecState::CachingSortedMerge(CachingSortedMergeState::new(
                    readers,
                    key_slots,
                    config.max_open_files,
                )?));
            }
            info!(files = files.len(), "sorted-merge scan");
            let mut readers = Vec::with_capacity(files.len());
            for (i, file) in files.iter().enumerate() {
                readers.push(open_eager(&source, &cache, i, file, &layout, None)?);
            }
            return Ok(ExecState::SortedMerge(SortedMergeState::new(
                readers, key_slots,
            )?));
        }
        if files.len() == 1 {
            info!(path = %files[0].path.display(), "single-file scan");
            let reader = open_eager(&source, &cache, 0, &files[0], &layout, coordinator.clone())?;
            return Ok(ExecState::SingleFile(SingleFileState::new(
                reader,
                coordinator,
            )));
        }
        info!(files = files.len(), "multi-file scan");
        Ok(ExecState::MultiFile(MultiFileState::new(
            source,
            cache,
            files,
            layout,
            coordinator,
        )))
    }

    /// Produce the next record, or report end of data
    pub fn next(&mut self, out: &mut Record) -> ScanResult<ReadOutcome> {
        match self {
            ExecState::Trivial(s) => s.next(out),
            ExecState::SingleFile(s) => s.next(out),
            ExecState::MultiFile(s) => s.next(out),
            ExecState::SortedMerge(s) => s.next(out),
            ExecState::CachingSortedMerge(s) => s.next(out),
        }
    }

    /// Reset every owned reader to its initial position
    pub fn rescan(&mut self) -> ScanResult<()> {
        match self {
            ExecState::Trivial(s) => s.rescan(),
            ExecState::SingleFile(s) => s.rescan(),
            ExecState::MultiFile(s) => s.rescan(),
            ExecState::SortedMerge(s) => s.rescan(),
            ExecState::CachingSortedMerge(s) => s.rescan(),
        }
    }
}

fn resolve_key_slots(layout: &OutputLayout, sort_keys: &[String]) -> ScanResult<Vec<KeySlot>> {
    sort_keys
        .iter()
        .map(|name| {
            if layout.schemaless {
                Ok(KeySlot::Doc(name.clone()))
            } else {
                layout
                    .columns
                    .iter()
                    .position(|c| c == name)
                    .map(KeySlot::Typed)
                    .ok_or_else(|| {
                        ScanError::format(format!(
                            "sort key '{}' is not in the output layout",
                            name
                        ))
                    })
            }
        })
        .collect()
}

/// Open a handle (through the injected cache when present), read the footer,
/// and build an always-open reader for one matched file
pub(crate) fn open_eager(
    source: &Arc<dyn SegmentSource>,
    cache: &Option<Arc<Mutex<HandleCache>>>,
    reader_id: usize,
    file: &MatchedFile,
    layout: &Arc<OutputLayout>,
    coordinator: Option<Arc<ParallelCoordinator>>,
) -> ScanResult<EagerReader> {
    let handle = match cache {
        Some(cache) => cache
            .lock()
            .unwrap()
            .get_or_open(source.as_ref(), &file.path)?,
        None => source.open(&file.path)?,
    };
    let path = file.path.to_string_lossy().into_owned();
    let meta = SegmentMeta::read_from(handle.as_ref(), &path)?;
    Ok(EagerReader::new(
        reader_id,
        path,
        handle,
        meta,
        Arc::clone(layout),
        file.row_groups.clone(),
        coordinator,
    ))
}
