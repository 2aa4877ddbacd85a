/// Scan configuration and the plan handed to the engine
/// The matched file / row-group lists are computed once (by `prune` or an
/// external planner) and fixed for the lifetime of the execution state
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Engine knobs
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Upper bound on simultaneously open handles in the caching sorted-merge
    /// strategy; 0 means unbounded
    pub max_open_files: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_open_files: 0 }
    }
}

/// Which decoded columns reach the output record, and in what order
/// In schemaless mode every stored column folds into a single self-describing
/// Map document occupying the only output slot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputLayout {
    pub columns: Vec<String>,
    pub schemaless: bool,
}

impl OutputLayout {
    pub fn typed(columns: Vec<String>) -> Self {
        Self {
            columns,
            schemaless: false,
        }
    }

    pub fn schemaless() -> Self {
        Self {
            columns: Vec::new(),
            schemaless: true,
        }
    }

    /// Number of output record slots
    pub fn width(&self) -> usize {
        if self.schemaless {
            1
        } else {
            self.columns.len()
        }
    }
}

/// One segment file with its surviving row-group ordinals
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MatchedFile {
    pub path: PathBuf,
    pub row_groups: Vec<usize>,
}

/// Everything the execution state needs at construction
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScanPlan {
    pub files: Vec<MatchedFile>,
    pub layout: OutputLayout,
    /// Sort-key column names, nulls-first ascending; empty when no global
    /// order is requested
    pub sort_keys: Vec<String>,
}

impl ScanPlan {
    pub fn unsorted(files: Vec<MatchedFile>, layout: OutputLayout) -> Self {
        Self {
            files,
            layout,
            sort_keys: Vec::new(),
        }
    }

    pub fn sorted(files: Vec<MatchedFile>, layout: OutputLayout, sort_keys: Vec<String>) -> Self {
        Self {
            files,
            layout,
            sort_keys,
        }
    }
}
