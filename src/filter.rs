/// Row-group filter evaluator
///
/// Pure min/max reasoning over column statistics: a row group survives a
/// predicate when it *may* contain a matching row. Missing statistics never
/// exclude. Predicates AND-combine per group with short-circuit on the first
/// excluding one — a performance shortcut, not a semantic change
use crate::config::MatchedFile;
use crate::error::{ScanError, ScanResult};
use crate::segment::{ColumnStats, RowGroupMeta, SegmentMeta, SegmentSource};
use crate::value::{ColumnType, Value};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use tracing::{debug, info};

/// Comparison kinds supported by row-group pruning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    /// Map-column membership: "does field X exist" in typed map columns and
    /// in schemaless documents alike
    KeyExists,
}

/// One bound predicate: column, comparison kind, coerced constant
#[derive(Clone, Debug)]
pub struct Predicate {
    pub column: String,
    pub op: CompareOp,
    pub constant: Value,
}

impl Predicate {
    /// Bind a predicate against a column type, coercing the constant once
    /// Ordering comparisons are rejected on List/Map columns; key-exists
    /// requires a Map column and a string key
    pub fn bind(
        column: impl Into<String>,
        op: CompareOp,
        constant: Value,
        column_type: ColumnType,
    ) -> ScanResult<Predicate> {
        let column = column.into();
        match op {
            CompareOp::KeyExists => {
                if column_type != ColumnType::Map {
                    return Err(ScanError::coercion(
                        format!("key-exists requires a Map column, found {:?}", column_type),
                        column,
                    ));
                }
                if !matches!(constant, Value::String(_)) {
                    return Err(ScanError::coercion(
                        format!("key-exists requires a string key, found {}", constant),
                        column,
                    ));
                }
                Ok(Predicate {
                    column,
                    op,
                    constant,
                })
            }
            _ => {
                if matches!(column_type, ColumnType::List | ColumnType::Map) {
                    return Err(ScanError::coercion(
                        format!(
                            "ordering comparison is not defined on {:?} columns",
                            column_type
                        ),
                        column,
                    ));
                }
                let constant = constant.coerce_to(column_type, &column)?;
                Ok(Predicate {
                    column,
                    op,
                    constant,
                })
            }
        }
    }
}

/// Running totals across all pruned files, for planner cost estimation
#[derive(Debug, Default)]
pub struct FilterCounters {
    total_rows: AtomicU64,
    matched_rows: AtomicU64,
}

impl FilterCounters {
    pub fn total_rows(&self) -> u64 {
        self.total_rows.load(AtomicOrdering::Relaxed)
    }

    pub fn matched_rows(&self) -> u64 {
        self.matched_rows.load(AtomicOrdering::Relaxed)
    }
}

/// Can the group contain a row matching the predicate?
/// `stats == None` means the statistic was never recorded: conservative match.
/// An all-null group (bounds absent, null_count equals row count) is a
/// recorded fact and excludes every ordering comparison
pub fn group_matches(pred: &Predicate, stats: Option<&ColumnStats>, row_count: u64) -> bool {
    let Some(stats) = stats else { return true };
    if pred.op == CompareOp::KeyExists {
        let Value::String(key) = &pred.constant else {
            return true;
        };
        return match (&stats.key_min, &stats.key_max) {
            (Some(lo), Some(hi)) => lo.as_str() <= key.as_str() && key.as_str() <= hi.as_str(),
            _ => true,
        };
    }
    if stats.min.is_none() && stats.max.is_none() {
        return !(row_count > 0 && stats.null_count == row_count);
    }
    let v = &pred.constant;
    match pred.op {
        CompareOp::Eq => {
            if let Some(min) = &stats.min {
                if min.total_cmp(v) == Ordering::Greater {
                    return false;
                }
            }
            if let Some(max) = &stats.max {
                if max.total_cmp(v) == Ordering::Less {
                    return false;
                }
            }
            true
        }
        CompareOp::Lt => stats
            .min
            .as_ref()
            .map_or(true, |min| min.total_cmp(v) == Ordering::Less),
        CompareOp::Le => stats
            .min
            .as_ref()
            .map_or(true, |min| min.total_cmp(v) != Ordering::Greater),
        CompareOp::Gt => stats
            .max
            .as_ref()
            .map_or(true, |max| max.total_cmp(v) == Ordering::Greater),
        CompareOp::Ge => stats
            .max
            .as_ref()
            .map_or(true, |max| max.total_cmp(v) != Ordering::Less),
        CompareOp::KeyExists => unreachable!("handled above"),
    }
}

/// AND-combined evaluation for one row group
/// `column_slots[i]` is the predicate's column index within this file's
/// schema, None when the file does not carry the column (conservative match)
pub fn row_group_survives(
    predicates: &[Predicate],
    column_slots: &[Option<usize>],
    group: &RowGroupMeta,
) -> bool {
    for (pred, slot) in predicates.iter().zip(column_slots) {
        let stats = slot.and_then(|i| group.stats.get(i).and_then(|s| s.as_ref()));
        if !group_matches(pred, stats, group.row_count) {
            return false;
        }
    }
    true
}

/// Prune the row groups of one already-decoded segment footer
pub fn prune_segment(meta: &SegmentMeta, predicates: &[Predicate]) -> (Vec<usize>, u64, u64) {
    let column_slots: Vec<Option<usize>> = predicates
        .iter()
        .map(|p| meta.column_index(&p.column))
        .collect();
    let mut surviving = Vec::new();
    let mut total = 0u64;
    let mut matched = 0u64;
    for (ordinal, group) in meta.row_groups.iter().enumerate() {
        // Zero-row groups are never scheduled
        if group.row_count == 0 {
            continue;
        }
        total += group.row_count;
        if row_group_survives(predicates, &column_slots, group) {
            matched += group.row_count;
            surviving.push(ordinal);
        }
    }
    (surviving, total, matched)
}

/// Prune many files in parallel, reading footers only
/// Files whose surviving list is empty drop out of the plan; counters
/// accumulate across all files
pub fn prune(
    source: &dyn SegmentSource,
    paths: &[PathBuf],
    predicates: &[Predicate],
    counters: &FilterCounters,
) -> ScanResult<Vec<MatchedFile>> {
    let pruned: Vec<ScanResult<MatchedFile>> = paths
        .par_iter()
        .map(|path| {
            let handle = source.open(path)?;
            let meta = SegmentMeta::read_from(handle.as_ref(), &path.to_string_lossy())?;
            let (surviving, total, matched) = prune_segment(&meta, predicates);
            counters.total_rows.fetch_add(total, AtomicOrdering::Relaxed);
            counters
                .matched_rows
                .fetch_add(matched, AtomicOrdering::Relaxed);
            debug!(
                path = %path.display(),
                groups = meta.row_groups.len(),
                surviving = surviving.len(),
                "pruned segment"
            );
            Ok(MatchedFile {
                path: path.clone(),
                row_groups: surviving,
            })
        })
        .collect();
    let mut files = Vec::with_capacity(paths.len());
    for result in pruned {
        let matched = result?;
        if !matched.row_groups.is_empty() {
            files.push(matched);
        }
    }
    info!(
        candidates = paths.len(),
        matched_files = files.len(),
        total_rows = counters.total_rows(),
        matched_rows = counters.matched_rows(),
        "row-group pruning complete"
    );
    Ok(files)
}
