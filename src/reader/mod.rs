/// Reader abstraction
///
/// A reader is a stateful per-file cursor producing records row-group by
/// row-group. Two implementations share the decode path: `EagerReader` keeps
/// its handle open for its whole life, `CachingReader` can be closed and
/// reopened by its owning strategy without losing its position
use crate::config::OutputLayout;
use crate::error::{ScanError, ScanResult};
use crate::segment::format::decode_chunk;
use crate::segment::{SegmentHandle, SegmentMeta};
use crate::value::Value;
use tracing::debug;

pub mod caching;
pub mod eager;

pub use caching::CachingReader;
pub use eager::EagerReader;

/// Outcome of one `next()` call
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A record was written to the output slot
    Success,
    /// The reader's handle is closed; the owning strategy must activate it
    /// and retry. Never returned spontaneously
    Inactive,
    /// The reader produced its last record
    EndOfData,
}

/// One output record, values in output-layout order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Record {
    pub values: Vec<Value>,
}

impl Record {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One fully decoded row group, projected to the output layout
pub(crate) struct GroupBuffer {
    pub rows: usize,
    /// columns[slot] holds the values for output slot `slot`
    columns: Vec<Vec<Value>>,
}

impl GroupBuffer {
    pub fn fill_record(&self, row: usize, out: &mut Record) {
        out.values.clear();
        for column in &self.columns {
            out.values.push(column[row].clone());
        }
    }
}

/// Decode the referenced columns of one row group
///
/// Typed mode reads exactly the chunks named by the layout; unreferenced
/// columns are never fetched. Schemaless mode reads every stored column and
/// folds each row into one self-describing Map document
pub(crate) fn decode_group(
    handle: &dyn SegmentHandle,
    meta: &SegmentMeta,
    layout: &OutputLayout,
    group_index: usize,
    path: &str,
) -> ScanResult<GroupBuffer> {
    let group = meta.row_groups.get(group_index).ok_or_else(|| {
        ScanError::format_with_path(
            format!(
                "row group {} out of range ({} in segment)",
                group_index,
                meta.row_groups.len()
            ),
            path,
        )
    })?;
    let rows = group.row_count as usize;
    let columns = if layout.schemaless {
        let mut stored = Vec::with_capacity(meta.columns.len());
        for (col, chunk) in meta.columns.iter().zip(&group.chunks) {
            stored.push((
                col.name.clone(),
                decode_chunk(handle, chunk, group.row_count, path)?,
            ));
        }
        let mut documents = Vec::with_capacity(rows);
        for row in 0..rows {
            let pairs = stored
                .iter()
                .map(|(name, values)| (name.clone(), values[row].clone()))
                .collect();
            documents.push(Value::Map(pairs));
        }
        vec![documents]
    } else {
        let mut projected = Vec::with_capacity(layout.columns.len());
        for name in &layout.columns {
            let idx = meta.column_index(name).ok_or_else(|| {
                ScanError::format_with_path(
                    format!("referenced column '{}' is not in the segment", name),
                    path,
                )
            })?;
            projected.push(decode_chunk(handle, &group.chunks[idx], group.row_count, path)?);
        }
        projected
    };
    debug!(path, group = group_index, rows, "decoded row group");
    Ok(GroupBuffer { rows, columns })
}
