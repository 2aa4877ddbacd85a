/// Segment builder
/// Writes a fresh immutable segment: checksummed column chunks cut into row
/// groups, per-column statistics, JSON footer. Rewriting an existing segment
/// is not supported anywhere in the engine
use crate::error::{ScanError, ScanResult};
use crate::value::Value;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::format::{ChunkMeta, ColumnMeta, ColumnStats, RowGroupMeta, SegmentMeta, SEGMENT_MAGIC};

pub struct SegmentBuilder {
    path: PathBuf,
    out: BufWriter<File>,
    offset: u64,
    columns: Vec<ColumnMeta>,
    rows_per_group: usize,
    /// Current group's values, one buffer per column
    pending: Vec<Vec<Value>>,
    row_groups: Vec<RowGroupMeta>,
}

impl SegmentBuilder {
    pub fn new(
        path: impl AsRef<Path>,
        columns: Vec<ColumnMeta>,
        rows_per_group: usize,
    ) -> ScanResult<Self> {
        let path = path.as_ref().to_path_buf();
        if columns.is_empty() {
            return Err(ScanError::format_with_path(
                "segment needs at least one column",
                path.to_string_lossy(),
            ));
        }
        let file = File::create(&path).map_err(|e| {
            ScanError::storage_with_path(
                format!("failed to create segment file: {}", e),
                path.to_string_lossy(),
            )
        })?;
        let mut out = BufWriter::new(file);
        out.write_all(SEGMENT_MAGIC).map_err(|e| {
            ScanError::storage_with_path(e.to_string(), path.to_string_lossy())
        })?;
        let pending = columns.iter().map(|_| Vec::new()).collect();
        Ok(Self {
            path,
            out,
            offset: SEGMENT_MAGIC.len() as u64,
            columns,
            rows_per_group: rows_per_group.max(1),
            pending,
            row_groups: Vec::new(),
        })
    }

    /// Append one row; cuts a row group when the cap is reached
    pub fn push_row(&mut self, row: Vec<Value>) -> ScanResult<()> {
        if row.len() != self.columns.len() {
            return Err(ScanError::format_with_path(
                format!(
                    "row has {} values for {} columns",
                    row.len(),
                    self.columns.len()
                ),
                self.path.to_string_lossy(),
            ));
        }
        for (i, value) in row.iter().enumerate() {
            if let Some(t) = value.column_type() {
                if t != self.columns[i].column_type {
                    return Err(ScanError::format_with_path(
                        format!(
                            "value {} does not fit column '{}' of type {:?}",
                            value, self.columns[i].name, self.columns[i].column_type
                        ),
                        self.path.to_string_lossy(),
                    ));
                }
            }
        }
        for (buf, value) in self.pending.iter_mut().zip(row) {
            buf.push(value);
        }
        if self.pending[0].len() >= self.rows_per_group {
            self.cut_group()?;
        }
        Ok(())
    }

    /// Flush the pending rows as one row group
    /// Cutting with no pending rows writes a zero-row group; readers never
    /// schedule those, but files containing them must still decode cleanly
    pub fn cut_group(&mut self) -> ScanResult<()> {
        let row_count = self.pending[0].len() as u64;
        let mut chunks = Vec::with_capacity(self.columns.len());
        let mut stats = Vec::with_capacity(self.columns.len());
        let pending = std::mem::replace(
            &mut self.pending,
            self.columns.iter().map(|_| Vec::new()).collect(),
        );
        for (col, values) in self.columns.iter().zip(pending) {
            let bytes = serde_json::to_vec(&values).map_err(|e| {
                ScanError::format_with_path(
                    format!("failed to encode chunk for '{}': {}", col.name, e),
                    self.path.to_string_lossy(),
                )
            })?;
            let crc = crc32fast::hash(&bytes);
            self.out.write_all(&bytes).map_err(|e| {
                ScanError::storage_with_path(e.to_string(), self.path.to_string_lossy())
            })?;
            chunks.push(ChunkMeta {
                offset: self.offset,
                len: bytes.len() as u64,
                crc32: crc,
            });
            self.offset += bytes.len() as u64;
            stats.push(Some(compute_stats(&values)));
        }
        debug!(
            path = %self.path.display(),
            group = self.row_groups.len(),
            rows = row_count,
            "cut row group"
        );
        self.row_groups.push(RowGroupMeta {
            row_count,
            chunks,
            stats,
        });
        Ok(())
    }

    /// Cut the final group, write the footer, and seal the segment
    pub fn finish(mut self) -> ScanResult<SegmentMeta> {
        if !self.pending[0].is_empty() {
            self.cut_group()?;
        }
        let meta = SegmentMeta {
            columns: self.columns.clone(),
            row_groups: self.row_groups.clone(),
        };
        let footer = meta.encode_footer()?;
        self.out.write_all(&footer).map_err(|e| {
            ScanError::storage_with_path(e.to_string(), self.path.to_string_lossy())
        })?;
        self.out.flush().map_err(|e| {
            ScanError::storage_with_path(e.to_string(), self.path.to_string_lossy())
        })?;
        info!(
            path = %self.path.display(),
            row_groups = meta.row_groups.len(),
            rows = meta.row_groups.iter().map(|g| g.row_count).sum::<u64>(),
            "sealed segment"
        );
        Ok(meta)
    }
}

fn compute_stats(values: &[Value]) -> ColumnStats {
    let mut stats = ColumnStats::default();
    let mut key_min: Option<String> = None;
    let mut key_max: Option<String> = None;
    for value in values {
        if value.is_null() {
            stats.null_count += 1;
            continue;
        }
        match &stats.min {
            Some(min) if min.total_cmp(value).is_le() => {}
            _ => stats.min = Some(value.clone()),
        }
        match &stats.max {
            Some(max) if max.total_cmp(value).is_ge() => {}
            _ => stats.max = Some(value.clone()),
        }
        if let Value::Map(pairs) = value {
            for (key, _) in pairs {
                match &key_min {
                    Some(k) if k.as_str() <= key.as_str() => {}
                    _ => key_min = Some(key.clone()),
                }
                match &key_max {
                    Some(k) if k.as_str() >= key.as_str() => {}
                    _ => key_max = Some(key.clone()),
                }
            }
        }
    }
    stats.key_min = key_min;
    stats.key_max = key_max;
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_skip_nulls() {
        let stats = compute_stats(&[
            Value::Null,
            Value::Int64(5),
            Value::Int64(2),
            Value::Null,
            Value::Int64(9),
        ]);
        assert_eq!(stats.min, Some(Value::Int64(2)));
        assert_eq!(stats.max, Some(Value::Int64(9)));
        assert_eq!(stats.null_count, 2);
    }

    #[test]
    fn test_all_null_stats_have_no_bounds() {
        let stats = compute_stats(&[Value::Null, Value::Null]);
        assert!(stats.min.is_none());
        assert!(stats.max.is_none());
        assert_eq!(stats.null_count, 2);
    }

    #[test]
    fn test_map_key_bounds() {
        let stats = compute_stats(&[
            Value::Map(vec![
                ("beta".into(), Value::Int64(1)),
                ("kappa".into(), Value::Int64(2)),
            ]),
            Value::Map(vec![("delta".into(), Value::Bool(true))]),
        ]);
        assert_eq!(stats.key_min.as_deref(), Some("beta"));
        assert_eq!(stats.key_max.as_deref(), Some("kappa"));
    }
}
