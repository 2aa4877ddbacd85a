/// On-disk segment layout
///
/// A segment file is `magic | column chunks... | footer JSON | trailer`.
/// Each chunk is the serde_json encoding of one column's values for one row
/// group, checksummed independently so a reader can verify exactly the bytes
/// it touches. The trailer is fixed-width: footer length (u32 LE), footer
/// crc32 (u32 LE), magic.
use crate::error::{ScanError, ScanResult};
use crate::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};

use super::source::SegmentHandle;

pub const SEGMENT_MAGIC: &[u8; 4] = b"SGS1";
pub const TRAILER_LEN: u64 = 12;

/// One stored column: name and type
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub column_type: ColumnType,
}

/// Location of one column chunk within the file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChunkMeta {
    pub offset: u64,
    pub len: u64,
    pub crc32: u32,
}

/// Per-row-group, per-column min/max/null-count
/// Decoded lazily: the evaluator only inspects stats for referenced columns.
/// `key_min`/`key_max` cover the member keys of Map columns and back the
/// key-exists pruning used by schemaless field tests
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ColumnStats {
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub null_count: u64,
    pub key_min: Option<String>,
    pub key_max: Option<String>,
}

/// One row group: unit of pruning and parallel distribution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RowGroupMeta {
    pub row_count: u64,
    /// One chunk per stored column, in column order
    pub chunks: Vec<ChunkMeta>,
    /// One stats slot per stored column; None when stats were not recorded
    pub stats: Vec<Option<ColumnStats>>,
}

/// Segment footer: the full description of an immutable segment file
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SegmentMeta {
    pub columns: Vec<ColumnMeta>,
    pub row_groups: Vec<RowGroupMeta>,
}

impl SegmentMeta {
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Encode the footer plus fixed trailer, ready to append after the chunks
    pub fn encode_footer(&self) -> ScanResult<Vec<u8>> {
        let body = serde_json::to_vec(self)
            .map_err(|e| ScanError::format(format!("failed to encode footer: {}", e)))?;
        let crc = crc32fast::hash(&body);
        let mut out = body;
        let body_len = out.len() as u32;
        out.extend_from_slice(&body_len.to_le_bytes());
        out.extend_from_slice(&crc.to_le_bytes());
        out.extend_from_slice(SEGMENT_MAGIC);
        Ok(out)
    }

    /// Read and verify the footer through a byte-range handle
    pub fn read_from(handle: &dyn SegmentHandle, path: &str) -> ScanResult<SegmentMeta> {
        let size = handle.size();
        if size < SEGMENT_MAGIC.len() as u64 + TRAILER_LEN {
            return Err(ScanError::format_with_path(
                format!("segment too small ({} bytes)", size),
                path,
            ));
        }
        let trailer = handle.read_at(size - TRAILER_LEN, TRAILER_LEN as usize)?;
        if &trailer[8..12] != SEGMENT_MAGIC {
            return Err(ScanError::format_with_path("bad trailer magic", path));
        }
        let footer_len = u32::from_le_bytes([trailer[0], trailer[1], trailer[2], trailer[3]]) as u64;
        let footer_crc = u32::from_le_bytes([trailer[4], trailer[5], trailer[6], trailer[7]]);
        if footer_len + TRAILER_LEN + SEGMENT_MAGIC.len() as u64 > size {
            return Err(ScanError::format_with_path(
                format!("footer length {} exceeds file size {}", footer_len, size),
                path,
            ));
        }
        let body = handle.read_at(size - TRAILER_LEN - footer_len, footer_len as usize)?;
        if crc32fast::hash(&body) != footer_crc {
            return Err(ScanError::format_with_path("footer checksum mismatch", path));
        }
        let meta: SegmentMeta = serde_json::from_slice(&body)
            .map_err(|e| ScanError::format_with_path(format!("footer does not parse: {}", e), path))?;
        for (g, group) in meta.row_groups.iter().enumerate() {
            if group.chunks.len() != meta.columns.len() || group.stats.len() != meta.columns.len() {
                return Err(ScanError::format_with_path(
                    format!(
                        "row group {} has {} chunks / {} stats for {} columns",
                        g,
                        group.chunks.len(),
                        group.stats.len(),
                        meta.columns.len()
                    ),
                    path,
                ));
            }
        }
        Ok(meta)
    }
}

/// Read, verify, and parse one column chunk into its value array
pub fn decode_chunk(
    handle: &dyn SegmentHandle,
    chunk: &ChunkMeta,
    expected_rows: u64,
    path: &str,
) -> ScanResult<Vec<Value>> {
    let bytes = handle.read_at(chunk.offset, chunk.len as usize)?;
    if crc32fast::hash(&bytes) != chunk.crc32 {
        return Err(ScanError::format_with_path(
            format!("chunk checksum mismatch at offset {}", chunk.offset),
            path,
        ));
    }
    let values: Vec<Value> = serde_json::from_slice(&bytes).map_err(|e| {
        ScanError::format_with_path(
            format!("chunk at offset {} does not parse: {}", chunk.offset, e),
            path,
        )
    })?;
    if values.len() as u64 != expected_rows {
        return Err(ScanError::format_with_path(
            format!(
                "chunk at offset {} holds {} values, row group declares {}",
                chunk.offset,
                values.len(),
                expected_rows
            ),
            path,
        ));
    }
    Ok(values)
}
