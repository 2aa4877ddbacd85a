/// Immutable columnar segment files: on-disk metadata, the byte-range
/// transport seam, and the builder used to create segments
pub mod format;
pub mod source;
pub mod writer;

pub use format::{ChunkMeta, ColumnMeta, ColumnStats, RowGroupMeta, SegmentMeta};
pub use source::{LocalSource, SegmentHandle, SegmentSource};
pub use writer::SegmentBuilder;
