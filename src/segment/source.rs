/// Byte-range storage transport seam
/// The engine only ever asks a handle for sized reads at offsets; local disk
/// is the default implementation, remote transports plug in behind the same
/// pair of traits
use crate::error::{ScanError, ScanResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::debug;

/// An open segment file: positionless reads plus total size
pub trait SegmentHandle: Send + Sync {
    fn read_at(&self, offset: u64, len: usize) -> ScanResult<Vec<u8>>;
    fn size(&self) -> u64;
}

impl std::fmt::Debug for dyn SegmentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentHandle")
            .field("size", &self.size())
            .finish()
    }
}

/// Opens segment files by path
pub trait SegmentSource: Send + Sync {
    fn open(&self, path: &Path) -> ScanResult<Arc<dyn SegmentHandle>>;
}

/// Local filesystem source
#[derive(Clone, Debug, Default)]
pub struct LocalSource;

impl LocalSource {
    pub fn new() -> Self {
        Self
    }
}

struct LocalHandle {
    file: Mutex<File>,
    size: u64,
    path: PathBuf,
}

impl SegmentSource for LocalSource {
    fn open(&self, path: &Path) -> ScanResult<Arc<dyn SegmentHandle>> {
        let file = File::open(path).map_err(|e| {
            ScanError::storage_with_path(
                format!("failed to open segment file: {}", e),
                path.to_string_lossy(),
            )
        })?;
        let size = file
            .metadata()
            .map_err(|e| {
                ScanError::storage_with_path(
                    format!("failed to stat segment file: {}", e),
                    path.to_string_lossy(),
                )
            })?
            .len();
        debug!(path = %path.display(), size, "opened segment file");
        Ok(Arc::new(LocalHandle {
            file: Mutex::new(file),
            size,
            path: path.to_path_buf(),
        }))
    }
}

impl SegmentHandle for LocalHandle {
    fn read_at(&self, offset: u64, len: usize) -> ScanResult<Vec<u8>> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| ScanError::consistency("segment handle lock poisoned"))?;
        file.seek(SeekFrom::Start(offset)).map_err(|e| {
            ScanError::storage_with_path(
                format!("seek to {} failed: {}", offset, e),
                self.path.to_string_lossy(),
            )
        })?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf).map_err(|e| {
            ScanError::storage_with_path(
                format!("read of {} bytes at {} failed: {}", len, offset, e),
                self.path.to_string_lossy(),
            )
        })?;
        Ok(buf)
    }

    fn size(&self) -> u64 {
        self.size
    }
}
