//! Read-only memory-mapped files backing RPS profile databases.

use memmap2::Mmap;
use std::fs::File;
use std::path::{Path, PathBuf};

use crate::error::{LookupError, Result};

/// A read-only memory-mapped file.
///
/// The mapping outlives every table borrowed from it; lookup tables hold slices
/// into [`as_bytes`](MappedFile::as_bytes) and never unmap anything themselves.
#[derive(Debug)]
pub struct MappedFile {
    path: PathBuf,
    _file: File,
    mmap: Mmap,
}

impl MappedFile {
    /// Open and memory-map a file. Any failure is `MappingUnavailable`.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the file is not modified by another process
    /// while the mapping is active. Profile databases are written once by the
    /// database builder and only read afterwards.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let unavailable = |source| LookupError::MappingUnavailable {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(unavailable)?;
        // SAFETY: We hold the File open for the lifetime of the mapping.
        // The caller is responsible for ensuring no concurrent modification.
        let mmap = unsafe { Mmap::map(&file) }.map_err(unavailable)?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
            mmap,
        })
    }

    /// The mapped bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.mmap
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.mmap.len()
    }

    /// Whether the mapped region is empty.
    pub fn is_empty(&self) -> bool {
        self.mmap.is_empty()
    }
}

impl AsRef<[u8]> for MappedFile {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}
