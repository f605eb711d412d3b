//! Compound file reader implementation.
//!
//! Walks the directory of an OLE/CFB container and reads the raw bytes of
//! every stream. Storages are reported too (with no data) so that entry
//! numbering matches the container's directory order.

use cfb::CompoundFile;
use std::io::{Read, Seek};
use std::path::{Path, PathBuf};
use vbadump_core::{Error, Result, StreamEntry};

/// A directory entry collected before any stream is opened.
#[derive(Debug)]
struct DirectoryEntry {
    name: String,
    path: PathBuf,
    size: u64,
    is_stream: bool,
}

/// Reader for compound (OLE/CFB) files.
pub struct OleReader;

impl OleReader {
    /// Create a new compound file reader.
    pub fn new() -> Self {
        Self
    }

    /// Read every entry of a compound file, root excluded, in walk order.
    ///
    /// A stream that fails to read is kept with empty data and a warning.
    pub fn read_entries<R: Read + Seek>(&self, reader: R) -> Result<Vec<StreamEntry>> {
        let mut cfb = CompoundFile::open(reader)
            .map_err(|e| Error::CfbError(format!("Failed to open CFB container: {}", e)))?;

        let directory: Vec<DirectoryEntry> = cfb
            .walk()
            .filter(|entry| !entry.is_root())
            .map(|entry| DirectoryEntry {
                name: entry.name().to_string(),
                path: entry.path().to_path_buf(),
                size: entry.len(),
                is_stream: entry.is_stream(),
            })
            .collect();

        log::debug!("CFB container has {} entries", directory.len());

        let mut entries = Vec::with_capacity(directory.len());
        for dir_entry in directory {
            let path = dir_entry.path.to_string_lossy().into_owned();

            if !dir_entry.is_stream {
                entries.push(StreamEntry::storage(dir_entry.name, path));
                continue;
            }

            let data = match self.read_stream(&mut cfb, &dir_entry.path, dir_entry.size) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!("Skipping unreadable stream '{}': {}", path, e);
                    Vec::new()
                }
            };

            entries.push(StreamEntry {
                name: dir_entry.name,
                path,
                declared_size: dir_entry.size,
                is_stream: true,
                data,
            });
        }

        Ok(entries)
    }

    /// Read at most `size` bytes of the stream at `path`.
    fn read_stream<R: Read + Seek>(
        &self,
        cfb: &mut CompoundFile<R>,
        path: &Path,
        size: u64,
    ) -> Result<Vec<u8>> {
        let stream = cfb.open_stream(path).map_err(|e| {
            Error::CfbError(format!(
                "Failed to open stream {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut data = Vec::new();
        stream
            .take(size)
            .read_to_end(&mut data)
            .map_err(|e| Error::CfbError(format!("Failed to read stream: {}", e)))?;

        Ok(data)
    }
}

impl Default for OleReader {
    fn default() -> Self {
        Self::new()
    }
}
