//! Zip archive reader implementation.

use std::io::{Read, Seek};
use vbadump_core::types::is_compound_file;
use vbadump_core::{Error, Result};
use zip::ZipArchive;

/// A compound file found inside a zip archive.
#[derive(Debug, Clone)]
pub struct EmbeddedFile {
    /// Member name inside the archive, e.g. `word/vbaProject.bin`.
    pub name: String,

    /// Uncompressed size recorded in the archive.
    pub uncompressed_size: u64,

    /// Raw member bytes.
    pub bytes: Vec<u8>,
}

/// Reader that pulls embedded compound files out of zip archives.
pub struct ArchiveReader;

impl ArchiveReader {
    /// Create a new archive reader.
    pub fn new() -> Self {
        Self
    }

    /// Collect every archive member whose bytes start with the compound
    /// file magic, in archive order.
    pub fn embedded_compound_files<R: Read + Seek>(&self, reader: R) -> Result<Vec<EmbeddedFile>> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let mut found = Vec::new();

        for i in 0..archive.len() {
            let mut member = archive
                .by_index(i)
                .map_err(|e| Error::ZipError(format!("Failed to read member {}: {}", i, e)))?;

            if member.is_dir() {
                continue;
            }

            let name = member.name().to_string();
            let uncompressed_size = member.size();

            let mut bytes = Vec::new();
            member
                .read_to_end(&mut bytes)
                .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?;

            if !is_compound_file(&bytes) {
                log::debug!("Skipping archive member '{}' (not a compound file)", name);
                continue;
            }

            log::debug!(
                "Found compound file '{}' ({} bytes) in archive",
                name,
                uncompressed_size
            );

            found.push(EmbeddedFile {
                name,
                uncompressed_size,
                bytes,
            });
        }

        Ok(found)
    }
}

impl Default for ArchiveReader {
    fn default() -> Self {
        Self::new()
    }
}
