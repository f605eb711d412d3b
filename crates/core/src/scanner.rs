//! Entry scanning and macro dumping.
//!
//! The scanner walks the entries read from one compound file, flags those
//! that carry compressed VBA source, and on request decompresses the source
//! of a single entry picked by its 1-based listing index.

use crate::types::{ScanMode, ScanReport, ScannedEntry, StreamEntry};
use crate::{Error, Result};
use vbadump_ovba::{decompress, locate};

/// What a scan produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Listing of every entry.
    Listing(ScanReport),
    /// Recovered source of the selected entry.
    Dumped { index: usize, source: Vec<u8> },
}

/// Scanner over the entries of one compound file.
#[derive(Debug, Clone, Default)]
pub struct EntryScanner {
    mode: ScanMode,
}

impl EntryScanner {
    /// Create a scanner in listing mode.
    pub fn new() -> Self {
        Self {
            mode: ScanMode::List,
        }
    }

    /// Set the scan mode.
    pub fn with_mode(mut self, mode: ScanMode) -> Self {
        self.mode = mode;
        self
    }

    /// The configured scan mode.
    pub fn mode(&self) -> ScanMode {
        self.mode
    }

    /// Scan or dump, depending on the configured mode.
    pub fn run(&self, source: &str, entries: &[StreamEntry]) -> Result<ScanOutcome> {
        match self.mode {
            ScanMode::List => Ok(ScanOutcome::Listing(self.scan(source, entries))),
            ScanMode::Dump(index) => {
                let index = index.get();
                let source = self.dump(entries, index)?;
                Ok(ScanOutcome::Dumped { index, source })
            }
        }
    }

    /// Flag every entry that carries compressed VBA source.
    ///
    /// Nothing is decompressed here, so a corrupt entry never stops a scan.
    pub fn scan(&self, source: &str, entries: &[StreamEntry]) -> ScanReport {
        let mut report = ScanReport::new(source);

        for (i, entry) in entries.iter().enumerate() {
            let macro_offset = if entry.data.is_empty() {
                None
            } else {
                locate(&entry.data)
            };

            if let Some(offset) = macro_offset {
                log::debug!("{}: VBA source at offset {}", entry.path, offset);
            }

            report.add_entry(ScannedEntry {
                index: i + 1,
                name: entry.name.clone(),
                path: entry.path.clone(),
                size: entry.declared_size,
                macro_offset,
            });
        }

        log::debug!(
            "{}: scanned {} entries, {} with VBA source",
            source,
            report.entries.len(),
            report.macro_entries().count()
        );

        report
    }

    /// Decompress the VBA source of the entry at 1-based `index`.
    pub fn dump(&self, entries: &[StreamEntry], index: usize) -> Result<Vec<u8>> {
        let entry = index
            .checked_sub(1)
            .and_then(|i| entries.get(i))
            .ok_or(Error::EntryNotFound {
                index,
                count: entries.len(),
            })?;

        let offset = locate(&entry.data).ok_or_else(|| Error::NoMacroSource {
            index,
            name: entry.name.clone(),
        })?;

        log::debug!(
            "Decompressing {} from offset {} ({} bytes)",
            entry.path,
            offset,
            entry.data.len() - offset
        );

        let source = decompress(&entry.data[offset..])?;
        Ok(source)
    }
}
