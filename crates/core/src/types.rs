//! Domain types for compound-file entries and scan results.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;

/// Leading bytes of every compound (OLE/CFB) file.
pub const COMPOUND_FILE_MAGIC: [u8; 4] = [0xD0, 0xCF, 0x11, 0xE0];

/// Leading bytes of a zip local file header.
const ZIP_MAGIC: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Check whether `bytes` start with the compound-file magic.
pub fn is_compound_file(bytes: &[u8]) -> bool {
    bytes.starts_with(&COMPOUND_FILE_MAGIC)
}

/// The container format of an input file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputFormat {
    /// A zip archive that may embed compound files (.docm, .xlsm, ...).
    Zip,
    /// A bare compound file (.doc, .xls, vbaProject.bin, ...).
    CompoundFile,
}

impl InputFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "zip" | "docm" | "docx" | "xlsm" | "xlsx" | "pptm" | "pptx" => Some(Self::Zip),
            "doc" | "dot" | "xls" | "xlt" | "ppt" | "bin" => Some(Self::CompoundFile),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&ZIP_MAGIC) {
            return Some(Self::Zip);
        }

        if is_compound_file(bytes) {
            return Some(Self::CompoundFile);
        }

        None
    }
}

/// One entry of a compound file, as read by the traversal backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamEntry {
    /// Entry name, without its parent storages.
    pub name: String,

    /// Full path inside the compound file, e.g. `/VBA/Module1`.
    pub path: String,

    /// Size recorded in the directory entry.
    pub declared_size: u64,

    /// False for storages, which carry no data.
    pub is_stream: bool,

    /// Raw stream bytes, at most `declared_size` of them.
    pub data: Vec<u8>,
}

impl StreamEntry {
    /// Create a stream entry holding `data`.
    pub fn stream(name: impl Into<String>, path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            declared_size: data.len() as u64,
            is_stream: true,
            data,
        }
    }

    /// Create a storage entry.
    pub fn storage(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            declared_size: 0,
            is_stream: false,
            data: Vec::new(),
        }
    }
}

/// One row of an entry listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannedEntry {
    /// 1-based position in discovery order.
    pub index: usize,

    pub name: String,

    pub path: String,

    /// Declared size in bytes.
    pub size: u64,

    /// Offset of the compressed VBA source, if the entry holds any.
    pub macro_offset: Option<usize>,
}

impl ScannedEntry {
    /// Whether the entry carries compressed VBA source.
    pub fn has_macro(&self) -> bool {
        self.macro_offset.is_some()
    }

    /// `"M"` for macro-bearing entries, empty otherwise.
    pub fn compression_flag(&self) -> &'static str {
        if self.has_macro() {
            "M"
        } else {
            ""
        }
    }

    /// Render the entry as a tab-separated listing line.
    pub fn listing_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t\t{}",
            self.index,
            self.compression_flag(),
            self.size,
            self.name
        )
    }
}

/// Scan result for one compound file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanReport {
    /// Where the compound file came from: a path or an archive member name.
    pub source: String,

    /// Entries in discovery order.
    pub entries: Vec<ScannedEntry>,
}

impl ScanReport {
    /// Create an empty report for the given source.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            entries: Vec::new(),
        }
    }

    /// Add an entry to the report.
    pub fn add_entry(&mut self, entry: ScannedEntry) {
        self.entries.push(entry);
    }

    /// Entries that carry compressed VBA source.
    pub fn macro_entries(&self) -> impl Iterator<Item = &ScannedEntry> {
        self.entries.iter().filter(|e| e.has_macro())
    }

    /// Render every entry as listing lines, each ending with a newline.
    pub fn listing(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.listing_line() + "\n")
            .collect()
    }
}

/// What the entry scanner does with a compound file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanMode {
    /// List every entry with its compression flag.
    #[default]
    List,
    /// Decompress the VBA source of the entry with this 1-based index.
    Dump(NonZeroUsize),
}

impl ScanMode {
    /// Build the mode from a `--select` value; 0 means listing.
    pub fn from_selection(selection: usize) -> Self {
        match NonZeroUsize::new(selection) {
            Some(index) => Self::Dump(index),
            None => Self::List,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_format_from_magic() {
        assert_eq!(
            InputFormat::from_magic(&[0x50, 0x4B, 0x03, 0x04, 0x14]),
            Some(InputFormat::Zip)
        );
        assert_eq!(
            InputFormat::from_magic(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1]),
            Some(InputFormat::CompoundFile)
        );
        assert_eq!(InputFormat::from_magic(b"Sub"), None);
        assert_eq!(InputFormat::from_magic(b"plain text"), None);
    }

    #[test]
    fn test_input_format_from_extension() {
        assert_eq!(InputFormat::from_extension("XLSM"), Some(InputFormat::Zip));
        assert_eq!(
            InputFormat::from_extension("doc"),
            Some(InputFormat::CompoundFile)
        );
        assert_eq!(InputFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_listing_line() {
        let entry = ScannedEntry {
            index: 3,
            name: "Module1".to_string(),
            path: "/VBA/Module1".to_string(),
            size: 1234,
            macro_offset: Some(17),
        };
        assert_eq!(entry.listing_line(), "3\tM\t1234\t\tModule1");

        let entry = ScannedEntry {
            macro_offset: None,
            ..entry
        };
        assert_eq!(entry.listing_line(), "3\t\t1234\t\tModule1");
    }

    #[test]
    fn test_scan_mode_from_selection() {
        assert_eq!(ScanMode::from_selection(0), ScanMode::List);
        assert_eq!(
            ScanMode::from_selection(8),
            ScanMode::Dump(NonZeroUsize::new(8).unwrap())
        );
        assert_eq!(ScanMode::default(), ScanMode::List);
    }

    #[test]
    fn test_stream_entry_constructors() {
        let stream = StreamEntry::stream("dir", "/VBA/dir", vec![1, 2, 3]);
        assert!(stream.is_stream);
        assert_eq!(stream.declared_size, 3);

        let storage = StreamEntry::storage("VBA", "/VBA");
        assert!(!storage.is_stream);
        assert!(storage.data.is_empty());
    }
}
