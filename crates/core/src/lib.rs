//! Core domain types, entry scanning and macro dumping for VBA source
//! extraction from compound files.

pub mod error;
pub mod scanner;
pub mod transcode;
pub mod types;

pub use error::{Error, Result};
pub use scanner::{EntryScanner, ScanOutcome};
pub use transcode::decode_windows_1252;
pub use types::{InputFormat, ScanMode, ScanReport, ScannedEntry, StreamEntry};
