//! Locating the compressed source container inside a raw stream.
//!
//! Every VBA module's source opens with `Attribute VB_Name = ...`. Once
//! compressed, the first token sequence of that text is a `0x00` flag byte,
//! eight literals `Attribut`, another `0x00` flag byte and `e `. The
//! container signature sits three bytes before the first flag byte
//! (signature, then the 2-byte chunk header).

use regex::bytes::Regex;
use std::sync::LazyLock;

/// Byte pattern left by a compressed `Attribute ` prologue.
pub const ATTRIBUTE_MARKER: &[u8] = b"\x00Attribut\x00e ";

/// Distance from the container signature to the start of the marker.
pub const SIGNATURE_LEAD: usize = 3;

static ATTRIBUTE_MARKER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let pattern: String = ATTRIBUTE_MARKER
        .iter()
        .map(|b| format!(r"\x{:02X}", b))
        .collect();
    Regex::new(&pattern).unwrap()
});

/// Find the offset of the compressed container in `stream`.
///
/// Returns `None` when the stream holds no VBA source, which is the normal
/// answer for most compound-file entries.
pub fn locate(stream: &[u8]) -> Option<usize> {
    let found = ATTRIBUTE_MARKER_REGEX.find(stream)?;

    let offset = found.start().checked_sub(SIGNATURE_LEAD);
    if offset.is_none() {
        log::debug!(
            "attribute marker at {} leaves no room for a container header",
            found.start()
        );
    }
    offset
}

/// The compressed container in `stream`, from its signature to the end.
pub fn locate_container(stream: &[u8]) -> Option<&[u8]> {
    locate(stream).map(|offset| &stream[offset..])
}
