//! Transcoding recovered VBA source for display.
//!
//! VBA stores source in the project's ANSI code page. Western projects use
//! Windows-1252, which matches Latin-1 except for the 0x80-0x9F range.

use encoding_rs::WINDOWS_1252;

/// Decode Windows-1252 bytes into a UTF-8 string.
///
/// Bytes the code page leaves undefined (0x81, 0x8D, 0x8F, 0x90, 0x9D) map
/// to the C1 control of the same value.
pub fn decode_windows_1252(bytes: &[u8]) -> String {
    WINDOWS_1252
        .decode_without_bom_handling(bytes)
        .0
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passthrough() {
        assert_eq!(
            decode_windows_1252(b"MsgBox \"Hi\"\n"),
            "MsgBox \"Hi\"\n"
        );
    }

    #[test]
    fn test_high_range() {
        assert_eq!(decode_windows_1252(&[0x80, 0x93, 0x94]), "€\u{201C}\u{201D}");
        assert_eq!(decode_windows_1252(&[0xE9, 0xFC]), "éü");
        assert_eq!(decode_windows_1252(&[0x81, 0x9D]), "\u{81}\u{9D}");
    }

    #[test]
    fn test_bom_bytes_are_text() {
        assert_eq!(decode_windows_1252(&[0xEF, 0xBB, 0xBF]), "ï»¿");
    }
}
