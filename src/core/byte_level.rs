//! Byte-level rendering of span text.
//!
//! Byte-level vocabularies (GPT-2, Llama 3, DeepSeek) never store raw bytes.
//! Every byte is first replaced by a printable stand-in character so that
//! whitespace and control bytes survive as visible, distinct symbols. The
//! pipeline uses the same table to render each span's token text, which is
//! what a byte-level vocabulary expects to look up.
//!
//! # Mapping
//!
//! - Bytes 33-126, 161-172 and 174-255 map to the character with the same
//!   code point.
//! - The remaining 68 bytes (0-32, 127-160, 173) map, in order, to U+0100
//!   onwards. Space (0x20) becomes `Ġ` (U+0120), newline becomes `Ċ` (U+010A).
//!
//! ```ignore
//! assert_eq!(byte_level_encode(b" def"), "Ġdef");
//! assert_eq!(byte_level_decode("Ġdef").unwrap(), b" def");
//! ```

use rustc_hash::FxHashMap;
use std::sync::LazyLock;

/// Byte value to stand-in character.
static BYTE_TO_CHAR: LazyLock<[char; 256]> = LazyLock::new(|| {
    let mut table = ['\0'; 256];
    let mut shifted = 0x100u32;

    for b in 0u8..=255 {
        table[b as usize] = if is_printable(b) {
            b as char
        } else {
            let ch = char::from_u32(shifted).unwrap_or(char::REPLACEMENT_CHARACTER);
            shifted += 1;
            ch
        };
    }

    table
});

/// Stand-in character back to byte value.
static CHAR_TO_BYTE: LazyLock<FxHashMap<char, u8>> = LazyLock::new(|| {
    BYTE_TO_CHAR
        .iter()
        .enumerate()
        .map(|(byte, &ch)| (ch, byte as u8))
        .collect()
});

#[inline]
fn is_printable(b: u8) -> bool {
    matches!(b, 33..=126 | 161..=172 | 174..=255)
}

/// Render raw bytes as byte-level text.
#[inline]
pub fn byte_level_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| BYTE_TO_CHAR[b as usize]).collect()
}

/// Reverse [`byte_level_encode`].
///
/// Returns `None` if `text` contains a character outside the 256-entry
/// alphabet.
#[inline]
pub fn byte_level_decode(text: &str) -> Option<Vec<u8>> {
    text.chars()
        .map(|ch| CHAR_TO_BYTE.get(&ch).copied())
        .collect()
}

/// Stand-in character for one byte.
#[inline]
pub fn byte_level_char(byte: u8) -> char {
    BYTE_TO_CHAR[byte as usize]
}

/// Whether `ch` belongs to the byte-level alphabet.
#[inline]
pub fn is_byte_level_char(ch: char) -> bool {
    CHAR_TO_BYTE.contains_key(&ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_bijective() {
        let mut seen = rustc_hash::FxHashSet::default();
        for b in 0u8..=255 {
            assert!(seen.insert(byte_level_char(b)), "duplicate for byte {}", b);
        }
        assert_eq!(seen.len(), 256);
        assert_eq!(CHAR_TO_BYTE.len(), 256);
    }

    #[test]
    fn test_every_byte_roundtrips() {
        for b in 0u8..=255 {
            let rendered = byte_level_encode(&[b]);
            assert_eq!(byte_level_decode(&rendered).unwrap(), vec![b]);
        }
    }

    #[test]
    fn test_whitespace_stand_ins() {
        assert_eq!(byte_level_char(b' '), '\u{0120}');
        assert_eq!(byte_level_char(b'\n'), '\u{010A}');
        assert_eq!(byte_level_char(b'\t'), '\u{0109}');
    }

    #[test]
    fn test_printable_ascii_is_unchanged() {
        assert_eq!(byte_level_encode(b"def(x):"), "def(x):");
    }

    #[test]
    fn test_indent_rendering() {
        assert_eq!(byte_level_encode(b"\n    return"), "\u{010A}ĠĠĠĠreturn");
    }

    #[test]
    fn test_multibyte_roundtrip() {
        let original = "Hello, 世界! 🦀";
        let rendered = byte_level_encode(original.as_bytes());
        assert!(rendered.chars().all(is_byte_level_char));
        let bytes = byte_level_decode(&rendered).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), original);
    }

    #[test]
    fn test_decode_rejects_foreign_chars() {
        assert_eq!(byte_level_decode("Ġ世"), None);
    }
}
