//! WinAnsiEncoding (code page 1252), the single-byte encoding used for every
//! font in the generated PDF.

/// Code points of bytes 0x80..=0x9F. `None` marks the five unassigned slots.
const HIGH_CONTROL_RANGE: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

/// Byte used for characters the encoding cannot represent.
pub const REPLACEMENT: u8 = b'?';

/// Maps a character to its WinAnsi byte, if it has one.
pub fn encode_char(c: char) -> Option<u8> {
    let code = c as u32;
    match code {
        0x20..=0x7E | 0xA0..=0xFF => Some(code as u8),
        _ => HIGH_CONTROL_RANGE
            .iter()
            .position(|slot| *slot == Some(c))
            .map(|i| 0x80 + i as u8),
    }
}

/// Maps a WinAnsi byte back to its character.
pub fn decode_byte(byte: u8) -> Option<char> {
    match byte {
        0x20..=0x7E | 0xA0..=0xFF => Some(byte as char),
        0x80..=0x9F => HIGH_CONTROL_RANGE[(byte - 0x80) as usize],
        _ => None,
    }
}

/// Encodes a string for a PDF text operator. Tabs become spaces, other
/// unrepresentable characters become `?`.
pub fn encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            _ => encode_char(c).unwrap_or(REPLACEMENT),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_and_latin1_map_to_themselves() {
        assert_eq!(encode("Abc"), b"Abc".to_vec());
        assert_eq!(encode("ü"), vec![0xFC]);
        assert_eq!(encode("ß"), vec![0xDF]);
    }

    #[test]
    fn test_typographic_characters() {
        assert_eq!(encode_char('•'), Some(0x95));
        assert_eq!(encode_char('–'), Some(0x96));
        assert_eq!(encode_char('€'), Some(0x80));
        assert_eq!(encode_char('„'), Some(0x84));
    }

    #[test]
    fn test_unmappable_becomes_question_mark() {
        assert_eq!(encode("→"), vec![REPLACEMENT]);
        assert_eq!(encode("\t"), vec![b' ']);
    }

    #[test]
    fn test_decode_roundtrips_assigned_bytes() {
        for byte in 0x20u8..=0xFF {
            if let Some(c) = decode_byte(byte) {
                assert_eq!(encode_char(c), Some(byte));
            }
        }
        assert_eq!(decode_byte(0x81), None);
    }
}
