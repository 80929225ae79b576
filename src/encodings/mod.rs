//! Base text encodings and CMap lookups (spec.md §4.D "Encoding resolution", §4.H "Text strings").

mod cmap;
mod glyphnames;
mod mappings;

pub use cmap::{ToUnicodeCMap, UnicodeCMapError};
pub use glyphnames::glyph_name_to_unicode;
pub use mappings::{MAC_ROMAN_ENCODING, PDF_DOC_ENCODING, STANDARD_ENCODING, WIN_ANSI_ENCODING};

/// One of the four named base encodings a simple font can select (spec.md §4.D).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseEncoding {
    Standard,
    MacRoman,
    WinAnsi,
    PdfDoc,
}

impl BaseEncoding {
    pub fn from_name(name: &[u8]) -> Option<BaseEncoding> {
        match name {
            b"StandardEncoding" => Some(BaseEncoding::Standard),
            b"MacRomanEncoding" => Some(BaseEncoding::MacRoman),
            b"WinAnsiEncoding" => Some(BaseEncoding::WinAnsi),
            b"PDFDocEncoding" => Some(BaseEncoding::PdfDoc),
            _ => None,
        }
    }

    pub fn table(self) -> &'static [Option<u16>; 256] {
        match self {
            BaseEncoding::Standard => &STANDARD_ENCODING,
            BaseEncoding::MacRoman => &MAC_ROMAN_ENCODING,
            BaseEncoding::WinAnsi => &WIN_ANSI_ENCODING,
            BaseEncoding::PdfDoc => &PDF_DOC_ENCODING,
        }
    }
}

/// Decodes single-byte codes through a 256-entry table, skipping unmapped codes (spec.md §4.D).
pub fn bytes_to_string(encoding: &[Option<u16>; 256], bytes: &[u8]) -> String {
    let code_points: Vec<u16> = bytes.iter().filter_map(|&b| encoding[b as usize]).collect();
    String::from_utf16_lossy(&code_points)
}

/// Inverse of [`bytes_to_string`]: maps each character back to its single-byte code, dropping
/// characters the encoding cannot represent.
pub fn string_to_bytes(encoding: &[Option<u16>; 256], text: &str) -> Vec<u8> {
    text.chars()
        .filter_map(|ch| {
            let code = ch as u16;
            encoding.iter().position(|&c| c == Some(code)).map(|byte| byte as u8)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn win_ansi_round_trips_ascii() {
        let bytes = b"Hello, World!";
        let s = bytes_to_string(&WIN_ANSI_ENCODING, bytes);
        assert_eq!(s, "Hello, World!");
        assert_eq!(string_to_bytes(&WIN_ANSI_ENCODING, &s), bytes);
    }

    #[test]
    fn base_encoding_from_name_is_case_sensitive_and_exact() {
        assert_eq!(BaseEncoding::from_name(b"WinAnsiEncoding"), Some(BaseEncoding::WinAnsi));
        assert_eq!(BaseEncoding::from_name(b"winansiencoding"), None);
    }
}
