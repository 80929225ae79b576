//! Font records and encoding resolution (spec.md §4.H "Fonts & Encodings"). Resolves a content
//! stream's `/Fn` resource name into glyph widths and code→Unicode mappings; read-only (no glyph
//! outlines or embedded-program parsing, which are out of scope per spec.md's Non-goals).

use crate::document::Document;
use crate::encodings::{glyph_name_to_unicode, BaseEncoding, ToUnicodeCMap};
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object};
use bitflags::bitflags;

bitflags! {
    /// `FontDescriptor /Flags` (ISO 32000-1 Table 123): one bit per named font capability.
    #[derive(Clone, Copy, Debug, Eq, PartialEq)]
    struct FontFlags: i64 {
        const FIXED_PITCH = 1 << 0;
        const SERIF = 1 << 1;
        const SYMBOLIC = 1 << 2;
        const SCRIPT = 1 << 3;
        const NONSYMBOLIC = 1 << 5;
        const ITALIC = 1 << 6;
        const ALL_CAP = 1 << 16;
        const SMALL_CAP = 1 << 17;
        const FORCE_BOLD = 1 << 18;
    }
}

/// `Subtype` of a `/Type /Font` dictionary (spec.md §4.H "Font record").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subtype {
    Type1,
    TrueType,
    Type3,
    Type0,
    CIDFontType0,
    CIDFontType2,
    MMType1,
    Other,
}

impl Subtype {
    fn from_name(name: &[u8]) -> Subtype {
        match name {
            b"Type1" => Subtype::Type1,
            b"TrueType" => Subtype::TrueType,
            b"Type3" => Subtype::Type3,
            b"Type0" => Subtype::Type0,
            b"CIDFontType0" => Subtype::CIDFontType0,
            b"CIDFontType2" => Subtype::CIDFontType2,
            b"MMType1" => Subtype::MMType1,
            _ => Subtype::Other,
        }
    }
}

/// A resolved font resource: widths, encoding, and `ToUnicode` lookup (spec.md §4.H).
pub struct Font {
    pub subtype: Subtype,
    first_char: i64,
    widths: Vec<f32>,
    missing_width: f32,
    standard14: Option<&'static [f32; 95]>,
    font_matrix: Option<[f32; 6]>,
    encoding_table: [Option<u16>; 256],
    to_unicode: Option<ToUnicodeCMap>,
    composite: bool,
    fixed_pitch: bool,
}

impl Font {
    /// Resolves resource name `name` (e.g. `b"F1"`) through `resources`' `/Font` subdictionary
    /// (spec.md §4.G "Text state": `Tf F size`).
    pub fn load(doc: &Document, resources: &Object, name: &[u8]) -> Result<Font> {
        let resources_dict = resources.as_dict()?;
        let fonts = doc.resolve(resources_dict.get(b"Font")?)?;
        let fonts_dict = fonts.as_dict()?;
        let font_obj = doc.resolve(fonts_dict.get(name)?)?;
        let dict = font_obj.as_dict()?;

        let subtype = dict.get_opt(b"Subtype").and_then(|o| o.as_name().ok()).map(Subtype::from_name).unwrap_or(Subtype::Other);
        let composite = matches!(subtype, Subtype::Type0 | Subtype::CIDFontType0 | Subtype::CIDFontType2);

        let first_char = dict.get_opt(b"FirstChar").and_then(|o| o.as_i64().ok()).unwrap_or(0);
        let widths: Vec<f32> = match dict.get_opt(b"Widths") {
            Some(obj) => doc.resolve(obj)?.as_array()?.iter().map(|w| w.as_float().unwrap_or(0.0)).collect(),
            None => Vec::new(),
        };

        let missing_width = dict
            .get_opt(b"FontDescriptor")
            .and_then(|o| doc.resolve(o).ok())
            .and_then(|fd| fd.as_dict().ok().and_then(|d| d.get_opt(b"MissingWidth")).and_then(|w| w.as_float().ok()))
            .unwrap_or(0.0);

        let base_font = dict.get_opt(b"BaseFont").and_then(|o| o.as_name().ok());
        let standard14 = base_font.and_then(standard14_widths);

        let font_matrix = if subtype == Subtype::Type3 {
            dict.get_opt(b"FontMatrix").and_then(|o| o.as_array().ok()).and_then(|a| {
                if a.len() == 6 {
                    Some([
                        a[0].as_float().unwrap_or(0.001),
                        a[1].as_float().unwrap_or(0.0),
                        a[2].as_float().unwrap_or(0.0),
                        a[3].as_float().unwrap_or(0.001),
                        a[4].as_float().unwrap_or(0.0),
                        a[5].as_float().unwrap_or(0.0),
                    ])
                } else {
                    None
                }
            })
        } else {
            None
        };

        let encoding_table = resolve_encoding(doc, dict)?;

        let to_unicode = dict.get_opt(b"ToUnicode").and_then(|obj| doc.resolve(obj).ok()).and_then(|resolved| {
            let stream = resolved.as_stream().ok()?;
            let bytes = stream.decoded().ok()?;
            ToUnicodeCMap::parse(&bytes).ok()
        });

        // A Standard 14 Courier family is fixed-pitch even when it carries no descriptor of its own.
        let fixed_pitch = dict
            .get_opt(b"FontDescriptor")
            .and_then(|o| doc.resolve(o).ok())
            .and_then(|fd| fd.as_dict().ok().and_then(|d| d.get_opt(b"Flags")).and_then(|f| f.as_i64().ok()))
            .map(|flags| FontFlags::from_bits_truncate(flags).contains(FontFlags::FIXED_PITCH))
            .unwrap_or_else(|| base_font.is_some_and(|n| String::from_utf8_lossy(n).contains("Courier")));

        Ok(Font {
            subtype,
            first_char,
            widths,
            missing_width,
            standard14,
            font_matrix,
            encoding_table,
            to_unicode,
            composite,
            fixed_pitch,
        })
    }

    /// Splits a show-string's raw bytes into character codes: two bytes per code for composite
    /// (Type0) fonts, one byte per code for simple fonts (spec.md §4.H leaves Type0's CMap
    /// encoding as a supplemental detail; this crate assumes the common Identity-H/V case).
    pub fn decode_codes(&self, bytes: &[u8]) -> Vec<u16> {
        if self.composite {
            bytes.chunks(2).map(|c| if c.len() == 2 { u16::from_be_bytes([c[0], c[1]]) } else { c[0] as u16 }).collect()
        } else {
            bytes.iter().map(|&b| b as u16).collect()
        }
    }

    pub fn code_length(&self) -> usize {
        if self.composite {
            2
        } else {
            1
        }
    }

    /// Whether every glyph advances by the same width (spec.md §4.I "TextBlock" fixed-width flag):
    /// used by the renderer to convert gaps to spaces without trusting a single glyph's metric.
    pub fn is_fixed_pitch(&self) -> bool {
        self.fixed_pitch
    }

    /// Text-space width of the space glyph (code 0x20), used to size inter-block gaps during text
    /// extraction (spec.md §4.I).
    pub fn space_width(&self) -> f32 {
        self.glyph_width(0x20)
    }

    /// Glyph-space → text-space width (spec.md §4.H: Type1/TrueType scale by 1/1000; Type3 uses
    /// `FontMatrix`).
    pub fn glyph_width(&self, code: u16) -> f32 {
        let raw = self.raw_width(code);
        match self.font_matrix {
            Some(m) => raw * m[0],
            None => raw / 1000.0,
        }
    }

    fn raw_width(&self, code: u16) -> f32 {
        if !self.widths.is_empty() {
            let idx = code as i64 - self.first_char;
            return if idx >= 0 && (idx as usize) < self.widths.len() {
                self.widths[idx as usize]
            } else {
                self.missing_width
            };
        }
        if let Some(table) = self.standard14 {
            if (32..=126).contains(&code) {
                return table[(code - 32) as usize];
            }
        }
        self.missing_width
    }

    /// Code → Unicode (spec.md §4.H "Code → glyph name → Unicode"): `ToUnicode` first, else the
    /// resolved encoding table.
    pub fn to_unicode(&self, code: u16) -> Option<String> {
        if let Some(cmap) = &self.to_unicode {
            if let Some(units) = cmap.get(code) {
                return Some(String::from_utf16_lossy(&units));
            }
        }
        if !self.composite && (code as usize) < 256 {
            if let Some(unit) = self.encoding_table[code as usize] {
                return char::from_u32(unit as u32).map(|c| c.to_string());
            }
        }
        None
    }
}

/// Resolves `/Encoding` (a base-encoding name, or a dictionary with `BaseEncoding` +
/// `Differences`) into a flat 256-entry code→Unicode table (spec.md §4.H "Encoding resolution").
fn resolve_encoding(doc: &Document, dict: &Dictionary) -> Result<[Option<u16>; 256]> {
    let mut table = *BaseEncoding::Standard.table();
    let Some(enc_obj) = dict.get_opt(b"Encoding") else {
        return Ok(table);
    };
    let resolved = doc.resolve(enc_obj)?;
    match &resolved {
        Object::Name(name) => {
            if let Some(base) = BaseEncoding::from_name(name) {
                table = *base.table();
            }
        }
        Object::Dictionary(enc_dict) => {
            if let Some(base_name) = enc_dict.get_opt(b"BaseEncoding").and_then(|o| o.as_name().ok()) {
                if let Some(base) = BaseEncoding::from_name(base_name) {
                    table = *base.table();
                }
            }
            if let Some(diffs) = enc_dict.get_opt(b"Differences").and_then(|o| o.as_array().ok()) {
                apply_differences(diffs, &mut table);
            }
        }
        _ => {}
    }
    Ok(table)
}

/// A `Differences` array is `[n1 /name /name ... n2 /name ...]`: an integer sets the cursor, each
/// following name assigns to the cursor and advances it (spec.md §4.H).
fn apply_differences(diffs: &[Object], table: &mut [Option<u16>; 256]) {
    let mut cursor: i64 = 0;
    for item in diffs {
        match item {
            Object::Integer(n) => cursor = *n,
            Object::Real(n) => cursor = *n as i64,
            Object::Name(name) => {
                if (0..256).contains(&cursor) {
                    if let Ok(s) = std::str::from_utf8(name) {
                        table[cursor as usize] = glyph_name_to_unicode(s);
                    }
                }
                cursor += 1;
            }
            _ => {}
        }
    }
}

const STANDARD14_NAMES: [&str; 14] = [
    "Helvetica",
    "Helvetica-Bold",
    "Helvetica-Oblique",
    "Helvetica-BoldOblique",
    "Times-Roman",
    "Times-Bold",
    "Times-Italic",
    "Times-BoldItalic",
    "Courier",
    "Courier-Bold",
    "Courier-Oblique",
    "Courier-BoldOblique",
    "Symbol",
    "ZapfDingbats",
];

/// Bundled Adobe Font Metrics widths for the Standard 14 fonts (spec.md §4.H "Standard 14"),
/// covering only the ASCII printable range 32..=126 -- a deliberate partial table (see
/// DESIGN.md): subsetted fonts (`ABCDEF+Helvetica`) and non-ASCII codes fall back to
/// `MissingWidth`/0 rather than carrying the full AFM data volume.
fn standard14_widths(base_font: &[u8]) -> Option<&'static [f32; 95]> {
    let name = std::str::from_utf8(base_font).ok()?;
    let is_standard14 = STANDARD14_NAMES.iter().any(|&s| name == s || name.ends_with(&format!("+{s}")));
    if !is_standard14 {
        return None;
    }
    if name.contains("Courier") {
        Some(&COURIER_WIDTHS)
    } else if name.contains("Times") {
        Some(&TIMES_ROMAN_WIDTHS)
    } else {
        Some(&HELVETICA_WIDTHS)
    }
}

#[rustfmt::skip]
static HELVETICA_WIDTHS: [f32; 95] = [
    278.0, 278.0, 355.0, 556.0, 556.0, 889.0, 667.0, 191.0, 333.0, 333.0, 389.0, 584.0, 278.0, 333.0, 278.0, 278.0,
    556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 556.0, 278.0, 278.0, 584.0, 584.0, 584.0, 556.0,
    1015.0, 667.0, 667.0, 722.0, 722.0, 667.0, 611.0, 778.0, 722.0, 278.0, 500.0, 667.0, 556.0, 833.0, 722.0, 778.0,
    667.0, 778.0, 722.0, 667.0, 611.0, 722.0, 667.0, 944.0, 667.0, 667.0, 611.0, 278.0, 278.0, 278.0, 469.0, 556.0,
    333.0, 556.0, 556.0, 500.0, 556.0, 556.0, 278.0, 556.0, 556.0, 222.0, 222.0, 500.0, 222.0, 833.0, 556.0, 556.0,
    556.0, 556.0, 333.0, 500.0, 278.0, 556.0, 500.0, 722.0, 500.0, 500.0, 500.0, 334.0, 260.0, 334.0, 584.0,
];

#[rustfmt::skip]
static TIMES_ROMAN_WIDTHS: [f32; 95] = [
    250.0, 333.0, 408.0, 500.0, 500.0, 833.0, 778.0, 180.0, 333.0, 333.0, 500.0, 564.0, 250.0, 333.0, 250.0, 278.0,
    500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 500.0, 278.0, 278.0, 564.0, 564.0, 564.0, 444.0,
    921.0, 722.0, 667.0, 667.0, 722.0, 611.0, 556.0, 722.0, 722.0, 333.0, 389.0, 722.0, 611.0, 889.0, 722.0, 722.0,
    556.0, 722.0, 667.0, 556.0, 611.0, 722.0, 722.0, 944.0, 722.0, 722.0, 611.0, 333.0, 278.0, 333.0, 469.0, 500.0,
    333.0, 444.0, 500.0, 444.0, 500.0, 444.0, 333.0, 500.0, 500.0, 278.0, 278.0, 500.0, 278.0, 778.0, 500.0, 500.0,
    500.0, 500.0, 333.0, 389.0, 278.0, 500.0, 500.0, 722.0, 500.0, 500.0, 444.0, 480.0, 200.0, 480.0, 541.0,
];

static COURIER_WIDTHS: [f32; 95] = [600.0; 95];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn font_flags_detects_fixed_pitch_bit() {
        assert!(FontFlags::from_bits_truncate(1).contains(FontFlags::FIXED_PITCH));
        assert!(!FontFlags::from_bits_truncate(1 << 6).contains(FontFlags::FIXED_PITCH));
        assert!(FontFlags::from_bits_truncate(1 << 6).contains(FontFlags::ITALIC));
    }

    #[test]
    fn standard14_detects_family_by_basefont_name() {
        assert!(standard14_widths(b"Helvetica-Bold").is_some());
        assert!(standard14_widths(b"ABCDEF+Courier").is_some());
        assert!(standard14_widths(b"SomeEmbeddedFont").is_none());
    }

    #[test]
    fn differences_array_overrides_base_encoding() {
        let mut table = *BaseEncoding::Standard.table();
        let diffs = vec![Object::Integer(65), Object::Name(b"Euro".to_vec())];
        apply_differences(&diffs, &mut table);
        assert_eq!(table[65], Some(0x20AC));
    }
}
