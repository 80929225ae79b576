//! Glyph name to Unicode resolution (spec.md §4.D "Differences array entries name glyphs, not
//! code points"). Carries a subset of the Adobe Glyph List covering the names that show up in
//! real `/Differences` arrays, plus the algorithmic `uniXXXX`/`uXXXX` fallback the AGL spec
//! defines for names it doesn't enumerate.

/// A small, frequently-seen subset of the Adobe Glyph List. Sorted by name for binary search.
const AGL_SUBSET: &[(&str, u16)] = &[
    ("Euro", 0x20AC),
    ("OE", 0x0152),
    ("Scaron", 0x0160),
    ("Ydieresis", 0x0178),
    ("Zcaron", 0x017D),
    ("bullet", 0x2022),
    ("dagger", 0x2020),
    ("daggerdbl", 0x2021),
    ("ellipsis", 0x2026),
    ("emdash", 0x2014),
    ("endash", 0x2013),
    ("fi", 0xFB01),
    ("fl", 0xFB02),
    ("florin", 0x0192),
    ("fraction", 0x2044),
    ("germandbls", 0x00DF),
    ("guillemotleft", 0x00AB),
    ("guillemotright", 0x00BB),
    ("guilsinglleft", 0x2039),
    ("guilsinglright", 0x203A),
    ("minus", 0x2212),
    ("oe", 0x0153),
    ("perthousand", 0x2030),
    ("quotedblbase", 0x201E),
    ("quotedblleft", 0x201C),
    ("quotedblright", 0x201D),
    ("quoteleft", 0x2018),
    ("quoteright", 0x2019),
    ("quotesinglbase", 0x201A),
    ("scaron", 0x0161),
    ("space", 0x0020),
    ("trademark", 0x2122),
    ("zcaron", 0x017E),
];

/// Resolves a PDF glyph name to a Unicode scalar value (spec.md §4.D).
///
/// Resolution order: a single printable ASCII character used as its own name (the overwhelmingly
/// common case for Latin text), the built-in AGL subset, then the algorithmic `uniXXXX` / `uXXXX`
/// forms the Adobe Glyph List spec defines for names it doesn't otherwise cover.
pub fn glyph_name_to_unicode(name: &str) -> Option<u16> {
    if name.len() == 1 {
        if let Some(ch) = name.chars().next() {
            if ch.is_ascii_graphic() {
                return Some(ch as u16);
            }
        }
    }

    if let Ok(index) = AGL_SUBSET.binary_search_by_key(&name, |&(n, _)| n) {
        return Some(AGL_SUBSET[index].1);
    }

    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 {
            if let Ok(code) = u32::from_str_radix(&hex[..4], 16) {
                return u16::try_from(code).ok();
            }
        }
    }

    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Ok(code) = u32::from_str_radix(hex, 16) {
                return u16::try_from(code).ok();
            }
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ascii_char_is_its_own_name() {
        assert_eq!(glyph_name_to_unicode("A"), Some('A' as u16));
    }

    #[test]
    fn agl_subset_resolves_named_punctuation() {
        assert_eq!(glyph_name_to_unicode("bullet"), Some(0x2022));
        assert_eq!(glyph_name_to_unicode("emdash"), Some(0x2014));
    }

    #[test]
    fn unixxxx_fallback_is_algorithmic() {
        assert_eq!(glyph_name_to_unicode("uni0041"), Some(0x0041));
        assert_eq!(glyph_name_to_unicode("u1F600").is_none(), true); // outside BMP, u16 can't hold it
    }

    #[test]
    fn ushort_fallback() {
        assert_eq!(glyph_name_to_unicode("u00E9"), Some(0x00E9));
    }

    #[test]
    fn unknown_name_resolves_to_none() {
        assert_eq!(glyph_name_to_unicode("totallymadeupname"), None);
    }
}
