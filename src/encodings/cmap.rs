//! `ToUnicodeCMap` (spec.md §4.D "ToUnicode CMaps"): a PostScript-flavored mini-language embedded
//! in a stream, mapping character codes to UTF-16BE Unicode sequences. `bf_ranges` is a
//! `RangeInclusiveMap` so a single `bfrange` entry doesn't need to be expanded into one map entry
//! per code.

use nom::branch::alt;
use nom::bytes::complete::{tag, take_while1};
use nom::character::complete::{char as nom_char, multispace0};
use nom::combinator::map;
use nom::multi::many0;
use nom::sequence::{delimited, preceded, terminated};
use nom::{IResult, Parser};
use rangemap::RangeInclusiveMap;
use std::fmt;

#[derive(Debug)]
pub struct ToUnicodeCMap {
    bf_ranges: RangeInclusiveMap<u16, BfRangeTarget>,
}

#[derive(Debug, PartialEq, Eq, Clone)]
enum BfRangeTarget {
    /// UTF-16BE code units; the last unit is offset by `code - range.start()` on lookup.
    HexString(Vec<u16>),
    /// Consecutive codes map to consecutive code points, stored as an offset from the code.
    CodePoint { offset: u16 },
    ArrayOfHexStrings(Vec<Vec<u16>>),
}

#[derive(Debug)]
pub enum UnicodeCMapError {
    Parse(String),
    UnsupportedCodespaceRange,
    InvalidCodeRange,
}

impl fmt::Display for UnicodeCMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnicodeCMapError::Parse(msg) => write!(f, "could not parse ToUnicode CMap: {msg}"),
            UnicodeCMapError::UnsupportedCodespaceRange => write!(f, "unsupported codespace range"),
            UnicodeCMapError::InvalidCodeRange => write!(f, "invalid bfrange (end < start, or empty target)"),
        }
    }
}

impl std::error::Error for UnicodeCMapError {}

impl Default for ToUnicodeCMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ToUnicodeCMap {
    pub fn new() -> ToUnicodeCMap {
        ToUnicodeCMap { bf_ranges: RangeInclusiveMap::new() }
    }

    /// Parses a `ToUnicode` stream's decoded content.
    pub fn parse(content: &[u8]) -> Result<ToUnicodeCMap, UnicodeCMapError> {
        let (_, sections) = parse_sections(content).map_err(|e| UnicodeCMapError::Parse(e.to_string()))?;
        Self::from_sections(sections)
    }

    fn from_sections(sections: Vec<CMapSection>) -> Result<ToUnicodeCMap, UnicodeCMapError> {
        let mut cmap = ToUnicodeCMap::new();
        for section in sections {
            match section {
                // The codespace range only tells a CMap consumer how many bytes to read per code
                // before a bf-lookup; this reader already receives codes pre-split by the font's
                // own byte width (one or two bytes, see `Font::decode_codes`), so the declared
                // ranges themselves carry no information this type needs -- every shape is
                // accepted and the ranges are otherwise unused.
                CMapSection::CodespaceRange(_) => {}
                CMapSection::BfChar(mappings) => {
                    for (code, dst) in mappings {
                        cmap.put_char(code, dst);
                    }
                }
                CMapSection::BfRange(mappings) => {
                    for ((start, end), dst) in mappings {
                        if end < start {
                            return Err(UnicodeCMapError::InvalidCodeRange);
                        }
                        let target = match dst.len() {
                            0 => return Err(UnicodeCMapError::InvalidCodeRange),
                            1 if dst[0].len() == 1 => BfRangeTarget::CodePoint { offset: dst[0][0].wrapping_sub(start) },
                            1 => BfRangeTarget::HexString(dst[0].clone()),
                            _ => BfRangeTarget::ArrayOfHexStrings(dst),
                        };
                        cmap.bf_ranges.insert(start..=end, target);
                    }
                }
            }
        }
        Ok(cmap)
    }

    /// Looks up the UTF-16 code units a character code maps to, or `None` if unmapped.
    pub fn get(&self, code: u16) -> Option<Vec<u16>> {
        self.bf_ranges.get_key_value(&code).map(|(range, target)| match target {
            BfRangeTarget::HexString(units) => {
                let mut units = units.clone();
                if let Some(last) = units.last_mut() {
                    *last = last.wrapping_add(code - range.start());
                }
                units
            }
            BfRangeTarget::CodePoint { offset } => vec![code.wrapping_add(*offset)],
            BfRangeTarget::ArrayOfHexStrings(strings) => strings[(code - range.start()) as usize].clone(),
        })
    }

    /// Like [`Self::get`], but falls back to U+FFFD (replacement character) for unmapped codes.
    pub fn get_or_replacement_char(&self, code: u16) -> Vec<u16> {
        self.get(code).unwrap_or_else(|| vec![0xFFFD])
    }

    fn put_char(&mut self, code: u16, dst: Vec<u16>) {
        let target = if dst.len() == 1 {
            BfRangeTarget::CodePoint { offset: dst[0].wrapping_sub(code) }
        } else {
            BfRangeTarget::HexString(dst)
        };
        self.bf_ranges.insert(code..=code, target);
    }
}

#[derive(Debug)]
enum CMapSection {
    CodespaceRange(Vec<(u16, u16)>),
    BfChar(Vec<(u16, Vec<u16>)>),
    BfRange(Vec<((u16, u16), Vec<Vec<u16>>)>),
}

fn parse_sections(input: &[u8]) -> IResult<&[u8], Vec<CMapSection>> {
    let (input, sections) =
        many0(alt((codespace_range_section, bf_char_section, bf_range_section, skip_token))).parse(input)?;
    Ok((input, sections.into_iter().flatten().collect()))
}

fn ws(input: &[u8]) -> IResult<&[u8], &[u8]> {
    multispace0(input)
}

fn hex_string(input: &[u8]) -> IResult<&[u8], Vec<u16>> {
    let (input, digits) = delimited(
        nom_char('<'),
        take_while1(|c: u8| c.is_ascii_hexdigit() || c.is_ascii_whitespace()),
        nom_char('>'),
    )
    .parse(input)?;
    let digits: Vec<u8> = digits.iter().copied().filter(|c| !c.is_ascii_whitespace()).collect();
    let mut units = Vec::with_capacity(digits.len() / 4 + 1);
    for chunk in digits.chunks(4) {
        let mut value: u32 = 0;
        for &d in chunk {
            let nibble = (d as char).to_digit(16).unwrap_or(0);
            value = (value << 4) | nibble;
        }
        units.push(value as u16);
    }
    Ok((input, units))
}

fn codespace_range_section(input: &[u8]) -> IResult<&[u8], Vec<CMapSection>> {
    let (input, _) = preceded(ws, tag("begincodespacerange")).parse(input)?;
    let (input, ranges) = many0(preceded(ws, (hex_string, preceded(ws, hex_string)))).parse(input)?;
    let (input, _) = preceded(ws, tag("endcodespacerange")).parse(input)?;
    let ranges = ranges.into_iter().map(|(lo, hi)| (units_to_code(&lo), units_to_code(&hi))).collect();
    Ok((input, vec![CMapSection::CodespaceRange(ranges)]))
}

fn bf_char_section(input: &[u8]) -> IResult<&[u8], Vec<CMapSection>> {
    let (input, _) = preceded(ws, tag("beginbfchar")).parse(input)?;
    let (input, pairs) = many0(preceded(ws, (hex_string, preceded(ws, hex_string)))).parse(input)?;
    let (input, _) = preceded(ws, tag("endbfchar")).parse(input)?;
    let pairs = pairs.into_iter().map(|(code, dst)| (units_to_code(&code), dst)).collect();
    Ok((input, vec![CMapSection::BfChar(pairs)]))
}

fn bf_range_target(input: &[u8]) -> IResult<&[u8], Vec<Vec<u16>>> {
    alt((
        map(hex_string, |s| vec![s]),
        delimited((nom_char('['), ws), many0(terminated(hex_string, ws)), nom_char(']')),
    ))
    .parse(input)
}

fn bf_range_section(input: &[u8]) -> IResult<&[u8], Vec<CMapSection>> {
    let (input, _) = preceded(ws, tag("beginbfrange")).parse(input)?;
    let (input, triples) = many0(preceded(
        ws,
        (hex_string, preceded(ws, hex_string), preceded(ws, bf_range_target)),
    ))
    .parse(input)?;
    let (input, _) = preceded(ws, tag("endbfrange")).parse(input)?;
    let mappings = triples
        .into_iter()
        .map(|(lo, hi, dst)| ((units_to_code(&lo), units_to_code(&hi)), dst))
        .collect();
    Ok((input, vec![CMapSection::BfRange(mappings)]))
}

/// Swallows any token this mini-interpreter doesn't care about: `N begincmap`/`endcmap`,
/// `usecmap`, `findresource`, dictionary scaffolding, comments, integers used as counts, etc.
fn skip_token(input: &[u8]) -> IResult<&[u8], Vec<CMapSection>> {
    let (input, _) = ws(input)?;
    let (input, _) = take_while1(|c: u8| !c.is_ascii_whitespace()).parse(input)?;
    Ok((input, vec![]))
}

fn units_to_code(units: &[u16]) -> u16 {
    units.last().copied().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bfchar_single_code_point_mapping() {
        let content = b"1 begincodespacerange\n<00> <FF>\nendcodespacerange\n1 beginbfchar\n<41> <0042>\nendbfchar";
        let cmap = ToUnicodeCMap::parse(content).unwrap();
        assert_eq!(cmap.get(0x41), Some(vec![0x0042]));
    }

    #[test]
    fn bfrange_contiguous_offset_mapping() {
        let content = b"1 beginbfrange\n<0020> <007E> <0020>\nendbfrange";
        let cmap = ToUnicodeCMap::parse(content).unwrap();
        assert_eq!(cmap.get(0x41), Some(vec![0x41]));
        assert_eq!(cmap.get(0x20), Some(vec![0x20]));
    }

    #[test]
    fn bfrange_array_of_targets() {
        let content = b"1 beginbfrange\n<0001> <0003> [<0041> <0042> <0043>]\nendbfrange";
        let cmap = ToUnicodeCMap::parse(content).unwrap();
        assert_eq!(cmap.get(0x0002), Some(vec![0x0042]));
    }

    #[test]
    fn unmapped_code_falls_back_to_replacement_char() {
        let cmap = ToUnicodeCMap::new();
        assert_eq!(cmap.get_or_replacement_char(0x99), vec![0xFFFD]);
    }

    #[test]
    fn invalid_range_is_rejected() {
        let content = b"1 beginbfrange\n<0010> <0005> <0020>\nendbfrange";
        assert!(ToUnicodeCMap::parse(content).is_err());
    }
}
