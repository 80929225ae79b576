//! The document-mode tokenizer/object parser (spec.md §4.B): translates byte regions into PDF
//! values per the lexical grammar, plus the xref-table and trailer grammars (spec.md §4.E).

pub mod content;

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, Stream, StringFormat};
use crate::xref::{Xref, XrefEntry};
use nom::branch::alt;
use nom::bytes::complete::{tag, take, take_while, take_while1, take_while_m_n};
use nom::character::complete::{digit0, digit1, one_of};
use nom::combinator::{map, map_opt, map_res, opt, verify};
use nom::multi::{fold_many0, fold_many1, many0};
use nom::sequence::{delimited, pair, preceded, separated_pair, terminated};
use nom::{AsChar, IResult, Parser};
use nom_locate::LocatedSpan;
use std::str::{self, FromStr};

pub type Span<'a> = LocatedSpan<&'a [u8]>;
type PResult<'a, O> = IResult<Span<'a>, O>;

/// Maximum nesting depth for literal strings' balanced-paren groups (spec.md §4.B's state
/// machine is recursive; real files never nest more than a handful deep).
const MAX_STRING_NESTING: usize = 64;

fn offset(input: Span) -> usize {
    input.location_offset()
}

fn eol(input: Span) -> PResult<Span> {
    alt((tag(&b"\r\n"[..]), tag(&b"\n"[..]), tag(&b"\r"[..]))).parse(input)
}

fn is_whitespace(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\r' | b'\n' | 0x0C | 0x00)
}

fn is_delimiter(c: u8) -> bool {
    b"()<>[]{}/%".contains(&c)
}

fn is_regular(c: u8) -> bool {
    !is_whitespace(c) && !is_delimiter(c)
}

fn comment(input: Span) -> PResult<()> {
    map((tag(&b"%"[..]), take_while(|c: u8| !b"\r\n".contains(&c)), eol), |_| ()).parse(input)
}

/// Whitespace and comments, any amount (spec.md: "may appear anywhere whitespace may").
fn space(input: Span) -> PResult<()> {
    fold_many0(alt((map(take_while1(is_whitespace), |_| ()), comment)), || (), |_, _| ()).parse(input)
}

fn white_space(input: Span) -> PResult<()> {
    map(take_while(is_whitespace), |_| ()).parse(input)
}

fn integer(input: Span) -> PResult<i64> {
    let (i, _) = (opt(one_of("+-")), digit1).parse(input)?;
    let text = &input[..input.len() - i.len()];
    i64::from_str(str::from_utf8(text).unwrap_or("0"))
        .map(|v| (i, v))
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))
}

fn real(input: Span) -> PResult<f32> {
    let (i, _) = (
        opt(one_of("+-")),
        alt((map((digit1, tag(&b"."[..]), digit0), |_| ()), map((tag(&b"."[..]), digit1), |_| ()))),
    )
        .parse(input)?;
    let text = &input[..input.len() - i.len()];
    f32::from_str(str::from_utf8(text).unwrap_or("0"))
        .map(|v| (i, v))
        .map_err(|_| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Digit)))
}

fn hex_char(input: Span) -> PResult<u8> {
    map_res(verify(take(2usize), |h: &Span| h.iter().all(|&b| b.is_ascii_hexdigit())), |x: Span| {
        u8::from_str_radix(str::from_utf8(&x).unwrap(), 16)
    })
    .parse(input)
}

fn oct_char(input: Span) -> PResult<u8> {
    map_res(take_while_m_n(1, 3, |c: u8| c.is_oct_digit()), |x: Span| {
        u16::from_str_radix(str::from_utf8(&x).unwrap(), 8).map(|o| o as u8)
    })
    .parse(input)
}

pub fn name(input: Span) -> PResult<Vec<u8>> {
    preceded(
        tag(&b"/"[..]),
        many0(alt((
            preceded(tag(&b"#"[..]), hex_char),
            map_opt(take(1usize), |c: Span| if c[0] != b'#' && is_regular(c[0]) { Some(c[0]) } else { None }),
        ))),
    )
    .parse(input)
}

fn escape_sequence(input: Span) -> PResult<Option<u8>> {
    preceded(
        tag(&b"\\"[..]),
        alt((
            map(oct_char, Some),
            map(eol, |_| None),
            map(tag(&b"n"[..]), |_| Some(b'\n')),
            map(tag(&b"r"[..]), |_| Some(b'\r')),
            map(tag(&b"t"[..]), |_| Some(b'\t')),
            map(tag(&b"b"[..]), |_| Some(0x08)),
            map(tag(&b"f"[..]), |_| Some(0x0C)),
            map(take(1usize), |c: Span| Some(c[0])),
        )),
    )
    .parse(input)
    // A backslash consumed but nothing follows it (end of input): every other escape shape is
    // accepted as-is by the last alternative, so reaching here means the string ran out mid-escape.
    .map_err(|_| nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Escaped)))
}

fn is_direct_literal_char(c: u8) -> bool {
    !b"()\\\r\n".contains(&c)
}

enum StringPiece<'a> {
    Direct(Span<'a>),
    Escape(Option<u8>),
    Eol(Span<'a>),
    Nested(Vec<u8>),
}

impl StringPiece<'_> {
    fn push(&self, out: &mut Vec<u8>) {
        match self {
            StringPiece::Direct(s) | StringPiece::Eol(s) => out.extend_from_slice(s),
            StringPiece::Escape(e) => out.extend(e),
            StringPiece::Nested(n) => out.extend_from_slice(n),
        }
    }
}

fn inner_literal_string(depth: usize) -> impl Fn(Span) -> PResult<Vec<u8>> {
    move |input| {
        fold_many0(
            alt((
                map(take_while1(is_direct_literal_char), StringPiece::Direct),
                map(escape_sequence, StringPiece::Escape),
                map(eol, StringPiece::Eol),
                map(nested_literal_string(depth), StringPiece::Nested),
            )),
            Vec::new,
            |mut out, piece| {
                piece.push(&mut out);
                out
            },
        )
        .parse(input)
    }
}

fn nested_literal_string(depth: usize) -> impl Fn(Span) -> PResult<Vec<u8>> {
    move |input: Span| {
        if depth == 0 {
            return Err(nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::TooLarge)));
        }
        map(delimited(tag(&b"("[..]), inner_literal_string(depth - 1), tag(&b")"[..])), |mut content| {
            content.insert(0, b'(');
            content.push(b')');
            content
        })
        .parse(input)
    }
}

fn literal_string(input: Span) -> PResult<Vec<u8>> {
    let (rest, _) = tag(&b"("[..]).parse(input)?;
    // Past the opening paren this string is committed: any further failure (nesting too deep,
    // a dangling escape, or never finding the closing paren) is reported, not silently retried as
    // some other object type by the caller's `alt`.
    terminated(inner_literal_string(MAX_STRING_NESTING), tag(&b")"[..])).parse(rest).map_err(|e| match e {
        nom::Err::Failure(_) => e,
        _ => nom::Err::Failure(nom::error::Error::new(rest, nom::error::ErrorKind::Not)),
    })
}

fn hex_digit(input: Span) -> PResult<u8> {
    map_opt(take(1usize), |c: Span| str::from_utf8(&c).ok().and_then(|c| u8::from_str_radix(c, 16).ok())).parse(input)
}

fn hexadecimal_string(input: Span) -> PResult<Object> {
    // `<<` opens a dictionary, not a hex string; leave that alternative for `dictionary` to try.
    if input.fragment().starts_with(b"<<") {
        return Err(nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Tag)));
    }
    let (rest, _) = tag(&b"<"[..]).parse(input)?;
    terminated(
        fold_many0(
            preceded(white_space, hex_digit),
            || (Vec::new(), false),
            |(mut out, half), nibble| {
                if half {
                    *out.last_mut().unwrap() |= nibble;
                    (out, false)
                } else {
                    out.push(nibble << 4);
                    (out, true)
                }
            },
        ),
        (white_space, tag(&b">"[..])),
    )
    .parse(rest)
    .map(|(i, (bytes, _))| (i, Object::String(bytes, StringFormat::Hexadecimal)))
    .map_err(|e| match e {
        nom::Err::Failure(_) => e,
        // Anything but a clean run of hex digits followed by `>` -- an invalid nibble, typically.
        _ => nom::Err::Failure(nom::error::Error::new(rest, nom::error::ErrorKind::HexDigit)),
    })
}

fn boolean(input: Span) -> PResult<Object> {
    alt((map(tag(&b"true"[..]), |_| Object::Boolean(true)), map(tag(&b"false"[..]), |_| Object::Boolean(false)))).parse(input)
}

fn null(input: Span) -> PResult<Object> {
    map(tag(&b"null"[..]), |_| Object::Null).parse(input)
}

fn array(input: Span) -> PResult<Vec<Object>> {
    delimited((tag(&b"["[..]), space), many0(direct_object), tag(&b"]"[..])).parse(input)
}

pub fn dictionary(input: Span) -> PResult<Dictionary> {
    let (rest, _) = (tag(&b"<<"[..]), space).parse(input)?;
    // Once `<<` has been seen this is committed to being a dictionary: a dangling key with no
    // value, or anything else that keeps `inner_dictionary` from reaching `>>`, is reported rather
    // than quietly unwound and retried as some other object type.
    terminated(inner_dictionary, tag(&b">>"[..])).parse(rest).map_err(|e| match e {
        nom::Err::Failure(_) => e,
        _ => nom::Err::Failure(nom::error::Error::new(rest, nom::error::ErrorKind::Count)),
    })
}

fn inner_dictionary(input: Span) -> PResult<Dictionary> {
    fold_many0(
        pair(terminated(name, space), direct_object),
        Dictionary::new,
        |mut dict, (key, value)| {
            dict.set(key, value);
            dict
        },
    )
    .parse(input)
}

fn unsigned_int<I: FromStr>(input: Span) -> PResult<I> {
    map_res(digit1, |digits: Span| I::from_str(str::from_utf8(&digits).unwrap())).parse(input)
}

fn object_id(input: Span) -> PResult<ObjectId> {
    pair(terminated(unsigned_int::<u32>, space), terminated(unsigned_int::<u16>, space)).parse(input)
}

fn reference(input: Span) -> PResult<Object> {
    map(terminated(object_id, tag(&b"R"[..])), Object::Reference).parse(input)
}

fn direct_objects(input: Span) -> PResult<Object> {
    alt((
        null,
        boolean,
        reference,
        map(real, Object::Real),
        map(integer, Object::Integer),
        map(name, Object::Name),
        map(literal_string, Object::string_literal),
        hexadecimal_string,
        map(array, Object::Array),
        map(dictionary, Object::Dictionary),
    ))
    .parse(input)
}

pub fn direct_object(input: Span) -> PResult<Object> {
    terminated(direct_objects, space).parse(input)
}

/// Resolves a stream's declared `Length` to a byte count. When `Length` is an indirect
/// reference, the caller supplies a best-effort resolver (looking it up without recursing into
/// the stream currently being parsed); if it cannot resolve, parsing falls back to scanning
/// forward for the `endstream` keyword (spec.md §9's tolerance for malformed input).
pub type LengthResolver<'a> = dyn Fn(ObjectId) -> Option<i64> + 'a;

fn stream_object<'a>(input: Span<'a>, resolve_length: &LengthResolver<'_>) -> PResult<'a, Object> {
    let (i, dict) = terminated(dictionary, (space, tag(&b"stream"[..]), nom::character::complete::space0, eol)).parse(input)?;
    // Past the `stream` keyword this is committed to being a stream object: a failure below must
    // be reported, not silently retried by the caller's `alt` as a bare dictionary with the
    // `stream ... endstream` body left dangling and unconsumed.

    let declared_length = match dict.get(b"Length") {
        Ok(Object::Reference(id)) => resolve_length(*id),
        Ok(Object::Integer(n)) => Some(*n),
        _ => None,
    };

    if let Some(length) = declared_length.filter(|&n| n >= 0) {
        if let Ok((i, data)) = terminated(take(length as usize), (opt(eol), tag(&b"endstream"[..]))).parse(i) {
            return Ok((i, Object::Stream(Stream::new(dict, data.to_vec()))));
        }
        // A declared length that doesn't land on `endstream` is still worth a scan (producers get
        // this wrong more often than the marker itself goes missing), but if the scan also comes up
        // empty the length was simply wrong, not just imprecise.
        log::warn!("declared /Length {length} did not land on `endstream`; scanning forward instead");
        return scan_to_endstream(i, dict)
            .map_err(|_| nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::LengthValue)));
    }

    // Length was absent or unresolvable: scan forward instead.
    scan_to_endstream(i, dict).map_err(|_| nom::Err::Failure(nom::error::Error::new(i, nom::error::ErrorKind::Fail)))
}

fn scan_to_endstream(input: Span, dict: Dictionary) -> PResult<Object> {
    let bytes = input.fragment();
    let marker = b"endstream";
    let pos = bytes
        .windows(marker.len())
        .position(|w| w == marker)
        .ok_or_else(|| nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Fail)))?;
    let mut data_end = pos;
    if data_end > 0 && bytes[data_end - 1] == b'\n' {
        data_end -= 1;
        if data_end > 0 && bytes[data_end - 1] == b'\r' {
            data_end -= 1;
        }
    } else if data_end > 0 && bytes[data_end - 1] == b'\r' {
        data_end -= 1;
    }
    let data = bytes[..data_end].to_vec();
    let rest = input.slice_from(pos + marker.len());
    Ok((rest, Object::Stream(Stream::new(dict, data))))
}

trait SpanSlice<'a> {
    fn slice_from(&self, n: usize) -> Span<'a>;
}

impl<'a> SpanSlice<'a> for Span<'a> {
    fn slice_from(&self, n: usize) -> Span<'a> {
        let consumed = self.take(n);
        self.slice(consumed.len()..)
    }
}

fn object<'a>(input: Span<'a>, resolve_length: &LengthResolver<'_>) -> PResult<'a, Object> {
    terminated(alt((|i| stream_object(i, resolve_length), direct_objects)), space).parse(input)
}

/// Turns the propagated nom error for an object's value into the specific failure kind the
/// committed leaf parser (`literal_string`, `hexadecimal_string`, `dictionary`, `scan_to_endstream`)
/// tagged it with, falling back to the generic offset-only `Parse` for anything left untagged.
fn map_value_failure(e: nom::Err<nom::error::Error<Span>>, start: usize) -> Error {
    use nom::error::ErrorKind;
    match e {
        nom::Err::Failure(inner) => {
            let offset = inner.input.location_offset();
            match inner.code {
                ErrorKind::TooLarge => Error::StringNestingTooDeep,
                ErrorKind::Escaped => Error::BadEscape { offset },
                ErrorKind::Not => Error::UnterminatedString { offset },
                ErrorKind::HexDigit => Error::BadHex { offset },
                ErrorKind::Count => Error::UnbalancedDict { offset },
                ErrorKind::LengthValue => Error::LengthMismatch,
                ErrorKind::Fail => Error::MissingEndstream,
                _ => Error::Parse { offset },
            }
        }
        nom::Err::Error(inner) => match inner.code {
            ErrorKind::Digit => Error::BadNumber { offset: inner.input.location_offset() },
            _ => Error::Parse { offset: start },
        },
        nom::Err::Incomplete(_) => Error::Parse { offset: start },
    }
}

/// A short lossy preview of what actually follows `input`, for error messages.
fn preview(input: Span) -> String {
    let bytes = input.fragment();
    let len = bytes.len().min(16);
    String::from_utf8_lossy(&bytes[..len]).into_owned()
}

/// Parses one `n g obj ... endobj` definition at the document's top level (spec.md §4.B).
pub fn indirect_object<'a>(
    input: Span<'a>,
    expected_id: Option<ObjectId>,
    resolve_length: &LengthResolver<'_>,
) -> Result<(ObjectId, Object)> {
    let start = offset(input);
    let (i, (_, id)) = terminated(((space), object_id), (tag(&b"obj"[..]), space))
        .parse(input)
        .map_err(|_| Error::UnexpectedToken {
            offset: start,
            found: preview(input),
            wanted: "object_number generation_number obj",
        })?;

    if let Some(expected) = expected_id {
        if id != expected {
            return Err(Error::ObjectIdMismatch);
        }
    }

    let (_, value) = terminated(|i| object(i, resolve_length), (space, opt(tag(&b"endobj"[..])), space))
        .parse(i)
        .map_err(|e| map_value_failure(e, start))?;

    Ok((id, value))
}

/// Parses the `%PDF-M.m` (or Adobe `%!PS-Adobe-x.y PDF-M.m`) header on the first line.
pub fn header(input: &[u8]) -> Option<(u32, u32)> {
    let text = std::str::from_utf8(input.get(..64.min(input.len()))?).ok()?;
    let line = text.lines().next()?;
    let marker = line.rfind("PDF-")?;
    let version = &line[marker + 4..];
    let mut parts = version.split('.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.trim_end_matches(|c: char| !c.is_ascii_digit()).parse().ok()?;
    Some((major, minor))
}

fn xref_eol(input: Span) -> PResult<()> {
    map(alt((tag(&b" \r"[..]), tag(&b" \n"[..]), tag(&b"\r\n"[..]))), |_| ()).parse(input)
}

fn xref_entry_line(input: Span) -> PResult<(u32, u16, bool)> {
    let (input, (offset, generation)) = separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>).parse(input)?;
    let (input, kind) = delimited(tag(&b" "[..]), map(one_of("nf"), |k| k == 'n'), xref_eol).parse(input)?;
    Ok((input, (offset, generation as u16, kind)))
}

fn xref_subsection(input: Span) -> PResult<(u32, Vec<(u32, u16, bool)>)> {
    let (input, (start, count)) = separated_pair(unsigned_int::<u32>, tag(&b" "[..]), unsigned_int::<u32>).parse(input)?;
    let (input, _) = (opt(tag(&b" "[..])), eol).parse(input)?;
    let mut entries = Vec::with_capacity(count as usize);
    let mut rest = input;
    for _ in 0..count {
        let (next, entry) = xref_entry_line(rest)?;
        entries.push(entry);
        rest = next;
    }
    Ok((rest, (start, entries)))
}

/// Parses a classic `xref` table (spec.md §4.E "Classic xref table").
pub fn classic_xref(input: Span) -> PResult<Xref> {
    let (input, sections) = delimited((tag(&b"xref"[..]), eol), fold_many1(xref_subsection, Vec::new, |mut acc, s| {
        acc.push(s);
        acc
    }), space)
    .parse(input)?;

    let mut xref = Xref::new(0);
    for (start, entries) in sections {
        for (index, (off, generation, in_use)) in entries.into_iter().enumerate() {
            let id = start + index as u32;
            let entry = if in_use {
                XrefEntry::InUse { offset: off, generation }
            } else {
                XrefEntry::Free { next_free: off, generation }
            };
            xref.insert_if_absent(id, entry);
        }
    }
    Ok((input, xref))
}

pub fn trailer(input: Span) -> PResult<Dictionary> {
    delimited((tag(&b"trailer"[..]), space), dictionary, space).parse(input)
}

/// Parses one whitespace-separated `a b` pair of integers (spec.md §4.E "Object streams": the
/// `N` pairs of `obj_num offset` in an ObjStm header take this exact shape).
pub fn int_pair(input: Span) -> PResult<(i64, i64)> {
    preceded(space, separated_pair(integer, space, integer)).parse(input)
}

pub fn startxref(input: Span) -> Option<i64> {
    let (input, _) = (tag(&b"startxref"[..]), eol).parse(input).ok()?;
    let (input, offset) = preceded(white_space, integer).parse(input).ok()?;
    let _ = terminated(white_space, opt((eol, tag(&b"%%EOF"[..])))).parse(input);
    Some(offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(b: &[u8]) -> Span<'_> {
        Span::new(b)
    }

    #[test]
    fn parses_header_plain_form() {
        assert_eq!(header(b"%PDF-1.7\n%\xe2\xe3\xcf\xd3\n"), Some((1, 7)));
    }

    #[test]
    fn parses_header_adobe_alias_form() {
        assert_eq!(header(b"%!PS-Adobe-3.0 PDF-1.4\n"), Some((1, 4)));
    }

    #[test]
    fn parses_dictionary_with_mixed_values() {
        let (_, dict) = dictionary(span(b"<< /Size 3 /Root 1 0 R /Flag true >>")).unwrap();
        assert_eq!(dict.get(b"Size").unwrap().as_i64().unwrap(), 3);
        assert_eq!(dict.get(b"Root").unwrap().as_reference().unwrap(), (1, 0));
        assert_eq!(dict.get(b"Flag").unwrap().as_bool().unwrap(), true);
    }

    #[test]
    fn name_decodes_hash_escapes() {
        let (_, n) = name(span(b"/A#20B")).unwrap();
        assert_eq!(n, b"A B");
    }

    #[test]
    fn literal_string_handles_nesting_and_escapes() {
        let (_, s) = literal_string(span(b"(a\\n(nested)b)")).unwrap();
        assert_eq!(s, b"a\n(nested)b");
    }

    #[test]
    fn hex_string_pads_odd_length() {
        let (_, obj) = hexadecimal_string(span(b"<901FA>")).unwrap();
        assert_eq!(obj, Object::String(vec![0x90, 0x1F, 0xA0], StringFormat::Hexadecimal));
    }

    #[test]
    fn classic_xref_table_parses_fixed_width_entries() {
        let input = b"xref\n0 3\n0000000000 65535 f \n0000000010 00000 n \n0000000069 00000 n \ntrailer\n<< /Size 3 /Root 1 0 R >>\n";
        let (rest, xref) = classic_xref(span(input)).unwrap();
        assert_eq!(xref.get(1), Some(XrefEntry::InUse { offset: 10, generation: 0 }));
        let (_, t) = trailer(rest).unwrap();
        assert_eq!(t.get(b"Size").unwrap().as_i64().unwrap(), 3);
    }

    #[test]
    fn startxref_parses_trailing_offset() {
        assert_eq!(startxref(span(b"startxref\n1234\n%%EOF")), Some(1234));
    }

    #[test]
    fn indirect_object_parses_simple_integer() {
        let (id, obj) = indirect_object(span(b"7 0 obj\n42\nendobj\n"), None, &|_| None).unwrap();
        assert_eq!(id, (7, 0));
        assert_eq!(obj.as_i64().unwrap(), 42);
    }

    #[test]
    fn indirect_object_rejects_id_mismatch() {
        let err = indirect_object(span(b"7 0 obj\n42\nendobj\n"), Some((8, 0)), &|_| None).unwrap_err();
        assert!(matches!(err, Error::ObjectIdMismatch));
    }

    #[test]
    fn stream_object_uses_declared_length() {
        let input = b"<< /Length 5 >>\nstream\nhello\nendstream";
        let (_, obj) = stream_object(span(input), &|_| None).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.raw_content, b"hello");
    }

    #[test]
    fn stream_object_falls_back_to_scanning_when_length_unresolvable() {
        let input = b"<< /Length 999 0 R >>\nstream\nhello\nendstream";
        let (_, obj) = stream_object(span(input), &|_| None).unwrap();
        let stream = obj.as_stream().unwrap();
        assert_eq!(stream.raw_content, b"hello");
    }

    #[test]
    fn indirect_object_reports_unexpected_token_for_a_missing_obj_keyword() {
        let err = indirect_object(span(b"not an object header"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::UnexpectedToken { wanted: "object_number generation_number obj", .. }));
    }

    #[test]
    fn indirect_object_reports_unterminated_string() {
        let err = indirect_object(span(b"7 0 obj\n(never closed"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::UnterminatedString { .. }));
    }

    #[test]
    fn indirect_object_reports_bad_escape_at_a_dangling_backslash() {
        let err = indirect_object(span(b"7 0 obj\n(abc\\"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::BadEscape { .. }));
    }

    #[test]
    fn indirect_object_reports_string_nesting_too_deep() {
        let content = format!("7 0 obj\n({}", "(".repeat(MAX_STRING_NESTING + 4));
        let err = indirect_object(span(content.as_bytes()), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::StringNestingTooDeep));
    }

    #[test]
    fn indirect_object_reports_bad_hex_string() {
        let err = indirect_object(span(b"7 0 obj\n<12G>\nendobj\n"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::BadHex { .. }));
    }

    #[test]
    fn indirect_object_reports_unbalanced_dict() {
        let err = indirect_object(span(b"7 0 obj\n<< /Foo >>\nendobj\n"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::UnbalancedDict { .. }));
    }

    #[test]
    fn indirect_object_reports_missing_endstream_when_the_marker_is_absent() {
        let err = indirect_object(span(b"7 0 obj\n<< >>\nstream\nhello"), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::MissingEndstream));
    }

    #[test]
    fn indirect_object_reports_length_mismatch_when_the_scan_also_fails() {
        let input = b"7 0 obj\n<< /Length 3 >>\nstream\nhello";
        let err = indirect_object(span(input), None, &|_| None).unwrap_err();
        assert!(matches!(err, Error::LengthMismatch));
    }
}
