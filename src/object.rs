//! The PDF value sum type (spec.md §3/§4.D): [`Object`], its container types
//! [`Dictionary`] and [`Stream`], and the typed accessors used throughout the crate.

use crate::error::{Error, Result};
use crate::filters;
use indexmap::IndexMap;
use std::fmt;

/// Identity of an indirect object: `(object_number, generation)`.
pub type ObjectId = (u32, u16);

/// How a PDF string object was spelled in the source bytes. Both forms decode to the same
/// byte string; the format is kept only so round-tripping (out of scope here) could recover it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StringFormat {
    #[default]
    Literal,
    Hexadecimal,
}

/// A PDF dictionary: an ordered mapping from `Name` to [`Object`]. Key order is not semantically
/// significant per spec.md §3, but [`IndexMap`] preserves insertion order anyway since it costs
/// nothing and keeps debug output stable.
#[derive(Clone, Default, PartialEq)]
pub struct Dictionary(IndexMap<Vec<u8>, Object>);

/// A stream object: header dictionary plus its still-encoded bytes. Decoding is lazy and
/// memoized once via [`Stream::decoded`] (spec.md §3 "Stream" invariants, §9 "Stream lazy decode").
#[derive(Clone)]
pub struct Stream {
    pub dict: Dictionary,
    /// Raw (still filtered) bytes as they appear between `stream` and `endstream`.
    pub raw_content: Vec<u8>,
    decoded: std::cell::RefCell<Option<Vec<u8>>>,
}

impl PartialEq for Stream {
    fn eq(&self, other: &Self) -> bool {
        self.dict == other.dict && self.raw_content == other.raw_content
    }
}

impl fmt::Debug for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}stream...endstream", self.dict)
    }
}

/// The PDF value sum type (spec.md §3).
#[derive(Clone, PartialEq)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    String(Vec<u8>, StringFormat),
    Array(Vec<Object>),
    Dictionary(Dictionary),
    Stream(Stream),
    Reference(ObjectId),
    /// An operator keyword encountered while lexing a content stream in iterator mode
    /// (spec.md §4.B "Recognized constructs" / "iterator mode").
    Operator(String),
}

impl Object {
    pub fn string_literal<S: Into<Vec<u8>>>(s: S) -> Self {
        Object::String(s.into(), StringFormat::Literal)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Object::Boolean(v) => Ok(*v),
            other => Err(Error::ObjectType {
                expected: "Boolean",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_i64(&self) -> Result<i64> {
        match self {
            Object::Integer(v) => Ok(*v),
            other => Err(Error::ObjectType {
                expected: "Integer",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_f32(&self) -> Result<f32> {
        match self {
            Object::Real(v) => Ok(*v),
            other => Err(Error::ObjectType {
                expected: "Real",
                found: other.enum_variant(),
            }),
        }
    }

    /// Like [`Self::as_f32`] but also accepts an `Integer`, since content-stream operands
    /// routinely mix the two (spec.md §4.G operand tables list bare reals for matrices but
    /// producers emit whole numbers as integers).
    pub fn as_float(&self) -> Result<f32> {
        match self {
            Object::Integer(v) => Ok(*v as f32),
            Object::Real(v) => Ok(*v),
            other => Err(Error::ObjectType {
                expected: "Integer or Real",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_name(&self) -> Result<&[u8]> {
        match self {
            Object::Name(name) => Ok(name),
            other => Err(Error::ObjectType {
                expected: "Name",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_str(&self) -> Result<&[u8]> {
        match self {
            Object::String(s, _) => Ok(s),
            other => Err(Error::ObjectType {
                expected: "String",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_reference(&self) -> Result<ObjectId> {
        match self {
            Object::Reference(id) => Ok(*id),
            other => Err(Error::ObjectType {
                expected: "Reference",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_array(&self) -> Result<&[Object]> {
        match self {
            Object::Array(a) => Ok(a),
            other => Err(Error::ObjectType {
                expected: "Array",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_dict(&self) -> Result<&Dictionary> {
        match self {
            Object::Dictionary(d) => Ok(d),
            Object::Stream(s) => Ok(&s.dict),
            other => Err(Error::ObjectType {
                expected: "Dictionary",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_stream(&self) -> Result<&Stream> {
        match self {
            Object::Stream(s) => Ok(s),
            other => Err(Error::ObjectType {
                expected: "Stream",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn as_operator(&self) -> Result<&str> {
        match self {
            Object::Operator(op) => Ok(op),
            other => Err(Error::ObjectType {
                expected: "Operator",
                found: other.enum_variant(),
            }),
        }
    }

    pub fn type_name(&self) -> Result<&[u8]> {
        self.as_dict().and_then(Dictionary::get_type)
    }

    pub fn enum_variant(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::Name(_) => "Name",
            Object::String(..) => "String",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream(_) => "Stream",
            Object::Reference(_) => "Reference",
            Object::Operator(_) => "Operator",
        }
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Null => write!(f, "Null"),
            Object::Boolean(v) => write!(f, "{v}"),
            Object::Integer(v) => write!(f, "{v}"),
            Object::Real(v) => write!(f, "{v}"),
            Object::Name(n) => write!(f, "/{}", String::from_utf8_lossy(n)),
            Object::String(s, StringFormat::Literal) => write!(f, "({})", String::from_utf8_lossy(s)),
            Object::String(s, StringFormat::Hexadecimal) => {
                write!(f, "<")?;
                for b in s {
                    write!(f, "{b:02x}")?;
                }
                write!(f, ">")
            }
            Object::Array(a) => {
                let items: Vec<String> = a.iter().map(|o| format!("{o:?}")).collect();
                write!(f, "[{}]", items.join(" "))
            }
            Object::Dictionary(d) => write!(f, "{d:?}"),
            Object::Stream(s) => write!(f, "{s:?}"),
            Object::Reference(id) => write!(f, "{} {} R", id.0, id.1),
            Object::Operator(op) => write!(f, "{op}"),
        }
    }
}

impl Dictionary {
    pub fn new() -> Dictionary {
        Dictionary(IndexMap::new())
    }

    pub fn has(&self, key: &[u8]) -> bool {
        self.0.contains_key(key)
    }

    pub fn get(&self, key: &[u8]) -> Result<&Object> {
        self.0.get(key).ok_or_else(|| Error::DictKey(String::from_utf8_lossy(key).into_owned()))
    }

    /// Like [`Self::get`] but returns `None` for an absent key rather than `Null` --- the
    /// distinction the page-tree walker (spec.md §4.D, §4.F) must preserve.
    pub fn get_opt(&self, key: &[u8]) -> Option<&Object> {
        self.0.get(key)
    }

    pub fn set<K: Into<Vec<u8>>, V: Into<Object>>(&mut self, key: K, value: V) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &[u8]) -> Option<Object> {
        self.0.shift_remove(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has_type(&self, type_name: &[u8]) -> bool {
        self.get(b"Type").and_then(Object::as_name).ok() == Some(type_name)
    }

    pub fn get_type(&self) -> Result<&[u8]> {
        self.get(b"Type").and_then(Object::as_name)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, Vec<u8>, Object> {
        self.0.iter()
    }

    /// Merge newer trailer values over this dictionary (spec.md §3 "Xref merge order":
    /// entries from newer incremental updates override older ones). This is a pure "newest wins"
    /// overwrite, not a combine-colliding-values-into-arrays policy (that's a writer-side concern).
    pub fn merge_newer(&mut self, newer: &Dictionary) {
        for (key, value) in newer.0.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl fmt::Debug for Dictionary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.0.iter().map(|(k, v)| format!("/{} {:?}", String::from_utf8_lossy(k), v)).collect();
        write!(f, "<<{}>>", entries.concat())
    }
}

impl<'a> IntoIterator for &'a Dictionary {
    type Item = (&'a Vec<u8>, &'a Object);
    type IntoIter = indexmap::map::Iter<'a, Vec<u8>, Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl std::iter::FromIterator<(Vec<u8>, Object)> for Dictionary {
    fn from_iter<I: IntoIterator<Item = (Vec<u8>, Object)>>(iter: I) -> Self {
        Dictionary(IndexMap::from_iter(iter))
    }
}

/// Build a [`Dictionary`] literal without writing out `Dictionary::new()` plus a run of `set` calls.
#[macro_export]
macro_rules! dictionary {
    () => { $crate::object::Dictionary::new() };
    ($( $key:expr => $value:expr ),+ $(,)?) => {{
        let mut dict = $crate::object::Dictionary::new();
        $( dict.set($key, $value); )+
        dict
    }};
}

impl Stream {
    pub fn new(dict: Dictionary, raw_content: Vec<u8>) -> Stream {
        Stream {
            dict,
            raw_content,
            decoded: std::cell::RefCell::new(None),
        }
    }

    /// The stream's `Filter` entry, normalized to a list (spec.md §3 "Filter list and
    /// decode-params list"). An absent `Filter` is an empty list, not an error.
    pub fn filters(&self) -> Result<Vec<&[u8]>> {
        match self.dict.get_opt(b"Filter") {
            None => Ok(vec![]),
            Some(obj) => match obj {
                Object::Name(name) => Ok(vec![name.as_slice()]),
                Object::Array(items) => items.iter().map(Object::as_name).collect(),
                other => Err(Error::ObjectType {
                    expected: "Name or Array",
                    found: other.enum_variant(),
                }),
            },
        }
    }

    /// Parallel `DecodeParms` list. Shorter than `filters()` is tolerated (treated as all-default
    /// for the missing trailing entries, per spec.md §9's Open Question resolution in DESIGN.md).
    pub fn decode_params(&self) -> Result<Vec<Option<&Dictionary>>> {
        match self.dict.get_opt(b"DecodeParms") {
            None => Ok(vec![]),
            Some(Object::Dictionary(d)) => Ok(vec![Some(d)]),
            Some(Object::Array(items)) => Ok(items
                .iter()
                .map(|o| match o {
                    Object::Dictionary(d) => Some(d),
                    _ => None,
                })
                .collect()),
            Some(other) => Err(Error::ObjectType {
                expected: "Dictionary or Array",
                found: other.enum_variant(),
            }),
        }
    }

    /// Decoded payload, computed at most once (spec.md §3 invariant, §9 "Stream lazy decode").
    pub fn decoded(&self) -> Result<Vec<u8>> {
        if let Some(cached) = self.decoded.borrow().as_ref() {
            return Ok(cached.clone());
        }
        let out = filters::decode_chain(&self.raw_content, &self.filters()?, &self.decode_params()?)?;
        *self.decoded.borrow_mut() = Some(out.clone());
        Ok(out)
    }

    pub fn is_decoded(&self) -> bool {
        self.decoded.borrow().is_some()
    }
}

/// Creates a text string (spec.md §4.H / PDF2.0 text string conventions). ASCII input is encoded
/// as a plain literal string; anything else is encoded UTF-16BE with a leading BOM.
pub fn text_string(text: &str) -> Object {
    if text.is_ascii() {
        return Object::String(text.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Decodes a PDF text string, choosing UTF-16BE, UTF-8, or PDFDocEncoding based on the leading
/// BOM (spec.md §3 "Literal string"/"optional UTF-16BE detection via leading BOM").
pub fn decode_text_string(obj: &Object) -> Result<String> {
    let s = obj.as_str()?;
    if let Some(rest) = s.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks(2)
            .map(|c| if c.len() == 2 { u16::from_be_bytes([c[0], c[1]]) } else { u16::from_be_bytes([c[0], 0]) })
            .collect();
        String::from_utf16(&units).map_err(|_| Error::TextStringDecode)
    } else if let Some(rest) = s.strip_prefix(&[0xEF, 0xBB, 0xBF]) {
        String::from_utf8(rest.to_vec()).map_err(|_| Error::TextStringDecode)
    } else {
        Ok(crate::encodings::bytes_to_string(&crate::encodings::PDF_DOC_ENCODING, s))
    }
}

macro_rules! from_object {
    ($( $ty:ty => $variant:ident ),+ $(,)?) => {
        $( impl From<$ty> for Object {
            fn from(v: $ty) -> Self { Object::$variant(v.into()) }
        } )+
    };
}

impl From<bool> for Object {
    fn from(v: bool) -> Self {
        Object::Boolean(v)
    }
}
impl From<i64> for Object {
    fn from(v: i64) -> Self {
        Object::Integer(v)
    }
}
macro_rules! from_smaller_ints {
    ($($t:ty)+) => { $( impl From<$t> for Object { fn from(v: $t) -> Self { Object::Integer(v as i64) } } )+ };
}
from_smaller_ints! { i8 i16 i32 u8 u16 u32 }
impl From<f32> for Object {
    fn from(v: f32) -> Self {
        Object::Real(v)
    }
}
impl From<f64> for Object {
    fn from(v: f64) -> Self {
        Object::Real(v as f32)
    }
}
from_object! {
    String => Name,
    Vec<Object> => Array,
}
impl From<&str> for Object {
    fn from(v: &str) -> Self {
        Object::Name(v.as_bytes().to_vec())
    }
}
impl From<Dictionary> for Object {
    fn from(v: Dictionary) -> Self {
        Object::Dictionary(v)
    }
}
impl From<Stream> for Object {
    fn from(v: Stream) -> Self {
        Object::Stream(v)
    }
}
impl From<ObjectId> for Object {
    fn from(v: ObjectId) -> Self {
        Object::Reference(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_distinguishes_null_from_absent() {
        let mut dict = Dictionary::new();
        dict.set("A", Object::Null);
        assert!(dict.get_opt(b"A").is_some());
        assert!(dict.get_opt(b"B").is_none());
    }

    #[test]
    fn merge_newer_overwrites_older() {
        let mut base = dictionary! { "Root" => 1_i64, "Size" => 10_i64 };
        let newer = dictionary! { "Size" => 20_i64 };
        base.merge_newer(&newer);
        assert_eq!(base.get(b"Size").unwrap().as_i64().unwrap(), 20);
        assert_eq!(base.get(b"Root").unwrap().as_i64().unwrap(), 1);
    }

    #[test]
    fn text_string_round_trips_ascii_and_unicode() {
        let ascii = text_string("hello");
        assert_eq!(decode_text_string(&ascii).unwrap(), "hello");

        let unicode = text_string("тест");
        assert_eq!(decode_text_string(&unicode).unwrap(), "тест");
    }
}
