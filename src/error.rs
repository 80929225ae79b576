use crate::object::ObjectId;

/// Error type covering every failure kind the reader can surface: structural (xref/trailer),
/// lexical (tokenizer), stream (filter pipeline), content-VM, and capability (stubbed filters).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("UTF-8 decoding failed: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    // -- Structural --
    #[error("no %%EOF marker found in the final bytes of the file")]
    NoEofMarker,

    #[error("malformed or missing startxref offset")]
    BadStartxref,

    #[error("malformed cross-reference table or stream at offset {offset}")]
    MalformedXref { offset: usize },

    #[error("trailer dictionary is missing required key /{0}")]
    MissingTrailerKey(&'static str),

    #[error("object {0:?} is not present in the cross-reference table")]
    UnknownObject(ObjectId),

    #[error("object stream {container} has no entry for index {index}")]
    ObjStreamMissingEntry { container: u32, index: u16 },

    #[error("document is encrypted; decryption is not supported")]
    EncryptedNotSupported,

    // -- Lexical --
    #[error("unexpected token at offset {offset}: found {found}, wanted {wanted}")]
    UnexpectedToken {
        offset: usize,
        found: String,
        wanted: &'static str,
    },

    #[error("unterminated literal string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("invalid escape sequence in literal string at offset {offset}")]
    BadEscape { offset: usize },

    #[error("invalid numeric literal at offset {offset}")]
    BadNumber { offset: usize },

    #[error("invalid hex string at offset {offset}")]
    BadHex { offset: usize },

    #[error("dictionary at offset {offset} has an odd number of name/value tokens")]
    UnbalancedDict { offset: usize },

    #[error("literal string nesting exceeds the maximum supported depth")]
    StringNestingTooDeep,

    #[error("failed to parse object at offset {offset}")]
    Parse { offset: usize },

    #[error("parsed object id does not match the expected id")]
    ObjectIdMismatch,

    #[error("PDF header (%PDF-M.m) not found on the first line")]
    Header,

    // -- Stream / filters --
    #[error("unknown stream filter /{0}")]
    UnknownFilter(String),

    #[error("filter /{name} failed: {cause}")]
    FilterFailed { name: &'static str, cause: String },

    #[error("stream length does not match the bytes between `stream` and `endstream`")]
    LengthMismatch,

    #[error("`endstream` keyword not found at the expected offset")]
    MissingEndstream,

    #[error("unsupported predictor value {0}")]
    UnsupportedPredictor(i64),

    // -- Content VM --
    #[error("ET without a matching BT, or BT while already inside a text object")]
    UnbalancedTextObject,

    #[error("operator {op} received an invalid operand: got {got}, expected {expected}")]
    InvalidOperand {
        op: &'static str,
        got: String,
        expected: &'static str,
    },

    #[error("content stream references unknown font resource /{0}")]
    UnknownFont(String),

    // -- Object model / accessor errors --
    #[error("expected object of type {expected}, found {found}")]
    ObjectType {
        expected: &'static str,
        found: &'static str,
    },

    #[error("dictionary is missing key /{0}")]
    DictKey(String),

    #[error("expected dictionary of type /{expected}, found /{found}")]
    DictType { expected: &'static str, found: String },

    #[error("could not decode text string")]
    TextStringDecode,

    // -- Capability --
    #[error("{0} is not implemented")]
    NotImplemented(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
