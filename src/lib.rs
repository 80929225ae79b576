//! A PDF 1.x reader: parses the object model, follows cross-references and incremental
//! updates, decodes stream filters, and walks content streams to extract page text.

#![forbid(unsafe_code)]

#[macro_use]
pub mod object;

pub mod content;
pub mod document;
pub mod encodings;
pub mod error;
pub mod filters;
pub mod font;
pub mod page;
pub mod parser;
pub mod render;
pub mod xref;

pub use content::VmEvent;
pub use document::Document;
pub use error::{Error, Result};
pub use object::{Dictionary, Object, ObjectId, Stream, StringFormat};
pub use page::Page;
pub use render::ExtractOptions;
