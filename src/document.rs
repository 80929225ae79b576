//! The `Document` (spec.md §3 "Document", §4.E, §4.F): owns the byte source and the
//! indirect-object cache, resolves the xref chain, and exposes the catalog/page-tree surface.

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId, Stream};
use crate::page::Page;
use crate::parser::{self, Span};
use crate::xref::{self, Xref, XrefEntry};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// A parsed PDF document (spec.md §3 "Document"). Owns the full byte buffer and memoizes every
/// indirect object it has resolved so far (spec.md §3 invariant: "for any (n,g) there is at most
/// one parsed value").
pub struct Document {
    buffer: Vec<u8>,
    header_version: (u32, u32),
    xref: Xref,
    trailer: Dictionary,
    cache: RefCell<HashMap<ObjectId, Object>>,
}

impl Document {
    /// Reads `path` to completion and parses it (spec.md §6 `Document::open`): a thin wrapper
    /// around [`Self::load`] for callers working with files rather than in-memory buffers.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Document> {
        let bytes = std::fs::read(path)?;
        Self::load(&bytes)
    }

    /// Parses a document from an in-memory byte buffer (spec.md §4.A "Byte Source": the crate's
    /// only byte-source form; §6 `Document::open`).
    pub fn load(bytes: &[u8]) -> Result<Document> {
        let header_version = parser::header(bytes).ok_or(Error::Header)?;

        let mut doc = Document {
            buffer: bytes.to_vec(),
            header_version,
            xref: Xref::new(0),
            trailer: Dictionary::new(),
            cache: RefCell::new(HashMap::new()),
        };

        let start = find_startxref(bytes)?;
        let (mut xref, mut trailer) = doc.read_xref_section(start)?;

        let mut visited_offsets = HashSet::new();
        visited_offsets.insert(start);

        // Hybrid-reference files (a classic table whose trailer also carries /XRefStm) layer a
        // supplementary cross-reference stream on top of the classic section at the same level.
        if let Some(xrefstm) = trailer.get_opt(b"XRefStm").and_then(|o| o.as_i64().ok()) {
            if let Ok((stm_xref, _)) = doc.read_xref_section(xrefstm as usize) {
                for (id, entry) in stm_xref.iter() {
                    xref.insert_if_absent(id, entry);
                }
            }
        }

        let mut prev = trailer.get_opt(b"Prev").and_then(|o| o.as_i64().ok());
        while let Some(offset) = prev {
            if offset < 0 {
                break;
            }
            let offset = offset as usize;
            if !visited_offsets.insert(offset) || offset >= bytes.len() {
                break;
            }
            let (prev_xref, mut prev_trailer) = doc.read_xref_section(offset)?;
            for (id, entry) in prev_xref.iter() {
                xref.insert_if_absent(id, entry);
            }
            fill_missing(&mut trailer, &prev_trailer);
            prev = prev_trailer.remove(b"Prev").and_then(|o| o.as_i64().ok());
        }

        let declared_size = trailer.get(b"Size").and_then(Object::as_i64).unwrap_or(0).max(0) as u32;
        xref.size = declared_size.max(xref.max_id() + 1);

        doc.xref = xref;
        doc.trailer = trailer;
        Ok(doc)
    }

    /// Parses a classic or stream-form xref section starting at `offset` (spec.md §4.E
    /// "Startup"): a digit means stream form (`N G obj` of an `/XRef` stream), otherwise the
    /// `xref` keyword introduces a classic table.
    fn read_xref_section(&self, offset: usize) -> Result<(Xref, Dictionary)> {
        let bytes = self.buffer.get(offset..).ok_or(Error::BadStartxref)?;
        match bytes.first() {
            Some(b) if b.is_ascii_digit() => {
                let (_, obj) = parser::indirect_object(Span::new(bytes), None, &|_| None).map_err(|_| Error::MalformedXref { offset })?;
                let stream = obj.as_stream().map_err(|_| Error::MalformedXref { offset })?;
                xref::parse_xref_stream(stream)
            }
            _ => {
                let (rest, table) = parser::classic_xref(Span::new(bytes)).map_err(|_| Error::MalformedXref { offset })?;
                let trailer = parser::trailer(rest).map(|(_, t)| t).unwrap_or_default();
                Ok((table, trailer))
            }
        }
    }

    /// Resolves an object, following a single level of indirection if `value` is a
    /// [`Object::Reference`] (spec.md §4.D `resolve(doc)`). Non-reference values are returned
    /// unchanged (a clone).
    pub fn resolve(&self, value: &Object) -> Result<Object> {
        match value {
            Object::Reference(id) => self.get_object(*id),
            other => Ok(other.clone()),
        }
    }

    /// Fetches and memoizes the indirect object `id` (spec.md §4.E, §9 "the indirect-object cache
    /// acts as the arena"). Subsequent calls for the same id return the cached instance without
    /// reparsing, matching the idempotence invariant (spec.md §8).
    pub fn get_object(&self, id: ObjectId) -> Result<Object> {
        if let Some(cached) = self.cache.borrow().get(&id) {
            return Ok(cached.clone());
        }
        log::debug!("object cache miss for {id:?}");
        let value = self.parse_object(id)?;
        self.cache.borrow_mut().insert(id, value.clone());
        Ok(value)
    }

    fn parse_object(&self, id: ObjectId) -> Result<Object> {
        match self.xref.get(id.0) {
            Some(XrefEntry::InUse { offset, generation }) => {
                if generation != id.1 {
                    return Err(Error::UnknownObject(id));
                }
                self.parse_object_at(offset as usize, id)
            }
            Some(XrefEntry::Compressed { container, index }) => self.parse_compressed_object(container, index),
            _ => Err(Error::UnknownObject(id)),
        }
    }

    fn parse_object_at(&self, offset: usize, id: ObjectId) -> Result<Object> {
        let bytes = self.buffer.get(offset..).ok_or(Error::UnknownObject(id))?;
        let resolve_length = |len_id: ObjectId| self.get_object(len_id).ok().and_then(|o| o.as_i64().ok());
        let (_, value) = parser::indirect_object(Span::new(bytes), Some(id), &resolve_length)?;
        Ok(value)
    }

    /// Dereferences a compressed entry (spec.md §4.E "Object-stream dereference"): resolves the
    /// containing `/ObjStm`, then parses the indexed object out of its decoded payload.
    fn parse_compressed_object(&self, container: u32, index: u16) -> Result<Object> {
        let container_obj = self.get_object((container, 0))?;
        let stream = container_obj.as_stream()?;
        let payload = stream.decoded()?;

        let n = stream.dict.get(b"N").and_then(Object::as_i64).map_err(|_| Error::MissingTrailerKey("N"))?;
        let first = stream.dict.get(b"First").and_then(Object::as_i64).map_err(|_| Error::MissingTrailerKey("First"))?;

        let mut cursor = Span::new(&payload);
        let mut offsets = Vec::with_capacity(n as usize);
        for _ in 0..n {
            let (next, pair) = parser::int_pair(cursor).map_err(|_| Error::ObjStreamMissingEntry { container, index })?;
            offsets.push(pair);
            cursor = next;
        }

        let (_, rel_offset) = offsets.get(index as usize).copied().ok_or(Error::ObjStreamMissingEntry { container, index })?;
        let start = (first as usize).checked_add(rel_offset as usize).ok_or(Error::ObjStreamMissingEntry { container, index })?;
        let slice = payload.get(start..).ok_or(Error::ObjStreamMissingEntry { container, index })?;
        let (_, value) = parser::direct_object(Span::new(slice)).map_err(|_| Error::ObjStreamMissingEntry { container, index })?;
        Ok(value)
    }

    /// The document's effective version (spec.md §4.F "Header"): the header's `%PDF-M.m`, unless
    /// the trailer's `Version` key names a strictly greater one.
    pub fn version(&self) -> String {
        let (major, minor) = self.header_version;
        if let Some(name) = self.trailer.get_opt(b"Version").and_then(|o| o.as_name().ok()) {
            if let Some((vmaj, vmin)) = std::str::from_utf8(name).ok().and_then(parse_version_str) {
                if (vmaj, vmin) > (major, minor) {
                    return format!("{vmaj}.{vmin}");
                }
            }
        }
        format!("{major}.{minor}")
    }

    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// The catalog dictionary, resolved from the trailer's `/Root` (spec.md §4.F "Catalog").
    pub fn catalog(&self) -> Result<Object> {
        let root = self.trailer.get(b"Root").map_err(|_| Error::MissingTrailerKey("Root"))?;
        let catalog = self.resolve(root)?;
        let dict = catalog.as_dict()?;
        // `/Type` is often left out of hand-built or minimal files, but when it's present it must
        // actually say `Catalog` -- pointing `/Root` at, say, a page dictionary is a different kind
        // of malformed file than a missing key.
        if dict.has(b"Type") && !dict.has_type(b"Catalog") {
            return Err(Error::DictType {
                expected: "Catalog",
                found: String::from_utf8_lossy(dict.get_type().unwrap_or(b"")).into_owned(),
            });
        }
        Ok(catalog)
    }

    /// Flattens the page tree depth-first, left-to-right (spec.md §4.F "Page tree", §8 invariant).
    pub fn pages(&self) -> Result<Vec<Page<'_>>> {
        let catalog = self.catalog()?;
        let catalog_dict = catalog.as_dict()?;
        let pages_root = catalog_dict.get(b"Pages").map_err(|_| Error::MissingTrailerKey("Pages"))?.clone();

        let mut out = Vec::new();
        let mut visited = HashSet::new();
        self.walk_page_tree(&pages_root, crate::page::InheritedAttrs::default(), &mut out, &mut visited)?;
        Ok(out)
    }

    fn walk_page_tree<'doc>(
        &'doc self,
        node: &Object,
        inherited: crate::page::InheritedAttrs,
        out: &mut Vec<Page<'doc>>,
        visited: &mut HashSet<ObjectId>,
    ) -> Result<()> {
        let id = node.as_reference().ok();
        if let Some(id) = id {
            if !visited.insert(id) {
                return Ok(()); // a cyclic page tree: already visited, skip rather than loop forever.
            }
        }

        let resolved = self.resolve(node)?;
        let dict = resolved.as_dict()?;
        let mut attrs = inherited;
        attrs.update_from(self, dict)?;

        if dict.get_type().ok() == Some(b"Pages".as_slice()) {
            let kids = dict.get(b"Kids").and_then(Object::as_array).map_err(|_| Error::MissingTrailerKey("Kids"))?;
            for kid in kids {
                self.walk_page_tree(kid, attrs.clone(), out, visited)?;
            }
        } else {
            out.push(Page::new(self, id.unwrap_or((0, 0)), dict.clone(), attrs));
        }
        Ok(())
    }

    /// The `/Outlines` root, resolved but otherwise uninterpreted (spec.md §9 supplemented
    /// pass-through accessor).
    pub fn outline(&self) -> Result<Option<Object>> {
        let catalog = self.catalog()?;
        match catalog.as_dict()?.get_opt(b"Outlines") {
            Some(obj) if !obj.is_null() => Ok(Some(self.resolve(obj)?)),
            _ => Ok(None),
        }
    }

    /// The `/Info` dictionary, resolved but otherwise uninterpreted (date strings are exposed raw;
    /// see DESIGN.md).
    pub fn info(&self) -> Result<Option<Dictionary>> {
        match self.trailer.get_opt(b"Info") {
            Some(obj) if !obj.is_null() => Ok(Some(self.resolve(obj)?.as_dict()?.clone())),
            _ => Ok(None),
        }
    }
}

fn fill_missing(newer: &mut Dictionary, older: &Dictionary) {
    for (key, value) in older.iter() {
        if !newer.has(key) {
            newer.set(key.clone(), value.clone());
        }
    }
}

fn parse_version_str(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.splitn(2, '.');
    let major: u32 = parts.next()?.parse().ok()?;
    let minor: u32 = parts.next()?.parse().ok()?;
    Some((major, minor))
}

/// Locates the final `startxref` offset (spec.md §4.E "Startup", §6 "%%EOF within the final 1024
/// bytes"): the *last* `%%EOF` in the file's tail wins when more than one is present (multiple
/// incremental updates each append their own).
fn find_startxref(bytes: &[u8]) -> Result<usize> {
    let tail_start = bytes.len().saturating_sub(1024);
    let tail = &bytes[tail_start..];

    let eof_rel = find_last(tail, b"%%EOF").ok_or(Error::NoEofMarker)?;
    let before_eof = &tail[..eof_rel];
    let startxref_rel = find_last(before_eof, b"startxref").ok_or(Error::BadStartxref)?;

    let offset = parser::startxref(Span::new(&tail[startxref_rel..])).ok_or(Error::BadStartxref)?;
    if offset < 0 {
        return Err(Error::BadStartxref);
    }
    Ok(offset as usize)
}

fn find_last(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_pdf() -> Vec<u8> {
        let header = b"%PDF-1.4\n";
        let obj1 = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
        let obj2 = b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n";
        let offset1 = header.len();
        let offset2 = offset1 + obj1.len();

        let mut out = Vec::new();
        out.extend_from_slice(header);
        out.extend_from_slice(obj1);
        out.extend_from_slice(obj2);
        let xref_offset = out.len();
        out.extend_from_slice(b"xref\n0 3\n");
        out.extend_from_slice(b"0000000000 65535 f \n");
        out.extend_from_slice(format!("{offset1:010} 00000 n \n").as_bytes());
        out.extend_from_slice(format!("{offset2:010} 00000 n \n").as_bytes());
        out.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n");
        out.extend_from_slice(xref_offset.to_string().as_bytes());
        out.extend_from_slice(b"\n%%EOF");
        out
    }

    #[test]
    fn minimal_file_has_no_pages_and_correct_version() {
        let doc = Document::load(&minimal_pdf()).unwrap();
        assert_eq!(doc.version(), "1.4");
        assert_eq!(doc.pages().unwrap().len(), 0);
    }

    #[test]
    fn catalog_rejects_root_pointing_at_a_wrongly_typed_dictionary() {
        let header = b"%PDF-1.4\n";
        let obj1 = b"1 0 obj\n<< /Type /Pages /Pages 2 0 R >>\nendobj\n";
        let obj2 = b"2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n";
        let offset1 = header.len();
        let offset2 = offset1 + obj1.len();

        let mut bytes = Vec::new();
        bytes.extend_from_slice(header);
        bytes.extend_from_slice(obj1);
        bytes.extend_from_slice(obj2);
        let xref_offset = bytes.len();
        bytes.extend_from_slice(b"xref\n0 3\n");
        bytes.extend_from_slice(b"0000000000 65535 f \n");
        bytes.extend_from_slice(format!("{offset1:010} 00000 n \n").as_bytes());
        bytes.extend_from_slice(format!("{offset2:010} 00000 n \n").as_bytes());
        bytes.extend_from_slice(b"trailer\n<< /Size 3 /Root 1 0 R >>\nstartxref\n");
        bytes.extend_from_slice(xref_offset.to_string().as_bytes());
        bytes.extend_from_slice(b"\n%%EOF");

        let doc = Document::load(&bytes).unwrap();
        let err = doc.catalog().unwrap_err();
        assert!(matches!(err, Error::DictType { expected: "Catalog", .. }));
    }

    #[test]
    fn incremental_update_resolves_to_newest_value() {
        let base = b"%PDF-1.4\n5 0 obj\n1\nendobj\n";
        let base_xref_offset = base.len();
        let mut doc_bytes = base.to_vec();
        doc_bytes.extend_from_slice(b"xref\n0 6\n0000000000 65535 f \n0000000000 00000 f \n0000000000 00000 f \n0000000000 00000 f \n0000000000 00000 f \n0000000009 00000 n \ntrailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n");
        doc_bytes.extend_from_slice(base_xref_offset.to_string().as_bytes());
        doc_bytes.extend_from_slice(b"\n%%EOF\n");

        let update_start = doc_bytes.len();
        doc_bytes.extend_from_slice(b"5 0 obj\n2\nendobj\n");
        let update_xref_offset = doc_bytes.len();
        doc_bytes.extend_from_slice(format!("xref\n5 1\n{update_start:010} 00000 n \ntrailer\n<< /Size 6 /Root 1 0 R /Prev {base_xref_offset} >>\nstartxref\n").as_bytes());
        doc_bytes.extend_from_slice(update_xref_offset.to_string().as_bytes());
        doc_bytes.extend_from_slice(b"\n%%EOF");

        let doc = Document::load(&doc_bytes).unwrap();
        let value = doc.get_object((5, 0)).unwrap();
        assert_eq!(value.as_i64().unwrap(), 2);
    }
}
