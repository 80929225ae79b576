//! The cross-reference map (spec.md §3 "XRef entry", §4.E).

use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, Stream};
use std::collections::BTreeMap;

/// Where an indirect object lives, or that it doesn't (spec.md §3 "XRef entry").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// The object is absent. `next_free` is the next free-list link (object 0 conventionally
    /// points to itself), `generation` is what the object's generation will be if reused.
    Free { next_free: u32, generation: u16 },
    /// `offset` bytes into the file, as an `n g obj` definition.
    InUse { offset: u32, generation: u16 },
    /// Inside object stream `container`, at zero-based `index`.
    Compressed { container: u32, index: u16 },
}

impl XrefEntry {
    pub fn generation(&self) -> u16 {
        match *self {
            XrefEntry::Free { generation, .. } => generation,
            XrefEntry::InUse { generation, .. } => generation,
            XrefEntry::Compressed { .. } => 0,
        }
    }
}

/// The full cross-reference map for a document, after following the entire incremental-update
/// chain (spec.md §4.E "Incremental-update chain": newer entries override older).
#[derive(Debug, Clone, Default)]
pub struct Xref {
    entries: BTreeMap<u32, XrefEntry>,
    /// Highest object number plus one, from the newest trailer's `/Size` (spec.md §3).
    pub size: u32,
}

impl Xref {
    pub fn new(size: u32) -> Xref {
        Xref {
            entries: BTreeMap::new(),
            size,
        }
    }

    pub fn get(&self, id: u32) -> Option<XrefEntry> {
        self.entries.get(&id).copied()
    }

    /// Inserts an entry only if one is not already present for this object number. Callers walk
    /// the incremental-update chain from newest to oldest, so "first insert wins" implements
    /// spec.md's "newest wins" merge rule.
    pub fn insert_if_absent(&mut self, id: u32, entry: XrefEntry) {
        self.entries.entry(id).or_insert(entry);
    }

    pub fn max_id(&self) -> u32 {
        self.entries.keys().max().copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, XrefEntry)> + '_ {
        self.entries.iter().map(|(&id, &e)| (id, e))
    }

    /// Inserts an entry unconditionally, overwriting whatever was there. Used while parsing a
    /// single xref section (stream or classic), where later entries for the same id within the
    /// *same* section legitimately replace earlier ones -- the "newest update wins" rule (spec.md
    /// §3, §4.E) only applies across sections, via [`Self::insert_if_absent`].
    pub fn insert(&mut self, id: u32, entry: XrefEntry) {
        self.entries.insert(id, entry);
    }
}

/// Parses a cross-reference *stream* (PDF 1.5+, spec.md §4.E "Cross-reference stream"): a stream
/// object whose header doubles as the trailer. Returns the xref section plus that trailer.
pub fn parse_xref_stream(stream: &Stream) -> Result<(Xref, Dictionary)> {
    let dict = stream.dict.clone();
    let data = stream.decoded()?;

    let size = dict.get(b"Size").and_then(Object::as_i64).map_err(|_| Error::MalformedXref { offset: 0 })?;

    let widths = match dict.get(b"W").and_then(Object::as_array) {
        Ok(items) if items.len() >= 3 => [
            items[0].as_i64().map_err(|_| Error::MalformedXref { offset: 0 })? as usize,
            items[1].as_i64().map_err(|_| Error::MalformedXref { offset: 0 })? as usize,
            items[2].as_i64().map_err(|_| Error::MalformedXref { offset: 0 })? as usize,
        ],
        _ => return Err(Error::MalformedXref { offset: 0 }),
    };

    let index: Vec<i64> = match dict.get(b"Index").and_then(Object::as_array) {
        Ok(items) => items.iter().map(|v| v.as_i64().unwrap_or(0)).collect(),
        Err(_) => vec![0, size],
    };

    let record_len = widths[0] + widths[1] + widths[2];
    let mut xref = Xref::new(size as u32);
    let mut pos = 0usize;

    for pair in index.chunks(2) {
        let (&first_obj, &count) = match pair {
            [a, b] => (a, b),
            _ => continue,
        };
        for j in 0..count {
            if pos + record_len > data.len() {
                break;
            }
            let record = &data[pos..pos + record_len];
            pos += record_len;

            let mut cursor = 0usize;
            let read_field = |record: &[u8], cursor: &mut usize, width: usize, default: u64| -> u64 {
                if width == 0 {
                    return default;
                }
                let mut value: u64 = 0;
                for &b in &record[*cursor..*cursor + width] {
                    value = (value << 8) | b as u64;
                }
                *cursor += width;
                value
            };

            let kind = read_field(record, &mut cursor, widths[0], 1);
            let field2 = read_field(record, &mut cursor, widths[1], 0);
            let field3 = read_field(record, &mut cursor, widths[2], 0);
            let obj_id = (first_obj + j) as u32;

            let entry = match kind {
                0 => XrefEntry::Free { next_free: field2 as u32, generation: field3 as u16 },
                1 => XrefEntry::InUse { offset: field2 as u32, generation: field3 as u16 },
                2 => XrefEntry::Compressed { container: field2 as u32, index: field3 as u16 },
                _ => continue,
            };
            xref.insert(obj_id, entry);
        }
    }

    Ok((xref, dict))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newest_wins_on_insert_if_absent() {
        let mut xref = Xref::new(0);
        xref.insert_if_absent(5, XrefEntry::InUse { offset: 100, generation: 0 });
        // An older update's entry for the same object must not override the newer one.
        xref.insert_if_absent(5, XrefEntry::InUse { offset: 999, generation: 0 });
        assert_eq!(xref.get(5), Some(XrefEntry::InUse { offset: 100, generation: 0 }));
    }
}
