//! Pages and the page tree (spec.md §4.F "Page tree"): inheritable attribute resolution and
//! content-stream access. The tree walk itself lives on [`crate::document::Document::pages`];
//! this module holds the per-page view it produces.

use crate::content::{self, VmEvent};
use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectId};
use crate::render::{self, ExtractOptions};

/// Attributes a page inherits from its ancestors in the page tree (spec.md §4.F "Inheritable
/// attributes"): `Resources`, `MediaBox`, `CropBox`, `Rotate`. A node's own value wins when
/// present and non-null; otherwise the parent's value (already folded into this struct) applies.
#[derive(Debug, Clone, Default)]
pub struct InheritedAttrs {
    resources: Option<Object>,
    media_box: Option<[f32; 4]>,
    crop_box: Option<[f32; 4]>,
    rotate: i64,
}

impl InheritedAttrs {
    pub(crate) fn update_from(&mut self, doc: &Document, dict: &Dictionary) -> Result<()> {
        if let Some(obj) = non_null(dict.get_opt(b"Resources")) {
            self.resources = Some(doc.resolve(obj)?);
        }
        if let Some(obj) = non_null(dict.get_opt(b"MediaBox")) {
            self.media_box = Some(read_rect(doc, obj)?);
        }
        if let Some(obj) = non_null(dict.get_opt(b"CropBox")) {
            self.crop_box = Some(read_rect(doc, obj)?);
        }
        if let Some(obj) = non_null(dict.get_opt(b"Rotate")) {
            self.rotate = doc.resolve(obj)?.as_i64().unwrap_or(0);
        }
        Ok(())
    }
}

fn non_null(obj: Option<&Object>) -> Option<&Object> {
    obj.filter(|o| !o.is_null())
}

fn read_rect(doc: &Document, obj: &Object) -> Result<[f32; 4]> {
    let resolved = doc.resolve(obj)?;
    let arr = resolved.as_array()?;
    if arr.len() != 4 {
        return Err(Error::ObjectType { expected: "array of 4 numbers", found: "Array" });
    }
    let mut out = [0.0f32; 4];
    for (i, v) in arr.iter().enumerate() {
        out[i] = doc.resolve(v)?.as_float()?;
    }
    Ok(out)
}

/// One flattened page-tree leaf (spec.md §4.F), carrying its own dictionary plus the inherited
/// attributes resolved during the tree walk.
pub struct Page<'doc> {
    doc: &'doc Document,
    id: ObjectId,
    dict: Dictionary,
    inherited: InheritedAttrs,
}

impl<'doc> Page<'doc> {
    pub(crate) fn new(doc: &'doc Document, id: ObjectId, dict: Dictionary, inherited: InheritedAttrs) -> Page<'doc> {
        Page { doc, id, dict, inherited }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// This page's effective `/Resources`, own or inherited (spec.md §4.F).
    pub fn resources(&self) -> Result<Object> {
        Ok(self.inherited.resources.clone().unwrap_or_else(|| Object::Dictionary(Dictionary::new())))
    }

    /// Own or inherited `/MediaBox`, defaulting to US Letter if absent everywhere up the chain.
    pub fn media_box(&self) -> Result<[f32; 4]> {
        Ok(self.inherited.media_box.unwrap_or([0.0, 0.0, 612.0, 792.0]))
    }

    /// Own or inherited `/CropBox`, defaulting to [`Self::media_box`] (spec.md §4.F).
    pub fn crop_box(&self) -> Result<[f32; 4]> {
        Ok(self.inherited.crop_box.unwrap_or(self.media_box()?))
    }

    /// Own or inherited `/Rotate`, defaulting to `0` (spec.md §4.F).
    pub fn rotate(&self) -> Result<i64> {
        Ok(self.inherited.rotate)
    }

    /// Decoded content-stream bytes, ready for lexing (spec.md §4.F "Content streams"): a single
    /// stream is decoded directly; an array of streams has its decoded payloads concatenated with
    /// an intervening whitespace byte.
    pub fn content_bytes(&self) -> Result<Vec<u8>> {
        let Some(contents) = self.dict.get_opt(b"Contents") else {
            return Ok(Vec::new());
        };
        let resolved = self.doc.resolve(contents)?;
        match &resolved {
            Object::Stream(s) => s.decoded(),
            Object::Array(items) => {
                let mut out = Vec::new();
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(b'\n');
                    }
                    let resolved_item = self.doc.resolve(item)?;
                    out.extend_from_slice(&resolved_item.as_stream()?.decoded()?);
                }
                Ok(out)
            }
            other => Err(Error::ObjectType { expected: "Stream or Array", found: other.enum_variant() }),
        }
    }

    /// Interprets the page's content stream and returns the renderer events it produced (spec.md
    /// §6 "`Page::content_events()`" -- the iterator-of-events surface for custom renderers).
    pub fn content_events(&self) -> Result<Vec<VmEvent>> {
        let bytes = self.content_bytes()?;
        let ops = crate::parser::content::operations(&bytes)?;
        content::execute(self.doc, self.resources()?, &ops)
    }

    /// The reference renderer (spec.md §4.I, §6 "`Page::extract_text(options)`").
    pub fn extract_text(&self, options: &ExtractOptions) -> Result<String> {
        render::extract_text(self, options)
    }

    /// `/Annots`, resolved one level but otherwise uninterpreted (supplemented pass-through
    /// accessor; see DESIGN.md).
    pub fn annotations(&self) -> Result<Vec<Object>> {
        match self.dict.get_opt(b"Annots") {
            Some(obj) => {
                let resolved = self.doc.resolve(obj)?;
                resolved.as_array()?.iter().map(|a| self.doc.resolve(a)).collect()
            }
            None => Ok(Vec::new()),
        }
    }
}
