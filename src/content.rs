//! The content-stream virtual machine (spec.md §4.G): interprets the post-filter operator stream
//! and emits text-showing events to a renderer sink (spec.md §4.I is the reference consumer).

use crate::document::Document;
use crate::error::{Error, Result};
use crate::font::Font;
use crate::object::Object;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::OnceLock;

/// One `(operands*, operator)` pair, as produced by the content-stream tokenizer
/// ([`crate::parser::content::operations`]).
#[derive(Debug, Clone)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

/// A `2×3` affine transform `(a, b, c, d, e, f)` standing for `[[a b 0]; [c d 0]; [e f 1]]`
/// (spec.md §4.G "Matrices"), applied to row vectors.
pub type Matrix = [f32; 6];

pub fn identity() -> Matrix {
    [1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
}

pub fn translate(tx: f32, ty: f32) -> Matrix {
    [1.0, 0.0, 0.0, 1.0, tx, ty]
}

/// Composes `m1` then `m2`: a point transformed by `m1` and then by `m2` equals the same point
/// transformed once by `mul(m1, m2)` (spec.md §4.G: "`M1 * M2` composes left-to-right").
pub fn mul(m1: Matrix, m2: Matrix) -> Matrix {
    let [a1, b1, c1, d1, e1, f1] = m1;
    let [a2, b2, c2, d2, e2, f2] = m2;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

pub fn apply(m: Matrix, x: f32, y: f32) -> (f32, f32) {
    (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
}

/// Events the VM emits to a renderer sink (spec.md §4.G "Rendering side effects").
#[derive(Debug, Clone)]
pub enum VmEvent {
    /// A showing operator (`Tj`/`TJ`/`'`/`"`) rendered `text`, with the text rendering matrix
    /// before and after the string's accumulated glyph advances were applied.
    ShowText {
        text: String,
        matrix_before: Matrix,
        matrix_after: Matrix,
        font_size: f32,
        rise: f32,
        /// Device-space width of this font's space glyph at the matrix in effect when the string
        /// was shown (spec.md §4.I "TextBlock"); the renderer uses it to size inter-block gaps.
        space_width: f32,
        /// Whether the showing font is fixed-pitch (spec.md §4.I "TextBlock").
        fixed_width: bool,
    },
    /// A `TJ` kern jump between strings: the text matrix moved with no text shown.
    CursorMove { matrix: Matrix },
}

/// Graphics state (spec.md §4.G "Graphics state" + "Text state"). Per ISO 32000-1 §9.3, the
/// text-state *scalar* parameters are part of the graphics state and thus saved/restored by
/// `q`/`Q`; only the text matrix and line matrix are excluded (reset solely by `BT`), so they
/// live in [`TextObjectState`] instead. See DESIGN.md for this reconciliation of spec.md's
/// grouping, which lists them together under "Text state".
#[derive(Debug, Clone)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub line_width: f32,
    pub line_cap: i64,
    pub line_join: i64,
    pub miter_limit: f32,
    pub dash_array: Vec<Object>,
    pub dash_phase: f32,
    pub rendering_intent: String,
    pub flatness: f32,
    pub char_spacing: f32,
    pub word_spacing: f32,
    pub h_scale: f32,
    pub leading: f32,
    pub font_name: Option<Vec<u8>>,
    pub font_size: f32,
    pub render_mode: i64,
    pub rise: f32,
}

impl Default for GraphicsState {
    fn default() -> Self {
        GraphicsState {
            ctm: identity(),
            line_width: 1.0,
            line_cap: 0,
            line_join: 0,
            miter_limit: 10.0,
            dash_array: Vec::new(),
            dash_phase: 0.0,
            rendering_intent: String::new(),
            flatness: 0.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scale: 1.0,
            leading: 0.0,
            font_name: None,
            font_size: 0.0,
            render_mode: 0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct TextObjectState {
    tm: Matrix,
    tlm: Matrix,
}

type OpFn = fn(&mut Vm<'_>, &[Object]) -> Result<()>;

/// Executes `ops` against `resources` and returns the renderer events produced (spec.md §4.G,
/// `Page::content_events`).
pub fn execute(doc: &Document, resources: Object, ops: &[Operation]) -> Result<Vec<VmEvent>> {
    let mut vm = Vm::new(doc, resources);
    for op in ops {
        vm.dispatch(op)?;
    }
    Ok(vm.events)
}

/// The content-stream interpreter (spec.md §4.G "Execution model"). Holds the running graphics
/// state, the `q`/`Q` stack, the current text object (if any), and the operator's output sink.
pub struct Vm<'a> {
    doc: &'a Document,
    resources: Object,
    gs: GraphicsState,
    gs_stack: Vec<GraphicsState>,
    text: Option<TextObjectState>,
    current_font: Option<Rc<Font>>,
    events: Vec<VmEvent>,
    warned: std::collections::HashSet<String>,
}

impl<'a> Vm<'a> {
    fn new(doc: &'a Document, resources: Object) -> Vm<'a> {
        Vm {
            doc,
            resources,
            gs: GraphicsState::default(),
            gs_stack: Vec::new(),
            text: None,
            current_font: None,
            events: Vec::new(),
            warned: std::collections::HashSet::new(),
        }
    }

    fn dispatch(&mut self, op: &Operation) -> Result<()> {
        match dispatch_table().get(op.operator.as_str()) {
            Some(f) => f(self, &op.operands),
            None => {
                if self.warned.insert(op.operator.clone()) {
                    log::warn!("unknown content-stream operator /{}; treating as a no-op", op.operator);
                }
                Ok(())
            }
        }
    }

    fn text_rendering_matrix(&self) -> Matrix {
        let tm = self.text.as_ref().map(|t| t.tm).unwrap_or_else(identity);
        let scale_rise = [self.gs.font_size * self.gs.h_scale, 0.0, 0.0, self.gs.font_size, 0.0, self.gs.rise];
        mul(mul(scale_rise, tm), self.gs.ctm)
    }
}

fn dispatch_table() -> &'static HashMap<&'static str, OpFn> {
    static TABLE: OnceLock<HashMap<&'static str, OpFn>> = OnceLock::new();
    TABLE.get_or_init(|| {
        let mut m: HashMap<&'static str, OpFn> = HashMap::new();
        m.insert("q", op_q);
        m.insert("Q", op_big_q);
        m.insert("cm", op_cm);
        m.insert("w", op_w);
        m.insert("J", op_big_j);
        m.insert("j", op_j);
        m.insert("M", op_big_m);
        m.insert("d", op_d);
        m.insert("ri", op_ri);
        m.insert("i", op_i);
        m.insert("gs", op_gs);
        m.insert("BT", op_bt);
        m.insert("ET", op_et);
        m.insert("Tc", op_tc);
        m.insert("Tw", op_tw);
        m.insert("Tz", op_tz);
        m.insert("TL", op_tl);
        m.insert("Tf", op_tf);
        m.insert("Tr", op_tr);
        m.insert("Ts", op_ts);
        m.insert("Td", op_td);
        m.insert("TD", op_big_td);
        m.insert("Tm", op_tm);
        m.insert("T*", op_t_star);
        m.insert("Tj", op_tj);
        m.insert("TJ", op_tj_array);
        m.insert("'", op_quote);
        m.insert("\"", op_dquote);
        m
    })
}

fn num(operands: &[Object], i: usize, op: &'static str) -> Result<f32> {
    let obj = operands.get(i).ok_or_else(|| Error::InvalidOperand { op, got: "<missing>".into(), expected: "number" })?;
    obj.as_float().map_err(|_| Error::InvalidOperand { op, got: obj.enum_variant().to_string(), expected: "number" })
}

fn int_val(operands: &[Object], i: usize, op: &'static str) -> Result<i64> {
    Ok(num(operands, i, op)? as i64)
}

fn matrix6(operands: &[Object], op: &'static str) -> Result<Matrix> {
    Ok([
        num(operands, 0, op)?,
        num(operands, 1, op)?,
        num(operands, 2, op)?,
        num(operands, 3, op)?,
        num(operands, 4, op)?,
        num(operands, 5, op)?,
    ])
}

fn op_q(vm: &mut Vm<'_>, _: &[Object]) -> Result<()> {
    vm.gs_stack.push(vm.gs.clone());
    Ok(())
}

fn op_big_q(vm: &mut Vm<'_>, _: &[Object]) -> Result<()> {
    if let Some(state) = vm.gs_stack.pop() {
        vm.gs = state;
    }
    Ok(())
}

fn op_cm(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let new = matrix6(operands, "cm")?;
    vm.gs.ctm = mul(new, vm.gs.ctm);
    Ok(())
}

fn op_w(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.line_width = num(operands, 0, "w")?;
    Ok(())
}

fn op_big_j(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.line_cap = int_val(operands, 0, "J")?;
    Ok(())
}

fn op_j(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.line_join = int_val(operands, 0, "j")?;
    Ok(())
}

fn op_big_m(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.miter_limit = num(operands, 0, "M")?;
    Ok(())
}

fn op_d(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let array = operands
        .first()
        .ok_or_else(|| Error::InvalidOperand { op: "d", got: "<missing>".into(), expected: "array" })?
        .as_array()
        .map_err(|_| Error::InvalidOperand { op: "d", got: "non-array".into(), expected: "array" })?;
    vm.gs.dash_array = array.to_vec();
    vm.gs.dash_phase = num(operands, 1, "d")?;
    Ok(())
}

fn op_ri(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    if let Some(name) = operands.first().and_then(|o| o.as_name().ok()) {
        vm.gs.rendering_intent = String::from_utf8_lossy(name).into_owned();
    }
    Ok(())
}

fn op_i(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.flatness = num(operands, 0, "i")?;
    Ok(())
}

/// `gs`: applies a named `ExtGState` dictionary, mapping its `LW`/`LC`/`LJ`/`ML`/`Font` keys onto
/// the corresponding graphics-state fields (spec.md §4.G "General gs"). Other ExtGState keys
/// (transparency, soft masks, ...) are opaque to text extraction and ignored.
fn op_gs(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let Some(name) = operands.first().and_then(|o| o.as_name().ok()) else {
        return Ok(());
    };
    let Ok(resources) = vm.resources.as_dict() else {
        return Ok(());
    };
    let Some(ext_gstates) = resources.get_opt(b"ExtGState") else {
        return Ok(());
    };
    let Ok(ext_gstates) = vm.doc.resolve(ext_gstates) else {
        return Ok(());
    };
    let Ok(ext_gstates) = ext_gstates.as_dict() else {
        return Ok(());
    };
    let Some(entry) = ext_gstates.get_opt(name) else {
        return Ok(());
    };
    let Ok(entry) = vm.doc.resolve(entry) else {
        return Ok(());
    };
    let Ok(dict) = entry.as_dict() else {
        return Ok(());
    };
    if let Some(lw) = dict.get_opt(b"LW").and_then(|o| o.as_float().ok()) {
        vm.gs.line_width = lw;
    }
    if let Some(lc) = dict.get_opt(b"LC").and_then(|o| o.as_i64().ok()) {
        vm.gs.line_cap = lc;
    }
    if let Some(lj) = dict.get_opt(b"LJ").and_then(|o| o.as_i64().ok()) {
        vm.gs.line_join = lj;
    }
    if let Some(ml) = dict.get_opt(b"ML").and_then(|o| o.as_float().ok()) {
        vm.gs.miter_limit = ml;
    }
    Ok(())
}

fn op_bt(vm: &mut Vm<'_>, _: &[Object]) -> Result<()> {
    if vm.text.is_some() {
        return Err(Error::UnbalancedTextObject);
    }
    vm.text = Some(TextObjectState { tm: identity(), tlm: identity() });
    Ok(())
}

fn op_et(vm: &mut Vm<'_>, _: &[Object]) -> Result<()> {
    if vm.text.is_none() {
        return Err(Error::UnbalancedTextObject);
    }
    vm.text = None;
    Ok(())
}

fn op_tc(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.char_spacing = num(operands, 0, "Tc")?;
    Ok(())
}

fn op_tw(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.word_spacing = num(operands, 0, "Tw")?;
    Ok(())
}

/// `Tz`: the operand is a percentage; the stored scale factor is `operand / 100` (spec.md's
/// resolved Open Question, per ISO 32000-1).
fn op_tz(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.h_scale = num(operands, 0, "Tz")? / 100.0;
    Ok(())
}

fn op_tl(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.leading = num(operands, 0, "TL")?;
    Ok(())
}

fn op_tf(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let name = operands
        .first()
        .and_then(|o| o.as_name().ok())
        .ok_or_else(|| Error::InvalidOperand { op: "Tf", got: "<missing>".into(), expected: "name" })?;
    vm.gs.font_size = num(operands, 1, "Tf")?;
    vm.gs.font_name = Some(name.to_vec());

    match Font::load(vm.doc, &vm.resources, name) {
        Ok(font) => vm.current_font = Some(Rc::new(font)),
        Err(e) => {
            log::warn!("could not resolve font /{}: {e}", String::from_utf8_lossy(name));
            vm.current_font = None;
        }
    }
    Ok(())
}

fn op_tr(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.render_mode = int_val(operands, 0, "Tr")?;
    Ok(())
}

fn op_ts(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.rise = num(operands, 0, "Ts")?;
    Ok(())
}

fn op_td(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let tx = num(operands, 0, "Td")?;
    let ty = num(operands, 1, "Td")?;
    let text = vm.text.as_mut().ok_or(Error::UnbalancedTextObject)?;
    text.tm = mul(translate(tx, ty), text.tlm);
    text.tlm = text.tm;
    Ok(())
}

fn op_big_td(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let ty = num(operands, 1, "TD")?;
    vm.gs.leading = -ty;
    op_td(vm, operands)
}

fn op_tm(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let matrix = matrix6(operands, "Tm")?;
    let text = vm.text.as_mut().ok_or(Error::UnbalancedTextObject)?;
    text.tm = matrix;
    text.tlm = matrix;
    Ok(())
}

fn op_t_star(vm: &mut Vm<'_>, _: &[Object]) -> Result<()> {
    let leading = vm.gs.leading;
    op_td(vm, &[Object::Real(0.0), Object::Real(-leading)])
}

fn op_tj(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let bytes = operands
        .first()
        .ok_or_else(|| Error::InvalidOperand { op: "Tj", got: "<missing>".into(), expected: "string" })?
        .as_str()
        .map_err(|_| Error::InvalidOperand { op: "Tj", got: "non-string".into(), expected: "string" })?;
    show_string(vm, bytes)
}

fn op_tj_array(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    let array = operands
        .first()
        .ok_or_else(|| Error::InvalidOperand { op: "TJ", got: "<missing>".into(), expected: "array" })?
        .as_array()
        .map_err(|_| Error::InvalidOperand { op: "TJ", got: "non-array".into(), expected: "array" })?
        .to_vec();

    for item in &array {
        match item {
            Object::String(bytes, _) => show_string(vm, bytes)?,
            Object::Integer(_) | Object::Real(_) => {
                let k = item.as_float()?;
                let shift = -k / 1000.0 * vm.gs.font_size * vm.gs.h_scale;
                if let Some(text) = vm.text.as_mut() {
                    text.tm = mul(translate(shift, 0.0), text.tm);
                }
                vm.events.push(VmEvent::CursorMove { matrix: vm.text_rendering_matrix() });
            }
            _ => {}
        }
    }
    Ok(())
}

fn op_quote(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    op_t_star(vm, &[])?;
    op_tj(vm, operands)
}

fn op_dquote(vm: &mut Vm<'_>, operands: &[Object]) -> Result<()> {
    vm.gs.word_spacing = num(operands, 0, "\"")?;
    vm.gs.char_spacing = num(operands, 1, "\"")?;
    op_quote(vm, &operands[2..])
}

/// `Tj`/`TJ`/`'`/`"` string-advance arithmetic (spec.md §4.G "String-advance arithmetic").
fn show_string(vm: &mut Vm<'_>, bytes: &[u8]) -> Result<()> {
    if vm.text.is_none() {
        return Err(Error::UnbalancedTextObject);
    }
    let font_name = vm.gs.font_name.clone().unwrap_or_default();
    let font = vm
        .current_font
        .clone()
        .ok_or_else(|| Error::UnknownFont(String::from_utf8_lossy(&font_name).into_owned()))?;

    let fs = vm.gs.font_size;
    let th = vm.gs.h_scale;
    let tc = vm.gs.char_spacing;
    let tw = vm.gs.word_spacing;

    let matrix_before = vm.text_rendering_matrix();

    // Device-space width of the advance a space glyph alone would produce, used only to size
    // gaps during text extraction: the text-space advance is mapped through Tm*CTM (not the
    // font-scaled rendering matrix, which would double-count Tfs*Th).
    let tm_ctm = mul(vm.text.as_ref().map(|t| t.tm).unwrap_or_else(identity), vm.gs.ctm);
    let space_advance_text_space = (font.space_width() * fs + tc + tw) * th;
    let space_width = (space_advance_text_space * tm_ctm[0]).hypot(space_advance_text_space * tm_ctm[1]);

    let mut unicode = String::new();
    let mut total_advance = 0.0f32;
    for code in font.decode_codes(bytes) {
        let w0 = font.glyph_width(code);
        let is_space = font.code_length() == 1 && code == 0x20;
        let advance = (w0 * fs + tc + if is_space { tw } else { 0.0 }) * th;
        total_advance += advance;
        if let Some(s) = font.to_unicode(code) {
            unicode.push_str(&s);
        }
    }

    if let Some(text) = vm.text.as_mut() {
        text.tm = mul(translate(total_advance, 0.0), text.tm);
    }
    let matrix_after = vm.text_rendering_matrix();

    vm.events.push(VmEvent::ShowText {
        text: unicode,
        matrix_before,
        matrix_after,
        font_size: fs,
        rise: vm.gs.rise,
        space_width,
        fixed_width: font.is_fixed_pitch(),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_identity_is_neutral_for_mul() {
        let m = [2.0, 0.0, 0.0, 3.0, 5.0, 7.0];
        assert_eq!(mul(identity(), m), m);
        assert_eq!(mul(m, identity()), m);
    }

    #[test]
    fn translate_moves_the_origin() {
        let m = translate(10.0, 20.0);
        assert_eq!(apply(m, 0.0, 0.0), (10.0, 20.0));
    }

    #[test]
    fn mul_composes_left_to_right() {
        let scale = [2.0, 0.0, 0.0, 2.0, 0.0, 0.0];
        let move_right = translate(100.0, 0.0);
        let combined = mul(scale, move_right);
        // Scaling then translating: a point at (1,1) scales to (2,2), then shifts to (102,2).
        assert_eq!(apply(combined, 1.0, 1.0), (102.0, 2.0));
    }

    fn empty_doc() -> Document {
        let header = b"%PDF-1.4\n";
        let obj1 = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
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
        Document::load(&bytes).unwrap()
    }

    fn op(name: &str, operands: Vec<Object>) -> Operation {
        Operation { operator: name.to_string(), operands }
    }

    #[test]
    fn nested_q_big_q_restores_the_outer_line_width() {
        // `q 2 w q 4 w Q Q`: the inner `Q` restores `w`'s value from right before the inner `q`
        // (2), and the outer `Q` restores the default (1.0); the save stack ends up empty.
        let doc = empty_doc();
        let mut vm = Vm::new(&doc, Object::Null);

        vm.dispatch(&op("q", vec![])).unwrap();
        vm.dispatch(&op("w", vec![Object::Real(2.0)])).unwrap();
        vm.dispatch(&op("q", vec![])).unwrap();
        vm.dispatch(&op("w", vec![Object::Real(4.0)])).unwrap();
        assert_eq!(vm.gs.line_width, 4.0);
        vm.dispatch(&op("Q", vec![])).unwrap();
        assert_eq!(vm.gs.line_width, 2.0);
        vm.dispatch(&op("Q", vec![])).unwrap();
        assert_eq!(vm.gs.line_width, 1.0);
        assert!(vm.gs_stack.is_empty());
    }

    #[test]
    fn unbalanced_big_q_is_a_no_op_rather_than_an_error() {
        let doc = empty_doc();
        let mut vm = Vm::new(&doc, Object::Null);
        assert!(vm.dispatch(&op("Q", vec![])).is_ok());
        assert!(vm.gs_stack.is_empty());
    }
}
