//! End-to-end scenarios exercising the public API against hand-built byte sequences, one per
//! scenario described for the crate's testable properties: a minimal file, a Flate+predictor
//! stream, content-stream spacing, `q`/`Q` balance, an incremental update, and an object stream.

use pdfcore::{Document, ExtractOptions};

fn be(value: u64, width: usize) -> Vec<u8> {
    value.to_be_bytes()[8 - width..].to_vec()
}

/// A catalog with an empty page tree: no pages, and the header version carried through untouched.
#[test]
fn minimal_file_has_no_pages_and_reports_its_header_version() {
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

    let doc = Document::load(&bytes).unwrap();
    assert_eq!(doc.version(), "1.4");
    assert_eq!(doc.pages().unwrap().len(), 0);
}

/// A FlateDecode stream with a PNG Sub predictor (Predictor 11, Columns 5, Colors 1, BPC 8)
/// decodes through both stages to the original two-row, five-sample image.
#[test]
fn flate_stream_with_sub_predictor_decodes_to_original_rows() {
    // zlib.compress([1,10,1,1,1,1,10,1,1,1,1,1], 9): row 0 pre-filtered as `[first_sample,
    // deltas...]`, row 1 all zero deltas after the first (a flat row relative to row 0).
    let compressed: &[u8] = &[120, 218, 99, 228, 98, 4, 2, 48, 193, 8, 0, 0, 243, 0, 31];

    let header = b"%PDF-1.5\n";
    let dict = format!(
        "<< /Filter /FlateDecode /DecodeParms << /Predictor 11 /Columns 5 /Colors 1 /BitsPerComponent 8 >> /Length {} >>",
        compressed.len()
    );
    let mut obj1 = Vec::new();
    obj1.extend_from_slice(b"1 0 obj\n");
    obj1.extend_from_slice(dict.as_bytes());
    obj1.extend_from_slice(b"\nstream\n");
    obj1.extend_from_slice(compressed);
    obj1.extend_from_slice(b"\nendstream\nendobj\n");

    let offset1 = header.len();
    let mut bytes = Vec::new();
    bytes.extend_from_slice(header);
    bytes.extend_from_slice(&obj1);
    let xref_offset = bytes.len();
    bytes.extend_from_slice(b"xref\n0 2\n");
    bytes.extend_from_slice(b"0000000000 65535 f \n");
    bytes.extend_from_slice(format!("{offset1:010} 00000 n \n").as_bytes());
    bytes.extend_from_slice(b"trailer\n<< /Size 2 >>\nstartxref\n");
    bytes.extend_from_slice(xref_offset.to_string().as_bytes());
    bytes.extend_from_slice(b"\n%%EOF");

    let doc = Document::load(&bytes).unwrap();
    let obj = doc.get_object((1, 0)).unwrap();
    let stream = obj.as_stream().unwrap();
    let decoded = stream.decoded().unwrap();
    assert_eq!(decoded, vec![10, 11, 12, 13, 14, 10, 11, 12, 13, 14]);
}

/// Two `Tj` runs separated by a `Td` whose gap equals exactly one space width render as a single
/// line with one space between the words.
#[test]
fn content_stream_spacing_joins_two_runs_with_one_space() {
    let content = b"BT /F1 12 Tf 100 200 Td (Hello) Tj 3 0 Td (World) Tj ET";

    let header = b"%PDF-1.4\n";
    let obj1 = b"1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\nendobj\n";
    let obj2 = b"2 0 obj\n<< /Type /Pages /Kids [3 0 R] /Count 1 >>\nendobj\n";
    let obj3 = b"3 0 obj\n<< /Type /Page /Parent 2 0 R /Contents 5 0 R /Resources << /Font << /F1 4 0 R >> >> >>\nendobj\n";
    // FirstChar/LastChar cover only the space glyph (code 32); every letter falls through to
    // /MissingWidth (absent, so 0), leaving the Td offsets as the sole source of horizontal
    // movement for this scenario.
    let obj4 = b"4 0 obj\n<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /FirstChar 32 /LastChar 32 /Widths [250] >>\nendobj\n";
    let mut obj5 = Vec::new();
    obj5.extend_from_slice(format!("5 0 obj\n<< /Length {} >>\nstream\n", content.len()).as_bytes());
    obj5.extend_from_slice(content);
    obj5.extend_from_slice(b"\nendstream\nendobj\n");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(header);
    let offset1 = bytes.len();
    bytes.extend_from_slice(obj1);
    let offset2 = bytes.len();
    bytes.extend_from_slice(obj2);
    let offset3 = bytes.len();
    bytes.extend_from_slice(obj3);
    let offset4 = bytes.len();
    bytes.extend_from_slice(obj4);
    let offset5 = bytes.len();
    bytes.extend_from_slice(&obj5);

    let xref_offset = bytes.len();
    bytes.extend_from_slice(b"xref\n0 6\n");
    bytes.extend_from_slice(b"0000000000 65535 f \n");
    for offset in [offset1, offset2, offset3, offset4, offset5] {
        bytes.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    bytes.extend_from_slice(b"trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n");
    bytes.extend_from_slice(xref_offset.to_string().as_bytes());
    bytes.extend_from_slice(b"\n%%EOF");

    let doc = Document::load(&bytes).unwrap();
    let pages = doc.pages().unwrap();
    assert_eq!(pages.len(), 1);
    let text = pages[0].extract_text(&ExtractOptions::default()).unwrap();
    assert_eq!(text, "Hello World");
}

/// An object redefined across an incremental update resolves to the newer value, and the older
/// definition is only reachable by nothing (it's shadowed, not merged).
#[test]
fn incremental_update_resolves_to_the_newest_definition() {
    let base = b"%PDF-1.4\n5 0 obj\n1\nendobj\n";
    let base_xref_offset = base.len();
    let mut bytes = base.to_vec();
    bytes.extend_from_slice(
        b"xref\n0 6\n0000000000 65535 f \n0000000000 00000 f \n0000000000 00000 f \n\
          0000000000 00000 f \n0000000000 00000 f \n0000000009 00000 n \n\
          trailer\n<< /Size 6 /Root 1 0 R >>\nstartxref\n",
    );
    bytes.extend_from_slice(base_xref_offset.to_string().as_bytes());
    bytes.extend_from_slice(b"\n%%EOF\n");

    let update_start = bytes.len();
    bytes.extend_from_slice(b"5 0 obj\n2\nendobj\n");
    let update_xref_offset = bytes.len();
    bytes.extend_from_slice(
        format!(
            "xref\n5 1\n{update_start:010} 00000 n \ntrailer\n<< /Size 6 /Root 1 0 R /Prev {base_xref_offset} >>\nstartxref\n"
        )
        .as_bytes(),
    );
    bytes.extend_from_slice(update_xref_offset.to_string().as_bytes());
    bytes.extend_from_slice(b"\n%%EOF");

    let doc = Document::load(&bytes).unwrap();
    assert_eq!(doc.get_object((5, 0)).unwrap().as_i64().unwrap(), 2);
}

/// Two objects packed into a single `/ObjStm`, dereferenced through a cross-reference *stream*
/// (type-2 compressed entries; classic tables have no way to express this).
#[test]
fn object_stream_members_resolve_through_a_compressed_xref_entry() {
    let header = b"%PDF-1.5\n";

    // Offset table "7 0 8 5" (object 7 at relative offset 0, object 8 at relative offset 5),
    // padded out to /First so the two object bodies start exactly where declared.
    let mut payload = b"7 0 8 5\n".to_vec();
    payload.extend_from_slice(b"  "); // pad the header region to First=10
    assert_eq!(payload.len(), 10);
    payload.extend_from_slice(b"42"); // object 7, relative offset 0
    payload.extend_from_slice(b"   "); // pad up to relative offset 5
    payload.extend_from_slice(b"/foo"); // object 8, relative offset 5
    assert_eq!(&payload[10..12], b"42");
    assert_eq!(&payload[15..19], b"/foo");

    let mut obj3 = Vec::new();
    obj3.extend_from_slice(
        format!("3 0 obj\n<< /Type /ObjStm /N 2 /First 10 /Length {} >>\nstream\n", payload.len()).as_bytes(),
    );
    obj3.extend_from_slice(&payload);
    obj3.extend_from_slice(b"\nendstream\nendobj\n");

    let mut bytes = Vec::new();
    bytes.extend_from_slice(header);
    let offset_obj3 = bytes.len();
    bytes.extend_from_slice(&obj3);

    // Cross-reference stream doubling as the trailer. W = [1,2,1]; Index covers ids 0..=4
    // (classic bookkeeping -- 0 free, 1/2 unused-but-free, 3 the ObjStm, 4 this xref stream
    // itself) plus ids 7..=8 (the two compressed members). The xref stream is self-referential:
    // its own in-use record points at the offset where "4 0 obj" itself begins.
    let offset_obj4 = bytes.len();

    let mut records = Vec::new();
    records.extend(be(0, 1)); // id 0: free
    records.extend(be(0, 2));
    records.extend(be(0, 1));
    records.extend(be(0, 1)); // id 1: free
    records.extend(be(0, 2));
    records.extend(be(0, 1));
    records.extend(be(0, 1)); // id 2: free
    records.extend(be(0, 2));
    records.extend(be(0, 1));
    records.extend(be(1, 1)); // id 3: in use, the ObjStm
    records.extend(be(offset_obj3 as u64, 2));
    records.extend(be(0, 1));
    records.extend(be(1, 1)); // id 4: in use, this xref stream
    records.extend(be(offset_obj4 as u64, 2));
    records.extend(be(0, 1));
    records.extend(be(2, 1)); // id 7: compressed, container 3 index 0
    records.extend(be(3, 2));
    records.extend(be(0, 1));
    records.extend(be(2, 1)); // id 8: compressed, container 3 index 1
    records.extend(be(3, 2));
    records.extend(be(1, 1));

    let xref_dict = format!(
        "<< /Type /XRef /Size 9 /W [1 2 1] /Index [0 5 7 2] /Length {} >>",
        records.len()
    );
    let mut obj4 = Vec::new();
    obj4.extend_from_slice(b"4 0 obj\n");
    obj4.extend_from_slice(xref_dict.as_bytes());
    obj4.extend_from_slice(b"\nstream\n");
    obj4.extend_from_slice(&records);
    obj4.extend_from_slice(b"\nendstream\nendobj\n");

    bytes.extend_from_slice(&obj4);
    bytes.extend_from_slice(b"startxref\n");
    bytes.extend_from_slice(offset_obj4.to_string().as_bytes());
    bytes.extend_from_slice(b"\n%%EOF");

    let doc = Document::load(&bytes).unwrap();
    assert_eq!(doc.get_object((7, 0)).unwrap().as_i64().unwrap(), 42);
    assert_eq!(doc.get_object((8, 0)).unwrap().as_name().unwrap(), b"foo");
}
