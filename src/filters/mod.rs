//! The stream filter pipeline (spec.md §4.C): composes decoders and applies row predictors.

mod ascii;
mod predictor;

pub use ascii::{decode_ascii85, decode_ascii_hex, decode_run_length, encode_ascii85, encode_ascii_hex};

use crate::error::{Error, Result};
use crate::object::Dictionary;
use std::io::Read;

/// Decodes a stream's raw bytes through its filter chain (spec.md §4.C "Composition rule": left
/// to right, output of filter `i` is input to filter `i+1`).
pub fn decode_chain(raw: &[u8], filters: &[&[u8]], params: &[Option<&Dictionary>]) -> Result<Vec<u8>> {
    let mut current = raw.to_vec();
    for (i, &name) in filters.iter().enumerate() {
        // A short DecodeParms array is treated as all-default for the missing trailing
        // entries (see SPEC_FULL.md's Open Question resolution), rather than an error.
        let params = params.get(i).copied().flatten();
        current = decode_one(name, &current, params)?;
    }
    Ok(current)
}

fn decode_one(name: &[u8], input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    match name {
        b"FlateDecode" | b"Fl" => apply_predictor(decode_flate(input)?, params),
        b"LZWDecode" | b"LZW" => apply_predictor(decode_lzw(input, params)?, params),
        b"ASCII85Decode" | b"A85" => decode_ascii85(input),
        b"ASCIIHexDecode" | b"AHx" => decode_ascii_hex(input),
        b"RunLengthDecode" | b"RL" => decode_run_length(input),
        b"CCITTFaxDecode" | b"CCF" => Err(Error::NotImplemented("CCITTFaxDecode")),
        b"DCTDecode" | b"DCT" => Err(Error::NotImplemented("DCTDecode")),
        b"JPXDecode" => Err(Error::NotImplemented("JPXDecode")),
        b"Crypt" => Err(Error::EncryptedNotSupported),
        other => Err(Error::UnknownFilter(String::from_utf8_lossy(other).into_owned())),
    }
}

fn decode_flate(input: &[u8]) -> Result<Vec<u8>> {
    use flate2::read::ZlibDecoder;
    let mut out = Vec::with_capacity(input.len() * 3);
    if input.is_empty() {
        return Ok(out);
    }
    let mut decoder = ZlibDecoder::new(input);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::FilterFailed { name: "FlateDecode", cause: e.to_string() })?;
    Ok(out)
}

fn decode_lzw(input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
    use weezl::{decode::Decoder, BitOrder};
    const MIN_CODE_WIDTH: u8 = 8;

    let early_change = params
        .and_then(|p| p.get(b"EarlyChange").ok())
        .and_then(|v| v.as_i64().ok())
        .map(|v| v != 0)
        .unwrap_or(true);

    let mut decoder = if early_change {
        Decoder::with_tiff_size_switch(BitOrder::Msb, MIN_CODE_WIDTH)
    } else {
        Decoder::new(BitOrder::Msb, MIN_CODE_WIDTH)
    };

    let mut out = Vec::new();
    let result = decoder.into_stream(&mut out).decode_all(input);
    if let Err(err) = result.status {
        log::warn!("LZWDecode: {err}");
    }
    Ok(out)
}

fn apply_predictor(data: Vec<u8>, params: Option<&Dictionary>) -> Result<Vec<u8>> {
    let Some(params) = params else { return Ok(data) };

    let get_i64 = |key: &[u8], default: i64| -> i64 {
        params.get(key).ok().and_then(|v| v.as_i64().ok()).unwrap_or(default)
    };

    let predictor = get_i64(b"Predictor", 1);
    if predictor == 1 {
        return Ok(data);
    }

    let columns = get_i64(b"Columns", 1).max(1) as usize;
    let colors = get_i64(b"Colors", 1).max(1) as usize;
    let bits_per_component = get_i64(b"BitsPerComponent", 8).max(1) as usize;
    let bytes_per_pixel = (colors * bits_per_component).div_ceil(8).max(1);
    let row_bytes = (colors * bits_per_component * columns).div_ceil(8);

    match predictor {
        2 => Ok(predictor::decode_tiff(&data, colors, row_bytes)),
        10..=15 => predictor::decode_png(&data, bytes_per_pixel, row_bytes),
        other => Err(Error::UnsupportedPredictor(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_filter_is_an_error() {
        let err = decode_chain(b"abc", &[b"BogusDecode"], &[]).unwrap_err();
        assert!(matches!(err, Error::UnknownFilter(_)));
    }

    #[test]
    fn empty_filter_list_is_identity() {
        let out = decode_chain(b"raw bytes", &[], &[]).unwrap();
        assert_eq!(out, b"raw bytes");
    }

    #[test]
    fn crypt_filter_is_rejected() {
        let err = decode_chain(b"abc", &[b"Crypt"], &[]).unwrap_err();
        assert!(matches!(err, Error::EncryptedNotSupported));
    }

    #[test]
    fn unsupported_filters_fail_lazily_not_at_parse_time() {
        // Covered at the Stream level in object.rs: decode_one only runs from Stream::decoded(),
        // never during parsing. Here we just confirm the terminal shape of the error.
        let err = decode_chain(b"\x00", &[b"DCTDecode"], &[]).unwrap_err();
        assert!(matches!(err, Error::NotImplemented("DCTDecode")));
    }
}
