//! Row predictors applied after core decompression (spec.md §4.C "PNG predictor decode").

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum PngFilterType {
    None = 0,
    Sub = 1,
    Up = 2,
    Average = 3,
    Paeth = 4,
}

impl PngFilterType {
    fn from_tag(tag: u8) -> Option<PngFilterType> {
        match tag {
            0 => Some(PngFilterType::None),
            1 => Some(PngFilterType::Sub),
            2 => Some(PngFilterType::Up),
            3 => Some(PngFilterType::Average),
            4 => Some(PngFilterType::Paeth),
            _ => None,
        }
    }
}

/// Paeth predictor: estimate `e = L + U - UL`, pick whichever of `{L, U, UL}` is closest to `e`,
/// ties broken `L > U > UL` (spec.md §4.C).
fn paeth(left: u8, above: u8, upper_left: u8) -> u8 {
    let l = left as i16;
    let u = above as i16;
    let ul = upper_left as i16;
    let estimate = l + u - ul;

    let dist_l = (estimate - l).abs();
    let dist_u = (estimate - u).abs();
    let dist_ul = (estimate - ul).abs();

    if dist_l <= dist_u && dist_l <= dist_ul {
        left
    } else if dist_u <= dist_ul {
        above
    } else {
        upper_left
    }
}

fn decode_png_row(filter: PngFilterType, bpp: usize, above: &[u8], current: &mut [u8]) {
    let len = current.len();
    match filter {
        PngFilterType::None => {}
        PngFilterType::Sub => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        PngFilterType::Up => {
            for i in 0..len {
                current[i] = current[i].wrapping_add(above[i]);
            }
        }
        PngFilterType::Average => {
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(above[i] / 2);
            }
            for i in bpp..len {
                let left = current[i - bpp] as u16;
                current[i] = current[i].wrapping_add(((left + above[i] as u16) / 2) as u8);
            }
        }
        PngFilterType::Paeth => {
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(paeth(0, above[i], 0));
            }
            for i in bpp..len {
                current[i] = current[i].wrapping_add(paeth(current[i - bpp], above[i], above[i - bpp]));
            }
        }
    }
}

/// Applies the PNG predictor (tags 10..15, spec.md §4.C) to a decompressed byte stream, one
/// tagged row at a time. `Predictor == 15` ("Optimum") means the per-row tag is authoritative;
/// this implementation always trusts the per-row tag, which also correctly handles the other
/// PNG predictor values (10..14), since producers that declare one of them still write a tag
/// byte per row.
pub fn decode_png(data: &[u8], bytes_per_pixel: usize, row_bytes: usize) -> Result<Vec<u8>> {
    let stride = row_bytes + 1;
    let mut out = Vec::with_capacity(data.len());
    let mut previous = vec![0_u8; row_bytes];

    let mut pos = 0;
    while pos + stride <= data.len() {
        let tag = PngFilterType::from_tag(data[pos])
            .ok_or(Error::UnsupportedPredictor(data[pos] as i64))?;
        let mut current = data[pos + 1..pos + stride].to_vec();
        decode_png_row(tag, bytes_per_pixel, &previous, &mut current);
        out.extend_from_slice(&current);
        previous = current;
        pos += stride;
    }
    Ok(out)
}

/// TIFF predictor 2: each sample is the running sum of itself and the sample `colors` positions
/// back within the same row (simple horizontal differencing, 8 bits/component only).
pub fn decode_tiff(data: &[u8], colors: usize, row_bytes: usize) -> Vec<u8> {
    let mut out = data.to_vec();
    for row in out.chunks_mut(row_bytes) {
        for i in colors..row.len() {
            row[i] = row[i].wrapping_add(row[i - colors]);
        }
    }
    out
}
