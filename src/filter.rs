//! Scanline predictor reconstruction and re-filtering.
//!
//! PNG delta-encodes every scanline with one of five byte level filters
//! before compression. The PDF consumer of a passthrough stream performs
//! the identical reconstruction through its predictor-aware FlateDecode
//! parameters; this module performs it locally for planes that have to be
//! re-encoded.
//!
//! Details on how each filter works can be found in the
//! [PNG Book](http://www.libpng.org/pub/png/book/chapter09.html).

use crate::common::ImageHeader;
use crate::error::{FormatErrorInner, TranscodeError};

/// The per-scanline filter type, as stored in the leading byte of every
/// filtered row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum RowFilter {
    NoFilter = 0,
    Sub = 1,
    Up = 2,
    Avg = 3,
    Paeth = 4,
}

impl RowFilter {
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            0 => Some(Self::NoFilter),
            1 => Some(Self::Sub),
            2 => Some(Self::Up),
            3 => Some(Self::Avg),
            4 => Some(Self::Paeth),
            _ => None,
        }
    }
}

/// The Paeth predictor: whichever of left/above/above-left is closest to
/// the gradient estimate, ties broken toward a, then b, then c.
fn filter_paeth(a: u8, b: u8, c: u8) -> u8 {
    let pa = (i16::from(b) - i16::from(c)).abs();
    let pb = (i16::from(a) - i16::from(c)).abs();
    let pc = ((i16::from(a) - i16::from(c)) + (i16::from(b) - i16::from(c))).abs();

    let mut out = a;
    let mut min = pa;

    if pb < min {
        min = pb;
        out = b;
    }
    if pc < min {
        out = c;
    }

    out
}

/// Reconstructs one row in place. `previous` is the already reconstructed
/// row above, or an empty slice for the first row (treated as zeros).
/// All arithmetic wraps modulo 256.
pub(crate) fn unfilter_row(filter: RowFilter, bpp: usize, previous: &[u8], current: &mut [u8]) {
    use self::RowFilter::*;

    let len = current.len();
    match filter {
        NoFilter => {}
        Sub => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        Up => {
            // First row: nothing above, so nothing to add.
            for (curr, &above) in current.iter_mut().zip(previous) {
                *curr = curr.wrapping_add(above);
            }
        }
        Avg if previous.is_empty() => {
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp] / 2);
            }
        }
        Avg => {
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(previous[i] / 2);
            }
            for i in bpp..len {
                let sum = u16::from(current[i - bpp]) + u16::from(previous[i]);
                current[i] = current[i].wrapping_add((sum / 2) as u8);
            }
        }
        Paeth if previous.is_empty() => {
            // b and c are zero, so the predictor degenerates to a.
            for i in bpp..len {
                current[i] = current[i].wrapping_add(current[i - bpp]);
            }
        }
        Paeth => {
            // In the first pixel a and c are zero and the predictor picks b.
            for i in 0..bpp {
                current[i] = current[i].wrapping_add(previous[i]);
            }
            for i in bpp..len {
                let predictor = filter_paeth(current[i - bpp], previous[i], previous[i - bpp]);
                current[i] = current[i].wrapping_add(predictor);
            }
        }
    }
}

/// Reverses the adaptive filter over a whole inflated image, returning the
/// raw packed samples with the filter type bytes stripped.
pub(crate) fn unfilter_image(data: &[u8], header: &ImageHeader) -> Result<Vec<u8>, TranscodeError> {
    let row_bytes = header.row_bytes();
    let stride = row_bytes + 1;
    let expected = header.raw_image_length();
    if data.len() != expected {
        return Err(FormatErrorInner::RowLengthMismatch {
            expected,
            actual: data.len(),
        }
        .into());
    }

    let bpp = header.filter_bytes_per_pixel();
    let mut out = vec![0; row_bytes * header.height as usize];
    for (index, row) in data.chunks_exact(stride).enumerate() {
        let filter =
            RowFilter::from_u8(row[0]).ok_or(FormatErrorInner::UnknownRowFilter(row[0]))?;
        let (done, rest) = out.split_at_mut(index * row_bytes);
        let previous = &done[done.len().saturating_sub(row_bytes)..];
        let current = &mut rest[..row_bytes];
        current.copy_from_slice(&row[1..]);
        unfilter_row(filter, bpp, previous, current);
    }
    Ok(out)
}

/// The mirror operation for re-encoded planes: prefixes every row with
/// filter type 0. Re-encoded planes are small alpha or color buffers, so
/// the compression lost by not refiltering adaptively is acceptable.
pub(crate) fn apply_none_filter(raw: &[u8], row_bytes: usize) -> Vec<u8> {
    debug_assert!(row_bytes > 0 && raw.len() % row_bytes == 0);
    let rows = raw.len() / row_bytes;
    let mut out = Vec::with_capacity(raw.len() + rows);
    for row in raw.chunks_exact(row_bytes) {
        out.push(RowFilter::NoFilter as u8);
        out.extend_from_slice(row);
    }
    out
}
