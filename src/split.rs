//! Separating interleaved color and alpha samples into independent planes.
//!
//! PDF image XObjects cannot carry per-pixel alpha inline; an image with an
//! alpha channel is embedded as a color-only image plus a grayscale soft
//! mask. This module produces the two freshly owned planes from one
//! borrowed buffer of unfiltered samples, and materializes the alpha plane
//! of indexed images from their tRNS table.

use crate::common::{packed_row_bytes, BitDepth, ImageHeader};

/// The working representation of an image after the slow path: packed
/// color samples plus an optional independent alpha plane.
#[derive(Debug)]
pub(crate) struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub color_samples: usize,
    /// Packed at `bit_depth`, row-major, rows byte aligned.
    pub color: Vec<u8>,
    pub alpha: Option<AlphaPlane>,
}

/// One grayscale opacity plane, packed at its own bit depth.
///
/// Split planes keep the source depth (a 16 bit alpha channel stays 16
/// bit); planes materialized from an indexed alpha table are 8 bit.
#[derive(Debug)]
pub(crate) struct AlphaPlane {
    pub bit_depth: BitDepth,
    pub data: Vec<u8>,
}

/// Reads consecutive samples out of one bit-packed row, most significant
/// bit first.
struct SampleReader<'a> {
    row: &'a [u8],
    bit: usize,
}

impl<'a> SampleReader<'a> {
    fn new(row: &'a [u8]) -> Self {
        SampleReader { row, bit: 0 }
    }

    fn read(&mut self, depth: usize) -> u16 {
        debug_assert!(depth <= 8 && self.bit % depth == 0);
        let byte = self.row[self.bit / 8];
        let shift = 8 - depth - self.bit % 8;
        self.bit += depth;
        u16::from((byte >> shift) & ((1u16 << depth) - 1) as u8)
    }
}

/// Packs samples into a fresh row-major buffer, byte aligning at the end
/// of every row.
struct SampleWriter {
    out: Vec<u8>,
    acc: u8,
    filled: usize,
}

impl SampleWriter {
    fn with_capacity(bytes: usize) -> Self {
        SampleWriter {
            out: Vec::with_capacity(bytes),
            acc: 0,
            filled: 0,
        }
    }

    fn write(&mut self, sample: u16, depth: usize) {
        debug_assert!(depth <= 8 && sample < (1 << depth));
        self.acc |= (sample as u8) << (8 - depth - self.filled);
        self.filled += depth;
        if self.filled == 8 {
            self.out.push(self.acc);
            self.acc = 0;
            self.filled = 0;
        }
    }

    fn finish_row(&mut self) {
        if self.filled > 0 {
            self.out.push(self.acc);
            self.acc = 0;
            self.filled = 0;
        }
    }

    fn into_inner(self) -> Vec<u8> {
        debug_assert!(self.filled == 0);
        self.out
    }
}

/// Splits the raw unfiltered samples of an alpha-carrying image into a
/// packed color plane and a packed alpha plane, both at the source depth.
pub(crate) fn split(raw: &[u8], header: &ImageHeader) -> DecodedImage {
    debug_assert!(header.color_type.has_alpha_channel());
    let color_samples = header.color_type.color_samples();
    let (color, alpha) = match header.bit_depth {
        BitDepth::Eight => split_bytewise(raw, header, color_samples, 1),
        BitDepth::Sixteen => split_bytewise(raw, header, 2 * color_samples, 2),
        // Alpha-carrying color types are only defined at depth 8 and 16,
        // but nothing here depends on that: sub-byte rows go through the
        // generic bit-packed walk.
        BitDepth::One | BitDepth::Two | BitDepth::Four => {
            split_packed(raw, header, color_samples)
        }
    };
    DecodedImage {
        width: header.width,
        height: header.height,
        bit_depth: header.bit_depth,
        color_samples,
        color,
        alpha: Some(AlphaPlane {
            bit_depth: header.bit_depth,
            data: alpha,
        }),
    }
}

/// Byte aligned case: every pixel is `color_bytes + alpha_bytes` long.
fn split_bytewise(
    raw: &[u8],
    header: &ImageHeader,
    color_bytes: usize,
    alpha_bytes: usize,
) -> (Vec<u8>, Vec<u8>) {
    let pixels = header.width as usize * header.height as usize;
    let mut color = Vec::with_capacity(pixels * color_bytes);
    let mut alpha = Vec::with_capacity(pixels * alpha_bytes);
    for pixel in raw.chunks_exact(color_bytes + alpha_bytes) {
        color.extend_from_slice(&pixel[..color_bytes]);
        alpha.extend_from_slice(&pixel[color_bytes..]);
    }
    (color, alpha)
}

/// Sub-byte case: walk every row through a bit cursor and re-pack each
/// plane at the same depth with per-row byte alignment.
fn split_packed(raw: &[u8], header: &ImageHeader, color_samples: usize) -> (Vec<u8>, Vec<u8>) {
    let depth = header.bit_depth.into_usize();
    let width = header.width as usize;
    let height = header.height as usize;
    let row_bytes = header.row_bytes();
    let color_row_bytes = packed_row_bytes(header.width, color_samples, header.bit_depth);
    let alpha_row_bytes = packed_row_bytes(header.width, 1, header.bit_depth);

    let mut color = SampleWriter::with_capacity(color_row_bytes * height);
    let mut alpha = SampleWriter::with_capacity(alpha_row_bytes * height);
    for row in raw.chunks_exact(row_bytes) {
        let mut samples = SampleReader::new(row);
        for _ in 0..width {
            for _ in 0..color_samples {
                color.write(samples.read(depth), depth);
            }
            alpha.write(samples.read(depth), depth);
        }
        color.finish_row();
        alpha.finish_row();
    }
    (color.into_inner(), alpha.into_inner())
}

/// Materializes the alpha plane of an indexed image: one byte per pixel,
/// looked up from the tRNS table by palette index. Indices beyond the
/// table are fully opaque.
pub(crate) fn indexed_alpha(raw: &[u8], header: &ImageHeader, table: &[u8]) -> AlphaPlane {
    let depth = header.bit_depth.into_usize();
    let width = header.width as usize;
    let height = header.height as usize;
    let row_bytes = header.row_bytes();

    let mut data = Vec::with_capacity(width * height);
    for row in raw.chunks_exact(row_bytes) {
        let mut samples = SampleReader::new(row);
        for _ in 0..width {
            let index = samples.read(depth) as usize;
            data.push(table.get(index).copied().unwrap_or(0xFF));
        }
    }
    AlphaPlane {
        bit_depth: BitDepth::Eight,
        data,
    }
}
