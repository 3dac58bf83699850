//! Assembling the PDF image XObject descriptors.
//!
//! The descriptor tree returned here is self contained: the primary image
//! holds its optional soft mask by value, and the external document writer
//! is responsible for assigning indirect object numbers and wiring the
//! references between them.

use std::borrow::Cow;
use std::io::Write;

use flate2::write::ZlibEncoder;
use flate2::Compression;

use crate::common::{packed_row_bytes, ColorType, ImageHeader, Palette, Transparency};
use crate::error::{CompressionError, TranscodeError};
use crate::filter::{apply_none_filter, unfilter_image};
use crate::mask::{classify, color_key_values, MaskKind, MaskSpec};
use crate::reader::{parse, ParsedPng};
use crate::split::{indexed_alpha, split, AlphaPlane};

/// The PDF compression filter every produced stream uses.
pub const FLATE_DECODE: &str = "FlateDecode";

/// Predictor code declaring PNG adaptive filtering on the stream.
const PREDICTOR_PNG_ADAPTIVE: u8 = 15;
/// Predictor code declaring unfiltered rows.
const PREDICTOR_NONE: u8 = 1;

/// The color space entry of an image dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
    /// An indexed space over a DeviceRGB base: the highest valid index and
    /// the raw R,G,B lookup stream.
    Indexed { hival: u8, lookup: Vec<u8> },
}

impl ColorSpace {
    fn for_image(color_type: ColorType, palette: Option<&Palette>) -> ColorSpace {
        match color_type {
            ColorType::Grayscale | ColorType::GrayscaleAlpha => ColorSpace::DeviceGray,
            ColorType::Rgb | ColorType::RgbAlpha => ColorSpace::DeviceRgb,
            ColorType::Indexed => {
                // The reader guarantees a palette for indexed images.
                let palette = palette.expect("indexed image without palette");
                ColorSpace::Indexed {
                    hival: palette.hival(),
                    lookup: palette.lookup_bytes(),
                }
            }
        }
    }
}

/// The decode parameters of a FlateDecode stream, mirroring the source
/// image on passthrough and the re-encoded plane otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeParms {
    pub predictor: u8,
    pub colors: u8,
    pub columns: u32,
    pub bits_per_component: u8,
}

/// One image XObject: the dictionary fields plus its compressed stream,
/// with an optional nested descriptor for the soft mask.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageObject {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    /// Always [`FLATE_DECODE`].
    pub filter: &'static str,
    pub decode_parms: DecodeParms,
    /// The compressed image data stream.
    pub data: Vec<u8>,
    /// Inline color-key mask values: a min/max pair per component.
    pub mask: Option<Vec<u16>>,
    /// The sample decode array; `[0, 1]` on soft masks.
    pub decode: Option<[f32; 2]>,
    /// The soft-mask image referenced from this one.
    pub soft_mask: Option<Box<ImageObject>>,
}

impl ImageObject {
    /// Byte length of the compressed stream, the dictionary's `Length`.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Transcodes one PNG byte stream into its PDF image descriptor tree.
///
/// Whenever the compressed scanlines can be consumed as-is by a
/// predictor-aware FlateDecode (everything except images with a real
/// alpha channel), the original IDAT bytes are passed through untouched.
/// Only planes that cannot be represented in place are decoded and
/// re-compressed.
pub fn transcode(bytes: &[u8]) -> Result<ImageObject, TranscodeError> {
    let ParsedPng {
        header,
        palette,
        transparency,
        idat,
    } = parse(bytes)?;

    match classify(&header, transparency.as_ref()) {
        MaskKind::Opaque => build_passthrough(&header, palette.as_ref(), idat, MaskSpec::None),
        MaskKind::ColorKey => {
            let key = match &transparency {
                Some(Transparency::ColorKey(key)) => key,
                _ => unreachable!("color-key mask without color key"),
            };
            let values = color_key_values(key, header.bit_depth);
            build_passthrough(&header, palette.as_ref(), idat, MaskSpec::ColorKey(values))
        }
        MaskKind::IndexedAlpha => {
            let table = match &transparency {
                Some(Transparency::AlphaTable(table)) => table,
                _ => unreachable!("indexed alpha mask without table"),
            };
            // The index stream itself stays untouched; only the soft mask
            // needs the decoded pixels.
            let raw = unfilter_image(&inflate(&idat)?, &header)?;
            let alpha = indexed_alpha(&raw, &header, table);
            build_passthrough(&header, palette.as_ref(), idat, MaskSpec::SoftMask(alpha))
        }
        MaskKind::AlphaChannel => build_split(&header, &idat),
    }
}

/// Fast path: the concatenated IDAT payloads become the stream, and the
/// decode parameters mirror the PNG header so the consumer reverses the
/// adaptive filter itself.
fn build_passthrough(
    header: &ImageHeader,
    palette: Option<&Palette>,
    idat: Cow<'_, [u8]>,
    mask: MaskSpec,
) -> Result<ImageObject, TranscodeError> {
    let (mask_values, soft_mask) = match mask {
        MaskSpec::None => (None, None),
        MaskSpec::ColorKey(values) => (Some(values), None),
        MaskSpec::SoftMask(plane) => (None, Some(Box::new(build_soft_mask(header, plane)?))),
    };
    Ok(ImageObject {
        width: header.width,
        height: header.height,
        bits_per_component: header.bit_depth as u8,
        color_space: ColorSpace::for_image(header.color_type, palette),
        filter: FLATE_DECODE,
        decode_parms: DecodeParms {
            predictor: PREDICTOR_PNG_ADAPTIVE,
            colors: header.color_type.color_samples() as u8,
            columns: header.width,
            bits_per_component: header.bit_depth as u8,
        },
        data: idat.into_owned(),
        mask: mask_values,
        decode: None,
        soft_mask,
    })
}

/// Slow path for images with an alpha channel: decode, split the planes,
/// and re-compress each one with unfiltered rows.
fn build_split(header: &ImageHeader, idat: &[u8]) -> Result<ImageObject, TranscodeError> {
    let raw = unfilter_image(&inflate(idat)?, header)?;
    let image = split(&raw, header);
    let plane = image.alpha.expect("alpha-carrying image without alpha plane");

    // The descriptor states what the plane actually contains, which after
    // a split is still the source geometry and depth.
    let color_row_bytes = packed_row_bytes(image.width, image.color_samples, image.bit_depth);
    let data = deflate(&apply_none_filter(&image.color, color_row_bytes))?;

    Ok(ImageObject {
        width: image.width,
        height: image.height,
        bits_per_component: image.bit_depth as u8,
        color_space: ColorSpace::for_image(header.color_type, None),
        filter: FLATE_DECODE,
        decode_parms: DecodeParms {
            predictor: PREDICTOR_NONE,
            colors: image.color_samples as u8,
            columns: image.width,
            bits_per_component: image.bit_depth as u8,
        },
        data,
        mask: None,
        decode: None,
        soft_mask: Some(Box::new(build_soft_mask(header, plane)?)),
    })
}

/// Wraps one alpha plane into its own grayscale image descriptor.
fn build_soft_mask(header: &ImageHeader, plane: AlphaPlane) -> Result<ImageObject, TranscodeError> {
    let row_bytes = packed_row_bytes(header.width, 1, plane.bit_depth);
    let data = deflate(&apply_none_filter(&plane.data, row_bytes))?;
    Ok(ImageObject {
        width: header.width,
        height: header.height,
        bits_per_component: plane.bit_depth as u8,
        color_space: ColorSpace::DeviceGray,
        filter: FLATE_DECODE,
        decode_parms: DecodeParms {
            predictor: PREDICTOR_NONE,
            colors: 1,
            columns: header.width,
            bits_per_component: plane.bit_depth as u8,
        },
        data,
        mask: None,
        decode: Some([0.0, 1.0]),
        soft_mask: None,
    })
}

fn inflate(data: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    Ok(fdeflate::decompress_to_vec(data)?)
}

fn deflate(data: &[u8]) -> Result<Vec<u8>, TranscodeError> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder
        .write_all(data)
        .and_then(|()| encoder.finish())
        .map_err(|err| TranscodeError::CompressionFailure(CompressionError::Deflate(err)))
}
