//! Deciding how PNG transparency maps onto the PDF side.
//!
//! PNG has two unrelated transparency mechanisms besides a full alpha
//! channel: a single fully transparent color value (tRNS on grayscale and
//! RGB images) and a per-palette-index alpha table (tRNS on indexed
//! images). The first maps onto PDF's native color-key masking with zero
//! decode cost; the other two require a grayscale soft-mask image.

use crate::common::{BitDepth, ColorType, ImageHeader, Transparency};
use crate::split::AlphaPlane;

/// What the image needs on the PDF side, decided before any pixel work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MaskKind {
    /// No mask; the passthrough stream is the whole embedding.
    Opaque,
    /// A color-key mask emitted inline; passthrough still applies.
    ColorKey,
    /// A soft mask split off the image's own alpha channel.
    AlphaChannel,
    /// A soft mask materialized from the palette alpha table.
    IndexedAlpha,
}

/// The resolved transparency representation handed to the object builder.
#[derive(Debug)]
pub(crate) enum MaskSpec {
    None,
    /// Min/max value pairs, one pair per color component.
    ColorKey(Vec<u16>),
    SoftMask(AlphaPlane),
}

/// Classifies the image per the color type / transparency decision table.
///
/// Materializing a soft mask is deferred to the caller so that opaque
/// images never pay for an alpha plane.
pub(crate) fn classify(header: &ImageHeader, transparency: Option<&Transparency>) -> MaskKind {
    use self::ColorType::*;
    match header.color_type {
        Grayscale | Rgb => match transparency {
            Some(Transparency::ColorKey(_)) => MaskKind::ColorKey,
            _ => MaskKind::Opaque,
        },
        Indexed => match transparency {
            Some(Transparency::AlphaTable(_)) => MaskKind::IndexedAlpha,
            _ => MaskKind::Opaque,
        },
        GrayscaleAlpha | RgbAlpha => MaskKind::AlphaChannel,
    }
}

/// Expands a color key into the inline mask value list: a min/max pair per
/// component. Values are the raw samples for depths up to 8; for 16 bit
/// samples the high-order byte of the tRNS field is used.
pub(crate) fn color_key_values(key: &[u16], bit_depth: BitDepth) -> Vec<u16> {
    key.iter()
        .flat_map(|&value| {
            let value = match bit_depth {
                BitDepth::Sixteen => value >> 8,
                _ => value,
            };
            [value, value]
        })
        .collect()
}
