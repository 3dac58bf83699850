//! Parsing the PNG container into header metadata, palette, transparency
//! and the concatenated compressed image data.

use std::borrow::Cow;

use crate::chunk::{self, Chunks};
use crate::common::{ColorType, ImageHeader, Palette, Transparency};
use crate::error::{FormatErrorInner, TranscodeError, Unsupported};

/// The fixed 8 byte signature every PNG stream starts with.
pub(crate) const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Everything the rest of the pipeline needs, parsed in one pass.
///
/// The image data borrows from the input when a single IDAT chunk holds
/// the whole compressed stream, and owns the reassembled buffer when the
/// stream was split across several chunks.
pub(crate) struct ParsedPng<'a> {
    pub header: ImageHeader,
    pub palette: Option<Palette>,
    pub transparency: Option<Transparency>,
    pub idat: Cow<'a, [u8]>,
}

pub(crate) fn parse(bytes: &[u8]) -> Result<ParsedPng<'_>, TranscodeError> {
    let rest = bytes
        .strip_prefix(&SIGNATURE)
        .ok_or(FormatErrorInner::InvalidSignature)?;

    let mut chunks = Chunks::new(rest);
    let first = chunks
        .next()
        .ok_or(FormatErrorInner::UnexpectedEof)??;
    if first.kind != chunk::IHDR {
        return Err(FormatErrorInner::IhdrNotFirst.into());
    }
    let header = ImageHeader::from_ihdr(first.data)?;
    if header.interlaced {
        // Adam7 passes cannot be consumed by a sequential predictor, so
        // neither the passthrough nor the re-encode path can handle them.
        return Err(Unsupported::Interlaced.into());
    }

    let mut palette = None;
    let mut transparency = None;
    let mut idat_segments: Vec<&[u8]> = Vec::new();
    for item in chunks {
        let raw = item?;
        match raw.kind {
            chunk::IHDR => return Err(FormatErrorInner::DuplicateChunk(raw.kind).into()),
            chunk::PLTE => {
                if palette.is_some() {
                    return Err(FormatErrorInner::DuplicateChunk(raw.kind).into());
                }
                palette = Some(Palette::from_plte(raw.data)?);
            }
            chunk::tRNS => {
                if transparency.is_some() {
                    return Err(FormatErrorInner::DuplicateChunk(raw.kind).into());
                }
                transparency = Some(parse_trns(raw.data, &header)?);
            }
            chunk::IDAT => idat_segments.push(raw.data),
            chunk::IEND => break,
            kind if kind.is_critical() => {
                return Err(FormatErrorInner::UnknownCriticalChunk(kind).into());
            }
            _ => {}
        }
    }

    if header.color_type == ColorType::Indexed && palette.is_none() {
        return Err(FormatErrorInner::MissingPalette.into());
    }
    if let (Some(Transparency::AlphaTable(table)), Some(palette)) = (&transparency, &palette) {
        if table.len() > palette.len() {
            return Err(FormatErrorInner::InvalidTransparency {
                color_type: header.color_type,
                len: table.len(),
            }
            .into());
        }
    }

    let idat = match idat_segments.as_slice() {
        [] => return Err(FormatErrorInner::MissingImageData.into()),
        [single] => Cow::Borrowed(*single),
        segments => Cow::Owned(segments.concat()),
    };

    Ok(ParsedPng {
        header,
        palette,
        transparency,
        idat,
    })
}

/// Interprets the tRNS payload for the given color type: a 16 bit sample
/// tuple for grayscale and RGB, an alpha table for indexed pixels. Alpha
/// carrying color types never carry tRNS.
fn parse_trns(data: &[u8], header: &ImageHeader) -> Result<Transparency, TranscodeError> {
    let invalid = || FormatErrorInner::InvalidTransparency {
        color_type: header.color_type,
        len: data.len(),
    };
    match header.color_type {
        ColorType::Grayscale | ColorType::Rgb => {
            if data.len() != 2 * header.color_type.color_samples() {
                return Err(invalid().into());
            }
            let key = data
                .chunks_exact(2)
                .map(|field| u16::from_be_bytes([field[0], field[1]]))
                .collect();
            Ok(Transparency::ColorKey(key))
        }
        ColorType::Indexed => {
            if data.len() > 256 {
                return Err(invalid().into());
            }
            Ok(Transparency::AlphaTable(data.to_vec()))
        }
        ColorType::GrayscaleAlpha | ColorType::RgbAlpha => Err(invalid().into()),
    }
}
