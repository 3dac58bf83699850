//! Common types shared across the transcoding pipeline.

use crate::error::{FormatErrorInner, TranscodeError, Unsupported};

/// PNG color type, as stored in the IHDR chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ColorType {
    Grayscale = 0,
    Rgb = 2,
    Indexed = 3,
    GrayscaleAlpha = 4,
    RgbAlpha = 6,
}

impl ColorType {
    /// Returns the number of samples used per pixel.
    pub fn samples(self) -> usize {
        use self::ColorType::*;
        match self {
            Grayscale | Indexed => 1,
            Rgb => 3,
            GrayscaleAlpha => 2,
            RgbAlpha => 4,
        }
    }

    /// Returns the number of color samples per pixel, not counting alpha.
    ///
    /// Indexed pixels count as one sample; the palette lookup happens on
    /// the consumer's side.
    pub fn color_samples(self) -> usize {
        use self::ColorType::*;
        match self {
            Grayscale | Indexed | GrayscaleAlpha => 1,
            Rgb | RgbAlpha => 3,
        }
    }

    /// Returns true if every pixel carries an alpha sample.
    pub fn has_alpha_channel(self) -> bool {
        matches!(self, ColorType::GrayscaleAlpha | ColorType::RgbAlpha)
    }

    /// u8 -> Self, following the IHDR encoding.
    pub fn from_u8(n: u8) -> Option<ColorType> {
        match n {
            0 => Some(ColorType::Grayscale),
            2 => Some(ColorType::Rgb),
            3 => Some(ColorType::Indexed),
            4 => Some(ColorType::GrayscaleAlpha),
            6 => Some(ColorType::RgbAlpha),
            _ => None,
        }
    }

    /// Checks the pairing against the PNG validity matrix.
    pub(crate) fn check_bit_depth(self, bit_depth: BitDepth) -> Result<(), Unsupported> {
        use self::BitDepth::*;
        use self::ColorType::*;
        let valid = match self {
            Grayscale => true,
            Indexed => match bit_depth {
                Sixteen => return Err(Unsupported::SixteenBitIndexed),
                _ => true,
            },
            Rgb | GrayscaleAlpha | RgbAlpha => matches!(bit_depth, Eight | Sixteen),
        };
        if valid {
            Ok(())
        } else {
            Err(Unsupported::ColorDepthCombination(self, bit_depth))
        }
    }
}

/// Bit depth of the PNG samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BitDepth {
    One = 1,
    Two = 2,
    Four = 4,
    Eight = 8,
    Sixteen = 16,
}

impl BitDepth {
    /// u8 -> Self, following the IHDR encoding.
    pub fn from_u8(n: u8) -> Option<BitDepth> {
        match n {
            1 => Some(BitDepth::One),
            2 => Some(BitDepth::Two),
            4 => Some(BitDepth::Four),
            8 => Some(BitDepth::Eight),
            16 => Some(BitDepth::Sixteen),
            _ => None,
        }
    }

    pub(crate) fn into_usize(self) -> usize {
        self as usize
    }
}

/// Returns the number of bytes one packed row of `width` pixels occupies
/// when each pixel holds `samples` samples of `bit_depth` bits. Rows are
/// byte aligned; samples never straddle a row boundary.
pub(crate) fn packed_row_bytes(width: u32, samples: usize, bit_depth: BitDepth) -> usize {
    let bits = width as usize * samples * bit_depth.into_usize();
    bits / 8 + usize::from(bits % 8 != 0)
}

/// Image metadata parsed once from the IHDR chunk.
#[derive(Debug, Clone, Copy)]
pub struct ImageHeader {
    pub width: u32,
    pub height: u32,
    pub bit_depth: BitDepth,
    pub color_type: ColorType,
    pub interlaced: bool,
}

impl ImageHeader {
    pub(crate) fn from_ihdr(data: &[u8]) -> Result<ImageHeader, TranscodeError> {
        if data.len() != 13 {
            return Err(FormatErrorInner::ShortHeader.into());
        }
        let width = u32::from_be_bytes(data[0..4].try_into().unwrap());
        let height = u32::from_be_bytes(data[4..8].try_into().unwrap());
        if width == 0 || height == 0 {
            return Err(FormatErrorInner::ZeroImageDimension.into());
        }
        let bit_depth =
            BitDepth::from_u8(data[8]).ok_or(FormatErrorInner::UnknownBitDepth(data[8]))?;
        let color_type =
            ColorType::from_u8(data[9]).ok_or(FormatErrorInner::UnknownColorType(data[9]))?;
        color_type.check_bit_depth(bit_depth)?;
        // Both method fields only ever had one standardized value.
        if data[10] != 0 {
            return Err(FormatErrorInner::UnknownCompressionMethod(data[10]).into());
        }
        if data[11] != 0 {
            return Err(FormatErrorInner::UnknownFilterMethod(data[11]).into());
        }
        let interlaced = match data[12] {
            0 => false,
            1 => true,
            n => return Err(FormatErrorInner::UnknownInterlaceMethod(n).into()),
        };
        Ok(ImageHeader {
            width,
            height,
            bit_depth,
            color_type,
            interlaced,
        })
    }

    /// Returns the byte distance between pixels for filter purposes.
    ///
    /// Filtering operates on whole bytes; sub-byte pixels use a one byte
    /// unit, per the PNG filtering rules.
    pub(crate) fn filter_bytes_per_pixel(&self) -> usize {
        self.color_type.samples() * ((self.bit_depth.into_usize() + 7) >> 3)
    }

    /// Returns the number of packed bytes in one row, without the leading
    /// filter type byte.
    pub(crate) fn row_bytes(&self) -> usize {
        packed_row_bytes(self.width, self.color_type.samples(), self.bit_depth)
    }

    /// Returns the length of one filtered row: filter type byte plus the
    /// packed samples.
    pub(crate) fn raw_row_length(&self) -> usize {
        1 + self.row_bytes()
    }

    /// Returns the total number of bytes the inflated image data must hold.
    pub(crate) fn raw_image_length(&self) -> usize {
        self.height as usize * self.raw_row_length()
    }
}

/// The color lookup table of an indexed image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    entries: Vec<[u8; 3]>,
}

impl Palette {
    pub(crate) fn from_plte(data: &[u8]) -> Result<Palette, TranscodeError> {
        if data.is_empty() || data.len() % 3 != 0 || data.len() > 256 * 3 {
            return Err(FormatErrorInner::InvalidPaletteLength(data.len()).into());
        }
        let entries = data
            .chunks_exact(3)
            .map(|rgb| [rgb[0], rgb[1], rgb[2]])
            .collect();
        Ok(Palette { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The highest valid palette index.
    pub fn hival(&self) -> u8 {
        (self.entries.len() - 1) as u8
    }

    /// The raw R,G,B byte stream for the PDF indexed color space lookup.
    pub fn lookup_bytes(&self) -> Vec<u8> {
        self.entries.iter().flatten().copied().collect()
    }
}

/// Transparency information carried by a tRNS chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transparency {
    /// One exact sample value that is fully transparent. One entry for
    /// grayscale, three for RGB, each the 16 bit big-endian tRNS field.
    ColorKey(Vec<u16>),
    /// Per-palette-index alpha values; indices beyond the table are opaque.
    AlphaTable(Vec<u8>),
}
