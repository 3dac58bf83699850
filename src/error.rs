//! Error types for the transcoding pipeline.

use std::{error, fmt, io};

use crate::chunk::ChunkType;
use crate::common::{BitDepth, ColorType};

/// The top level error when transcoding a PNG stream fails.
///
/// Every failure is a deterministic function of the input bytes; retrying
/// with the same input cannot succeed. No partial descriptor is ever
/// produced alongside an error.
#[derive(Debug)]
pub enum TranscodeError {
    /// The byte stream violates the PNG container format.
    MalformedContainer(FormatError),
    /// The image uses a PNG feature combination outside the supported matrix.
    UnsupportedFeature(Unsupported),
    /// The underlying inflate/deflate primitive reported corrupted data.
    CompressionFailure(CompressionError),
}

impl error::Error for TranscodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            TranscodeError::CompressionFailure(CompressionError::Deflate(err)) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for TranscodeError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TranscodeError::MalformedContainer(err) => write!(fmt, "{}", err),
            TranscodeError::UnsupportedFeature(err) => write!(fmt, "{}", err),
            TranscodeError::CompressionFailure(err) => write!(fmt, "{}", err),
        }
    }
}

/// A defect in the PNG container itself.
///
/// The variants carried inside are kept private; callers match on
/// [`TranscodeError::MalformedContainer`] and use the `Display`
/// representation for diagnostics.
#[derive(Debug)]
pub struct FormatError {
    inner: FormatErrorInner,
}

#[derive(Debug)]
pub(crate) enum FormatErrorInner {
    InvalidSignature,
    /// The stream ended in the middle of a chunk or before any image data.
    UnexpectedEof,
    CrcMismatch {
        kind: ChunkType,
        recorded: u32,
        computed: u32,
    },
    IhdrNotFirst,
    ShortHeader,
    ZeroImageDimension,
    UnknownColorType(u8),
    UnknownBitDepth(u8),
    UnknownCompressionMethod(u8),
    UnknownFilterMethod(u8),
    UnknownInterlaceMethod(u8),
    UnknownCriticalChunk(ChunkType),
    DuplicateChunk(ChunkType),
    MissingPalette,
    InvalidPaletteLength(usize),
    /// tRNS payload shape does not match the color type, or the indexed
    /// alpha table is longer than the palette.
    InvalidTransparency {
        color_type: ColorType,
        len: usize,
    },
    MissingImageData,
    RowLengthMismatch {
        expected: usize,
        actual: usize,
    },
    UnknownRowFilter(u8),
}

impl fmt::Display for FormatError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        use FormatErrorInner::*;
        match &self.inner {
            InvalidSignature => write!(fmt, "invalid PNG signature"),
            UnexpectedEof => write!(fmt, "unexpected end of the chunk stream"),
            CrcMismatch {
                kind,
                recorded,
                computed,
            } => write!(
                fmt,
                "CRC error: expected {:#x} have {:#x} while decoding {} chunk",
                recorded, computed, kind
            ),
            IhdrNotFirst => write!(fmt, "IHDR chunk missing or not the first chunk"),
            ShortHeader => write!(fmt, "IHDR chunk has the wrong length"),
            ZeroImageDimension => write!(fmt, "image width and height must be greater than zero"),
            UnknownColorType(n) => write!(fmt, "invalid color type ({})", n),
            UnknownBitDepth(n) => write!(fmt, "invalid bit depth ({})", n),
            UnknownCompressionMethod(n) => write!(fmt, "unknown compression method ({})", n),
            UnknownFilterMethod(n) => write!(fmt, "unknown filter method ({})", n),
            UnknownInterlaceMethod(n) => write!(fmt, "unknown interlace method ({})", n),
            UnknownCriticalChunk(kind) => write!(fmt, "unknown critical chunk {}", kind),
            DuplicateChunk(kind) => write!(fmt, "duplicate {} chunk", kind),
            MissingPalette => write!(fmt, "missing palette for indexed image"),
            InvalidPaletteLength(len) => {
                write!(fmt, "palette of invalid length ({} bytes)", len)
            }
            InvalidTransparency { color_type, len } => write!(
                fmt,
                "tRNS payload of {} bytes does not fit color type {:?}",
                len, color_type
            ),
            MissingImageData => write!(fmt, "IDAT chunk missing"),
            RowLengthMismatch { expected, actual } => write!(
                fmt,
                "image data length mismatch: expected {} bytes of filtered rows, have {}",
                expected, actual
            ),
            UnknownRowFilter(n) => write!(fmt, "invalid scanline filter type ({})", n),
        }
    }
}

/// A PNG feature this transcoder deliberately does not handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unsupported {
    /// Adam7 interlaced image data. The passthrough contract requires
    /// sequential scanlines, so interlaced input is refused up front.
    Interlaced,
    /// Indexed color with a 16 bit depth field.
    SixteenBitIndexed,
    /// A color type / bit depth pairing outside the PNG validity matrix.
    ColorDepthCombination(ColorType, BitDepth),
}

impl fmt::Display for Unsupported {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unsupported::Interlaced => write!(fmt, "Adam7 interlaced images are not supported"),
            Unsupported::SixteenBitIndexed => {
                write!(fmt, "16 bit depth is not valid for indexed images")
            }
            Unsupported::ColorDepthCombination(color_type, bit_depth) => write!(
                fmt,
                "invalid combination of color type {:?} and bit depth {:?}",
                color_type, bit_depth
            ),
        }
    }
}

/// Failure of the underlying compression primitive.
#[derive(Debug)]
pub enum CompressionError {
    /// The zlib stream assembled from the IDAT chunks is corrupt.
    CorruptFlateStream(fdeflate::DecompressionError),
    /// Re-compressing a derived plane failed.
    Deflate(io::Error),
}

impl fmt::Display for CompressionError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompressionError::CorruptFlateStream(err) => {
                write!(fmt, "corrupt deflate stream: {:?}", err)
            }
            CompressionError::Deflate(err) => write!(fmt, "deflate failed: {}", err),
        }
    }
}

impl From<FormatErrorInner> for FormatError {
    fn from(inner: FormatErrorInner) -> Self {
        FormatError { inner }
    }
}

impl From<FormatErrorInner> for TranscodeError {
    fn from(inner: FormatErrorInner) -> Self {
        TranscodeError::MalformedContainer(inner.into())
    }
}

impl From<Unsupported> for TranscodeError {
    fn from(err: Unsupported) -> Self {
        TranscodeError::UnsupportedFeature(err)
    }
}

impl From<fdeflate::DecompressionError> for TranscodeError {
    fn from(err: fdeflate::DecompressionError) -> Self {
        TranscodeError::CompressionFailure(CompressionError::CorruptFlateStream(err))
    }
}
