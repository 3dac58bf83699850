//! # PNG to PDF image transcoding
//!
//! This crate turns a raw PNG byte stream into the set of PDF image
//! XObject descriptors needed to embed the image in a page: the primary
//! image dictionary with its compressed pixel stream, plus an indexed
//! palette lookup and/or a grayscale soft-mask image where the source
//! requires them.
//!
//! PNG and PDF share the same scanline predictor and deflate compression,
//! so for most images the PNG's own compressed data is reused byte for
//! byte (`Predictor` 15); only images with a real per-pixel alpha channel
//! are decoded, split into color and alpha planes, and re-compressed.
//!
//! The crate performs no I/O and writes no PDF syntax. The returned
//! [`ImageObject`] tree is handed to a document writer, which assigns
//! indirect object numbers and serializes the dictionaries and streams.
//!
//! ```no_run
//! let bytes = std::fs::read("photo.png")?;
//! let image = pdf_png::transcode(&bytes)?;
//!
//! assert_eq!(image.filter, "FlateDecode");
//! if let Some(mask) = &image.soft_mask {
//!     // Embed `mask` as its own XObject and reference it via /SMask.
//!     assert_eq!(mask.color_space, pdf_png::ColorSpace::DeviceGray);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(unsafe_code)]

mod builder;
mod chunk;
mod common;
mod error;
mod filter;
mod mask;
mod reader;
mod split;

pub use crate::builder::{transcode, ColorSpace, DecodeParms, ImageObject, FLATE_DECODE};
pub use crate::chunk::ChunkType;
pub use crate::common::{BitDepth, ColorType, Palette, Transparency};
pub use crate::error::{CompressionError, FormatError, TranscodeError, Unsupported};
