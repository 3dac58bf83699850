//! Chunk vocabulary and the low-level, CRC-checked chunk walk.
#![allow(non_upper_case_globals)]

use core::fmt;

use crate::error::{FormatErrorInner, TranscodeError};

/// The four byte type code of a PNG chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkType(pub [u8; 4]);

/// Image header
pub const IHDR: ChunkType = ChunkType(*b"IHDR");
/// Palette
pub const PLTE: ChunkType = ChunkType(*b"PLTE");
/// Image data
pub const IDAT: ChunkType = ChunkType(*b"IDAT");
/// Image trailer
pub const IEND: ChunkType = ChunkType(*b"IEND");
/// Transparency
pub const tRNS: ChunkType = ChunkType(*b"tRNS");

impl ChunkType {
    /// Returns true if the chunk is critical.
    ///
    /// Unknown critical chunks must not be ignored; unknown ancillary
    /// chunks are safe to skip.
    pub fn is_critical(self) -> bool {
        self.0[0] & 32 == 0
    }

    /// Returns true if the chunk is ancillary.
    pub fn is_ancillary(self) -> bool {
        !self.is_critical()
    }
}

impl fmt::Display for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for &c in &self.0 {
            write!(f, "{}", char::from(c).escape_debug())?;
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ChunkType({})", self)
    }
}

/// One chunk of the stream: its type code and payload, CRC already checked.
#[derive(Clone, Copy)]
pub(crate) struct RawChunk<'a> {
    pub kind: ChunkType,
    pub data: &'a [u8],
}

/// Walks a chunk sequence (the bytes following the 8 byte signature),
/// validating the length framing and the CRC of every chunk.
///
/// Iteration ends after the IEND chunk or at the end of the input,
/// whichever comes first; trailing bytes after IEND are ignored.
pub(crate) struct Chunks<'a> {
    bytes: &'a [u8],
    done: bool,
}

impl<'a> Chunks<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Chunks { bytes, done: false }
    }

    fn next_chunk(&mut self) -> Result<RawChunk<'a>, TranscodeError> {
        if self.bytes.len() < 8 {
            return Err(FormatErrorInner::UnexpectedEof.into());
        }
        let length = u32::from_be_bytes(self.bytes[0..4].try_into().unwrap()) as usize;
        let kind = ChunkType(self.bytes[4..8].try_into().unwrap());
        if self.bytes.len() < 12 + length {
            return Err(FormatErrorInner::UnexpectedEof.into());
        }
        let data = &self.bytes[8..8 + length];
        let recorded = u32::from_be_bytes(self.bytes[8 + length..12 + length].try_into().unwrap());

        let mut crc = crc32fast::Hasher::new();
        crc.update(&kind.0);
        crc.update(data);
        let computed = crc.finalize();
        if computed != recorded {
            return Err(FormatErrorInner::CrcMismatch {
                kind,
                recorded,
                computed,
            }
            .into());
        }

        self.bytes = &self.bytes[12 + length..];
        if kind == IEND {
            self.done = true;
        }
        Ok(RawChunk { kind, data })
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<RawChunk<'a>, TranscodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.bytes.is_empty() {
            return None;
        }
        let chunk = self.next_chunk();
        if chunk.is_err() {
            self.done = true;
        }
        Some(chunk)
    }
}
