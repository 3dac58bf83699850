//! End-to-end tests over in-memory PNG fixtures.
//!
//! Every fixture is synthesized from raw samples: rows are prefixed with
//! filter type 0, deflated into one or more IDAT chunks, and framed with
//! CRC-checked chunks, so each test controls the exact bytes a real
//! encoder would have produced.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rand::{Rng, SeedableRng};

use pdf_png::{transcode, ColorSpace, TranscodeError, Unsupported};

const SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    out.extend_from_slice(&(data.len() as u32).to_be_bytes());
    out.extend_from_slice(kind);
    out.extend_from_slice(data);
    let mut crc = crc32fast::Hasher::new();
    crc.update(kind);
    crc.update(data);
    out.extend_from_slice(&crc.finalize().to_be_bytes());
}

fn ihdr(width: u32, height: u32, bit_depth: u8, color_type: u8) -> [u8; 13] {
    let mut data = [0; 13];
    data[..4].copy_from_slice(&width.to_be_bytes());
    data[4..8].copy_from_slice(&height.to_be_bytes());
    data[8] = bit_depth;
    data[9] = color_type;
    data
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

fn unzlib(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Prefixes every row of `raw` with filter type 0 and deflates the result:
/// the compressed scanline stream of an unfiltered image.
fn idat_stream(raw: &[u8], row_bytes: usize) -> Vec<u8> {
    assert_eq!(raw.len() % row_bytes, 0);
    let mut filtered = Vec::new();
    for row in raw.chunks_exact(row_bytes) {
        filtered.push(0);
        filtered.extend_from_slice(row);
    }
    zlib(&filtered)
}

/// Drops the filter type byte off every row of a re-encoded plane.
fn strip_row_filters(data: &[u8], row_bytes: usize) -> Vec<u8> {
    assert_eq!(data.len() % (row_bytes + 1), 0);
    let mut out = Vec::new();
    for row in data.chunks_exact(row_bytes + 1) {
        assert_eq!(row[0], 0, "re-encoded planes are unfiltered");
        out.extend_from_slice(&row[1..]);
    }
    out
}

struct Fixture {
    ihdr: [u8; 13],
    palette: Option<Vec<u8>>,
    trns: Option<Vec<u8>>,
    stream: Vec<u8>,
    /// Byte offsets at which to split the stream into several IDAT chunks.
    idat_splits: Vec<usize>,
}

impl Fixture {
    fn new(width: u32, height: u32, bit_depth: u8, color_type: u8, raw: &[u8]) -> Fixture {
        let samples = match color_type {
            0 | 3 => 1,
            2 => 3,
            4 => 2,
            6 => 4,
            _ => panic!("bad color type"),
        };
        let bits = width as usize * samples * bit_depth as usize;
        let row_bytes = bits / 8 + usize::from(bits % 8 != 0);
        Fixture {
            ihdr: ihdr(width, height, bit_depth, color_type),
            palette: None,
            trns: None,
            stream: idat_stream(raw, row_bytes),
            idat_splits: Vec::new(),
        }
    }

    fn palette(mut self, rgb: &[u8]) -> Fixture {
        self.palette = Some(rgb.to_vec());
        self
    }

    fn trns(mut self, data: &[u8]) -> Fixture {
        self.trns = Some(data.to_vec());
        self
    }

    fn split_idat(mut self, offsets: &[usize]) -> Fixture {
        self.idat_splits = offsets.to_vec();
        self
    }

    fn bytes(&self) -> Vec<u8> {
        let mut out = SIGNATURE.to_vec();
        chunk(&mut out, b"IHDR", &self.ihdr);
        if let Some(palette) = &self.palette {
            chunk(&mut out, b"PLTE", palette);
        }
        if let Some(trns) = &self.trns {
            chunk(&mut out, b"tRNS", trns);
        }
        let mut start = 0;
        for &offset in &self.idat_splits {
            chunk(&mut out, b"IDAT", &self.stream[start..offset]);
            start = offset;
        }
        chunk(&mut out, b"IDAT", &self.stream[start..]);
        chunk(&mut out, b"IEND", b"");
        out
    }
}

fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut out = vec![0; len];
    rng.fill(&mut out[..]);
    out
}

#[test]
fn rgb_takes_the_fast_path() {
    let (width, height) = (400, 533);
    let raw = random_bytes(width * height * 3, 2);
    let fixture = Fixture::new(width as u32, height as u32, 8, 2, &raw);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.width, 400);
    assert_eq!(image.height, 533);
    assert_eq!(image.bits_per_component, 8);
    assert_eq!(image.color_space, ColorSpace::DeviceRgb);
    assert_eq!(image.filter, "FlateDecode");
    // The stream is the IDAT payload byte for byte.
    assert_eq!(image.data, fixture.stream);
    assert_eq!(image.len(), fixture.stream.len());
    assert_eq!(image.decode_parms.predictor, 15);
    assert_eq!(image.decode_parms.colors, 3);
    assert_eq!(image.decode_parms.columns, 400);
    assert_eq!(image.decode_parms.bits_per_component, 8);
    assert!(image.mask.is_none());
    assert!(image.soft_mask.is_none());
    assert!(image.decode.is_none());
}

#[test]
fn grayscale_takes_the_fast_path() {
    let (width, height) = (320, 428);
    let raw = random_bytes(width * height, 3);
    let fixture = Fixture::new(width as u32, height as u32, 8, 0, &raw);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.color_space, ColorSpace::DeviceGray);
    assert_eq!(image.data, fixture.stream);
    assert_eq!(image.decode_parms.predictor, 15);
    assert_eq!(image.decode_parms.colors, 1);
    assert!(image.mask.is_none() && image.soft_mask.is_none());
}

#[test]
fn sixteen_bit_rgb_with_white_color_key() {
    let raw = random_bytes(32 * 32 * 6, 4);
    let fixture = Fixture::new(32, 32, 16, 2, &raw).trns(&[0xFF; 6]);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.bits_per_component, 16);
    assert_eq!(image.color_space, ColorSpace::DeviceRgb);
    assert_eq!(image.data, fixture.stream);
    assert_eq!(image.mask, Some(vec![255, 255, 255, 255, 255, 255]));
    assert!(image.soft_mask.is_none());
    assert_eq!(image.decode_parms.predictor, 15);
    assert_eq!(image.decode_parms.colors, 3);
    assert_eq!(image.decode_parms.columns, 32);
    assert_eq!(image.decode_parms.bits_per_component, 16);
}

#[test]
fn four_bit_grayscale_with_black_color_key() {
    // 32 pixels of 4 bits make 16 bytes per row.
    let raw = random_bytes(16 * 32, 5);
    let fixture = Fixture::new(32, 32, 4, 0, &raw).trns(&[0x00, 0x00]);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.bits_per_component, 4);
    assert_eq!(image.color_space, ColorSpace::DeviceGray);
    assert_eq!(image.data, fixture.stream);
    assert_eq!(image.mask, Some(vec![0, 0]));
    assert!(image.soft_mask.is_none());
    assert_eq!(image.decode_parms.predictor, 15);
    assert_eq!(image.decode_parms.bits_per_component, 4);
}

#[test]
fn rgba_splits_into_color_plane_and_soft_mask() {
    let (width, height) = (409usize, 400usize);
    let raw = random_bytes(width * height * 4, 6);
    let fixture = Fixture::new(width as u32, height as u32, 8, 6, &raw);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.width, 409);
    assert_eq!(image.height, 400);
    assert_eq!(image.color_space, ColorSpace::DeviceRgb);
    assert_eq!(image.bits_per_component, 8);
    assert!(image.mask.is_none());
    // Re-encoded planes declare unfiltered rows.
    assert_eq!(image.decode_parms.predictor, 1);
    assert_eq!(image.decode_parms.colors, 3);
    assert_eq!(image.decode_parms.columns, 409);

    let mut expected_color = Vec::new();
    let mut expected_alpha = Vec::new();
    for pixel in raw.chunks_exact(4) {
        expected_color.extend_from_slice(&pixel[..3]);
        expected_alpha.push(pixel[3]);
    }
    assert_eq!(
        strip_row_filters(&unzlib(&image.data), width * 3),
        expected_color
    );

    let mask = image.soft_mask.as_deref().unwrap();
    assert_eq!(mask.width, 409);
    assert_eq!(mask.height, 400);
    assert_eq!(mask.color_space, ColorSpace::DeviceGray);
    assert_eq!(mask.decode, Some([0.0, 1.0]));
    assert_eq!(mask.bits_per_component, 8);
    assert_eq!(mask.filter, "FlateDecode");
    assert_eq!(mask.decode_parms.predictor, 1);
    assert_eq!(mask.decode_parms.colors, 1);
    assert_eq!(mask.decode_parms.columns, 409);
    assert!(mask.soft_mask.is_none() && mask.mask.is_none());
    assert_eq!(strip_row_filters(&unzlib(&mask.data), width), expected_alpha);
}

#[test]
fn gray_alpha_splits_into_gray_plane_and_soft_mask() {
    let (width, height) = (112usize, 112usize);
    let raw = random_bytes(width * height * 2, 7);
    let fixture = Fixture::new(width as u32, height as u32, 8, 4, &raw);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.color_space, ColorSpace::DeviceGray);
    assert_eq!(image.decode_parms.colors, 1);
    assert_eq!(image.decode_parms.predictor, 1);

    let expected_gray: Vec<u8> = raw.chunks_exact(2).map(|px| px[0]).collect();
    let expected_alpha: Vec<u8> = raw.chunks_exact(2).map(|px| px[1]).collect();
    assert_eq!(strip_row_filters(&unzlib(&image.data), width), expected_gray);

    let mask = image.soft_mask.as_deref().unwrap();
    assert_eq!(mask.color_space, ColorSpace::DeviceGray);
    assert_eq!(mask.decode, Some([0.0, 1.0]));
    assert_eq!(strip_row_filters(&unzlib(&mask.data), width), expected_alpha);
}

#[test]
fn sixteen_bit_alpha_keeps_its_depth() {
    let (width, height) = (21usize, 9usize);
    let raw = random_bytes(width * height * 8, 8);
    let fixture = Fixture::new(width as u32, height as u32, 16, 6, &raw);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.bits_per_component, 16);
    let mask = image.soft_mask.as_deref().unwrap();
    assert_eq!(mask.bits_per_component, 16);
    assert_eq!(mask.decode_parms.bits_per_component, 16);

    let mut expected_alpha = Vec::new();
    for pixel in raw.chunks_exact(8) {
        expected_alpha.extend_from_slice(&pixel[6..]);
    }
    assert_eq!(
        strip_row_filters(&unzlib(&mask.data), width * 2),
        expected_alpha
    );
}

#[test]
fn indexed_takes_the_fast_path() {
    let (width, height) = (980usize, 540usize);
    let palette = random_bytes(256 * 3, 9);
    let raw = random_bytes(width * height, 10);
    let fixture = Fixture::new(width as u32, height as u32, 8, 3, &raw).palette(&palette);
    let image = transcode(&fixture.bytes()).unwrap();

    assert_eq!(image.data, fixture.stream);
    assert_eq!(
        image.color_space,
        ColorSpace::Indexed {
            hival: 255,
            lookup: palette,
        }
    );
    assert_eq!(image.decode_parms.predictor, 15);
    assert_eq!(image.decode_parms.colors, 1);
    assert_eq!(image.decode_parms.columns, 980);
    assert!(image.mask.is_none() && image.soft_mask.is_none());
}

#[test]
fn indexed_with_alpha_table_keeps_passthrough_and_adds_soft_mask() {
    let palette = random_bytes(245 * 3, 11);
    let table: Vec<u8> = (0..200u16).map(|i| (i % 256) as u8).collect();
    let raw: Vec<u8> = (0..32 * 32u32).map(|i| (i % 245) as u8).collect();
    let fixture = Fixture::new(32, 32, 8, 3, &raw).palette(&palette).trns(&table);
    let image = transcode(&fixture.bytes()).unwrap();

    // The index stream is untouched even though a mask had to be decoded.
    assert_eq!(image.data, fixture.stream);
    assert_eq!(image.decode_parms.predictor, 15);
    match &image.color_space {
        ColorSpace::Indexed { hival, lookup } => {
            assert_eq!(*hival, 244);
            assert_eq!(lookup.len(), 245 * 3);
        }
        other => panic!("expected indexed color space, got {:?}", other),
    }
    assert!(image.mask.is_none());

    let mask = image.soft_mask.as_deref().unwrap();
    assert_eq!(mask.width, 32);
    assert_eq!(mask.height, 32);
    assert_eq!(mask.color_space, ColorSpace::DeviceGray);
    assert_eq!(mask.decode, Some([0.0, 1.0]));
    let alpha = strip_row_filters(&unzlib(&mask.data), 32);
    assert_eq!(alpha.len(), 32 * 32);
    for (&index, &a) in raw.iter().zip(&alpha) {
        let expected = table.get(index as usize).copied().unwrap_or(255);
        assert_eq!(a, expected);
    }
    // Indices past the end of the table are fully opaque.
    assert!(raw.iter().any(|&index| index as usize >= table.len()));
}

#[test]
fn short_alpha_table_on_a_full_palette() {
    // 256 palette entries with a 10 entry table: every untabulated index
    // must come out opaque.
    let palette = random_bytes(256 * 3, 12);
    let raw: Vec<u8> = (0..=255u8).collect();
    let fixture = Fixture::new(16, 16, 8, 3, &raw)
        .palette(&palette)
        .trns(&[7; 10]);
    let image = transcode(&fixture.bytes()).unwrap();

    let mask = image.soft_mask.as_deref().unwrap();
    let alpha = strip_row_filters(&unzlib(&mask.data), 16);
    for (index, &a) in alpha.iter().enumerate() {
        assert_eq!(a, if index < 10 { 7 } else { 255 });
    }
}

#[test]
fn packed_indices_resolve_through_the_alpha_table() {
    // 2-bit indices: four pixels per byte, eight per row.
    let palette = [10, 10, 10, 20, 20, 20, 30, 30, 30, 40, 40, 40];
    let raw = [0b00_01_10_11, 0b11_10_01_00, 0b01_01_01_01, 0b10_10_10_10];
    let fixture = Fixture::new(8, 2, 2, 3, &raw)
        .palette(&palette)
        .trns(&[0, 85, 170]);
    let image = transcode(&fixture.bytes()).unwrap();

    let mask = image.soft_mask.as_deref().unwrap();
    assert_eq!(mask.bits_per_component, 8);
    let alpha = strip_row_filters(&unzlib(&mask.data), 8);
    assert_eq!(
        alpha,
        [0, 85, 170, 255, 255, 170, 85, 0, 85, 85, 85, 85, 170, 170, 170, 170]
    );
}

#[test]
fn multiple_idat_chunks_reassemble_to_the_same_stream() {
    let raw = random_bytes(40 * 40 * 3, 13);
    let whole = Fixture::new(40, 40, 8, 2, &raw);
    let len = whole.stream.len();
    let split = Fixture::new(40, 40, 8, 2, &raw).split_idat(&[1, len / 3, len / 2]);

    let a = transcode(&whole.bytes()).unwrap();
    let b = transcode(&split.bytes()).unwrap();
    assert_eq!(a, b);
    assert_eq!(b.data, whole.stream);
}

#[test]
fn transcoding_is_idempotent() {
    let raw = random_bytes(50 * 20 * 4, 14);
    let fixture = Fixture::new(50, 20, 8, 6, &raw);
    let bytes = fixture.bytes();
    assert_eq!(transcode(&bytes).unwrap(), transcode(&bytes).unwrap());
}

#[test]
fn rejects_interlaced_images() {
    let raw = random_bytes(8 * 8 * 3, 15);
    let mut fixture = Fixture::new(8, 8, 8, 2, &raw);
    fixture.ihdr[12] = 1;
    assert!(matches!(
        transcode(&fixture.bytes()),
        Err(TranscodeError::UnsupportedFeature(Unsupported::Interlaced))
    ));
}

#[test]
fn rejects_malformed_containers() {
    // Signature damage.
    let raw = random_bytes(8 * 8 * 3, 16);
    let fixture = Fixture::new(8, 8, 8, 2, &raw);
    let mut bytes = fixture.bytes();
    bytes[0] = b'J';
    assert!(matches!(
        transcode(&bytes),
        Err(TranscodeError::MalformedContainer(_))
    ));

    // CRC damage inside the IHDR chunk.
    let mut bytes = fixture.bytes();
    bytes[8 + 8] ^= 0xFF;
    assert!(matches!(
        transcode(&bytes),
        Err(TranscodeError::MalformedContainer(_))
    ));
}

#[test]
fn rejects_wrong_amount_of_image_data() {
    // An RGBA stream one row short: the mismatch only surfaces on the
    // decode path, which alpha-carrying images always take.
    let raw = random_bytes(8 * 8 * 4, 17);
    let mut fixture = Fixture::new(8, 8, 8, 6, &raw);
    fixture.stream = {
        let mut filtered = Vec::new();
        for row in raw.chunks_exact(8 * 4).skip(1) {
            filtered.push(0);
            filtered.extend_from_slice(row);
        }
        zlib(&filtered)
    };
    assert!(matches!(
        transcode(&fixture.bytes()),
        Err(TranscodeError::MalformedContainer(_))
    ));
}

#[test]
fn rejects_corrupt_compressed_data() {
    let raw = random_bytes(8 * 8 * 4, 18);
    let mut fixture = Fixture::new(8, 8, 8, 6, &raw);
    fixture.stream = vec![0xAA; 64];
    assert!(matches!(
        transcode(&fixture.bytes()),
        Err(TranscodeError::CompressionFailure(_))
    ));
}
