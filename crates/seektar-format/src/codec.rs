//! Compression stream codec
//!
//! Each segment of the archive is an independent, self-terminating compressed
//! stream. The codec must also decode any concatenation of segments as one
//! continuous stream, which is what keeps the archive readable by ordinary
//! tools.

use std::io::{self, Read, Write};

use flate2::Compression;
use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;

/// Default gzip compression level
pub const DEFAULT_LEVEL: u32 = 6;

/// Highest accepted gzip compression level
pub const MAX_LEVEL: u32 = 9;

/// Compressor producing self-terminating, concatenable segments
pub trait StreamCodec {
    /// Decoder that treats concatenated segments as one stream
    type Decoder<R: Read>: Read;

    /// Compress everything `source` yields as one segment written to `sink`
    ///
    /// Returns the number of uncompressed bytes consumed. An empty source
    /// still produces a valid, non-empty segment.
    fn write_segment<R, W>(&self, source: &mut R, sink: &mut W) -> io::Result<u64>
    where
        R: Read + ?Sized,
        W: Write + ?Sized;

    /// Wrap `source` in a decoder for one or more concatenated segments
    fn decoder<R: Read>(&self, source: R) -> Self::Decoder<R>;

    /// Decode a complete byte range of one or more segments
    fn decode_segment(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut decoded = Vec::new();
        self.decoder(bytes).read_to_end(&mut decoded)?;
        Ok(decoded)
    }
}

/// Gzip codec: one gzip member per segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipCodec {
    level: Compression,
}

impl GzipCodec {
    /// Create a codec with the given compression level (clamped to 0-9)
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(MAX_LEVEL)),
        }
    }

    /// Compression level in use
    pub fn level(&self) -> u32 {
        self.level.level()
    }
}

impl Default for GzipCodec {
    fn default() -> Self {
        Self::new(DEFAULT_LEVEL)
    }
}

impl StreamCodec for GzipCodec {
    type Decoder<R: Read> = MultiGzDecoder<R>;

    fn write_segment<R, W>(&self, source: &mut R, sink: &mut W) -> io::Result<u64>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        let mut encoder = GzEncoder::new(sink, self.level);
        let consumed = io::copy(source, &mut encoder)?;
        encoder.finish()?;
        Ok(consumed)
    }

    fn decoder<R: Read>(&self, source: R) -> Self::Decoder<R> {
        MultiGzDecoder::new(source)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    fn segment(codec: &GzipCodec, data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let consumed = codec
            .write_segment(&mut &data[..], &mut out)
            .expect("compression should succeed");
        assert_eq!(consumed, data.len() as u64);
        out
    }

    #[test]
    fn test_single_segment() {
        let codec = GzipCodec::default();
        let compressed = segment(&codec, b"hello segment");
        assert_eq!(&compressed[..2], &[0x1f, 0x8b]);
        assert_eq!(codec.decode_segment(&compressed).unwrap(), b"hello segment");
    }

    #[test]
    fn test_empty_segment_is_valid() {
        let codec = GzipCodec::default();
        let compressed = segment(&codec, b"");
        assert!(!compressed.is_empty());
        assert!(codec.decode_segment(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_concatenated_segments_decode_as_one_stream() {
        let codec = GzipCodec::new(1);
        let mut joined = segment(&codec, b"first,");
        joined.extend(segment(&codec, b""));
        joined.extend(segment(&codec, b"second"));
        assert_eq!(codec.decode_segment(&joined).unwrap(), b"first,second");
    }

    #[test]
    fn test_level_clamped() {
        assert_eq!(GzipCodec::new(42).level(), MAX_LEVEL);
        assert_eq!(GzipCodec::new(0).level(), 0);
        assert_eq!(GzipCodec::default().level(), DEFAULT_LEVEL);
    }

    #[test]
    fn test_corrupt_segment_fails() {
        let codec = GzipCodec::default();
        let mut compressed = segment(&codec, b"some payload bytes");
        let middle = compressed.len() / 2;
        compressed.truncate(middle);
        assert!(codec.decode_segment(&compressed).is_err());
    }
}
