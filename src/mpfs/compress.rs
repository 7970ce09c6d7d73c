#![forbid(unsafe_code)]

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{Read, Write};

use crate::mpfs::error::MpfsResult;

/// Payload codec used for image entries.
pub trait Compressor {
    fn compress(&self, data: &[u8]) -> MpfsResult<Vec<u8>>;

    /// Inverse of `compress`; used when extracting and verifying images.
    fn decompress(&self, compressed: &[u8]) -> MpfsResult<Vec<u8>>;

    fn name(&self) -> &'static str;
}

/// DEFLATE in a gzip container, which is what the firmware HTTP server hands to
/// browsers as `Content-Encoding: gzip`.
#[derive(Debug, Clone, Copy)]
pub struct GzipCompressor {
    level: Compression,
}

impl GzipCompressor {
    pub fn new(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new(6)
    }
}

impl Compressor for GzipCompressor {
    fn compress(&self, data: &[u8]) -> MpfsResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.level);
        encoder.write_all(data)?;
        Ok(encoder.finish()?)
    }

    fn decompress(&self, compressed: &[u8]) -> MpfsResult<Vec<u8>> {
        let mut out = Vec::new();
        GzDecoder::new(compressed).read_to_end(&mut out)?;
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "gzip"
    }
}
