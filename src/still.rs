//! Encodes raw RGBA pixels into a single-image PNG, the kind of frame the muxer consumes.

use anyhow::ensure;
use miniz_oxide::deflate::compress_to_vec_zlib;

use crate::chunks::{
    assemble_chunk, IENDChunk, IHDRChunk, ParseableChunk, IDAT, MAX_CHUNK_LEN, SIGNATURE,
};

/// Largest IDAT payload written unless configured otherwise.
pub const DEFAULT_MAX_IDAT_LEN: usize = 8192;

pub struct StillEncoder {
    header: IHDRChunk,
    max_idat_len: usize,
    level: u8,
}

impl StillEncoder {
    pub fn rgba(width: u32, height: u32) -> Self {
        Self {
            header: IHDRChunk::rgba8(width, height),
            max_idat_len: DEFAULT_MAX_IDAT_LEN,
            level: 6,
        }
    }

    /// Splits the compressed stream over IDAT chunks of at most `len` bytes.
    pub fn with_max_idat_len(mut self, len: usize) -> Self {
        self.max_idat_len = len.clamp(1, MAX_CHUNK_LEN as usize);
        self
    }

    /// zlib level, 0 to 10.
    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level.min(10);
        self
    }

    pub fn encode(&self, pixels: &[u8]) -> anyhow::Result<Vec<u8>> {
        let (width, height) = (self.header.width as usize, self.header.height as usize);
        ensure!(width > 0 && height > 0, "image has no pixels");
        let row_len = width * 4;
        ensure!(
            pixels.len() == row_len * height,
            "expected {} bytes of RGBA data, got {}",
            row_len * height,
            pixels.len()
        );

        // Every scanline gets filter type 0.
        let mut scanlines = Vec::with_capacity((row_len + 1) * height);
        for row in pixels.chunks_exact(row_len) {
            scanlines.push(0);
            scanlines.extend_from_slice(row);
        }
        let compressed = compress_to_vec_zlib(&scanlines, self.level);

        let mut png = SIGNATURE.to_vec();
        png.extend(self.header.to_bytes());
        for part in compressed.chunks(self.max_idat_len) {
            png.extend(assemble_chunk(IDAT, part));
        }
        png.extend(IENDChunk.to_bytes());
        Ok(png)
    }
}
