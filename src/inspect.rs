//! Chunk-level listing of a PNG or APNG buffer.

use crate::{
    chunks::{iter_chunks, Chunk, RawChunk},
    crc::chunk_crc,
    error::FrameError,
};

pub struct InspectedChunk<'a> {
    pub raw: RawChunk<'a>,
    pub chunk: Chunk<'a>,
}

impl InspectedChunk<'_> {
    /// Whether the stored checksum matches the chunk's type and data.
    pub fn crc_ok(&self) -> bool {
        chunk_crc(self.raw.chunk_type, self.raw.data) == self.raw.crc
    }

    /// The sequence number of an fcTL or fdAT chunk.
    pub fn sequence_number(&self) -> Option<u32> {
        match &self.chunk {
            Chunk::fcTL(fctl) => Some(fctl.sequence_number),
            Chunk::fdAT(fdat) => Some(fdat.sequence_number),
            _ => None,
        }
    }
}

pub fn inspect(png: &[u8]) -> Result<Vec<InspectedChunk<'_>>, FrameError> {
    iter_chunks(png)?
        .map(|raw| {
            let raw = raw?;
            Ok(InspectedChunk {
                raw,
                chunk: Chunk::decode(raw)?,
            })
        })
        .collect()
}

/// Sequence numbers of every fcTL and fdAT chunk, in stream order.
pub fn sequence_numbers(chunks: &[InspectedChunk]) -> Vec<u32> {
    chunks.iter().filter_map(|c| c.sequence_number()).collect()
}

/// One line per chunk: type, offset, data length and the fields this crate knows about.
pub fn describe(chunks: &[InspectedChunk]) -> String {
    let mut out = String::new();
    for c in chunks {
        let detail = match &c.chunk {
            Chunk::IHDR(h) => format!(
                "{}x{} depth={} color={}",
                h.width, h.height, h.bit_depth, h.color_type
            ),
            Chunk::acTL(a) => format!("frames={} plays={}", a.num_frames, a.num_plays),
            Chunk::fcTL(f) => format!(
                "seq={} {}x{}+{}+{} delay={}/{} dispose={} blend={}",
                f.sequence_number,
                f.width,
                f.height,
                f.x_offset,
                f.y_offset,
                f.delay_num,
                f.delay_den,
                f.dispose_op,
                f.blend_op
            ),
            Chunk::fdAT(f) => format!("seq={}", f.sequence_number),
            Chunk::IDAT(_) | Chunk::IEND | Chunk::Unknown(_) => String::new(),
        };
        let crc = if c.crc_ok() { "" } else { " BAD-CRC" };
        let line = format!(
            "{} {:>6} {:>5}{crc} {detail}",
            c.raw.type_name(),
            c.raw.offset,
            c.raw.length
        );
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}
