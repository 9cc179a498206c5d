use std::borrow::Cow;

use nom::{
    bytes::complete::{tag, take},
    combinator::{map_res, verify},
    number::complete::be_u32,
    sequence::tuple,
    IResult,
};

use crate::{crc::chunk_crc, error::FrameError};

pub mod actl;
pub mod fctl;
pub mod fdat;
pub mod iend;
pub mod ihdr;

pub use actl::acTLChunk;
pub use fctl::fcTLChunk;
pub use fdat::fdATChunk;
pub use iend::IENDChunk;
pub use ihdr::IHDRChunk;

/// The eight bytes every PNG stream starts with.
pub const SIGNATURE: &[u8; 8] = b"\x89PNG\x0d\x0a\x1a\x0a";

/// Type tag of the pixel-data chunk.
pub const IDAT: &[u8; 4] = b"IDAT";

/// Length, type and checksum fields around a chunk's data.
pub const CHUNK_OVERHEAD: usize = 12;

/// Largest data length a chunk may declare, 2^31 - 1.
pub const MAX_CHUNK_LEN: u32 = i32::MAX as u32;

/// One chunk as found in a buffer, borrowed in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    /// Offset of the length field from the start of the buffer.
    pub offset: usize,
    /// Declared data length.
    pub length: u32,
    pub chunk_type: &'a [u8; 4],
    pub data: &'a [u8],
    /// Checksum as stored, not verified.
    pub crc: u32,
    /// The whole chunk: length, type, data and checksum.
    pub bytes: &'a [u8],
}

impl<'a> RawChunk<'a> {
    pub fn is(&self, chunk_type: &[u8; 4]) -> bool {
        self.chunk_type == chunk_type
    }

    pub fn type_name(&self) -> Cow<'a, str> {
        String::from_utf8_lossy(self.chunk_type)
    }
}

/// Walks the chunks of a PNG buffer, starting right after the signature.
///
/// The iterator is `Clone`, so a walk can be restarted from any point. Walking stops at the
/// end of the buffer; a chunk whose declared length runs past it yields
/// [`FrameError::TruncatedChunk`] and ends the walk, as does a length above
/// [`MAX_CHUNK_LEN`] ([`FrameError::OversizedChunk`]).
pub fn iter_chunks(source: &[u8]) -> Result<ChunkIter<'_>, FrameError> {
    let (_, sig) = parse_signature(source).map_err(|_| FrameError::MissingSignature)?;
    Ok(ChunkIter {
        source,
        offset: sig.len(),
        finished: false,
    })
}

#[derive(Debug, Clone)]
pub struct ChunkIter<'a> {
    source: &'a [u8],
    offset: usize,
    finished: bool,
}

impl<'a> Iterator for ChunkIter<'a> {
    type Item = Result<RawChunk<'a>, FrameError>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished || self.offset >= self.source.len() {
            return None;
        }
        let input = &self.source[self.offset..];
        match chunk_parts(input) {
            Ok((rest, (length, chunk_type, data, crc))) => {
                let size = input.len() - rest.len();
                let chunk = RawChunk {
                    offset: self.offset,
                    length,
                    chunk_type,
                    data,
                    crc,
                    bytes: &input[..size],
                };
                self.offset += size;
                Some(Ok(chunk))
            }
            Err(_) => {
                self.finished = true;
                let offset = self.offset;
                Some(Err(match be_u32::<_, nom::error::Error<&[u8]>>(input) {
                    Ok((_, length)) if length > MAX_CHUNK_LEN => {
                        FrameError::OversizedChunk { offset, length }
                    }
                    _ => FrameError::TruncatedChunk { offset },
                }))
            }
        }
    }
}

/// Reads the IHDR chunk that opens every PNG.
pub fn read_header(source: &[u8]) -> Result<(RawChunk<'_>, IHDRChunk), FrameError> {
    let header = iter_chunks(source)?
        .next()
        .ok_or(FrameError::MissingHeader)??;
    if !header.is(IHDRChunk::HEADER) {
        return Err(FrameError::MissingHeader);
    }
    Ok((header, parse_data(&header)?))
}

pub(crate) fn parse_signature(input: &[u8]) -> IResult<&[u8], &[u8]> {
    tag(SIGNATURE)(input)
}

fn chunk_parts<'a>(input: &'a [u8]) -> IResult<&'a [u8], (u32, &'a [u8; 4], &'a [u8], u32)> {
    let (input, length) = verify(be_u32, |length: &u32| *length <= MAX_CHUNK_LEN)(input)?;
    let (input, (chunk_type, data, crc)) = tuple((
        map_res(take(4usize), |v: &'a [u8]| <&'a [u8; 4]>::try_from(v)),
        take(length as usize),
        be_u32,
    ))(input)?;
    Ok((input, (length, chunk_type, data, crc)))
}

/// Serialises a chunk: big-endian length, type, data, then the checksum over type and data.
///
/// `data` must not exceed [`MAX_CHUNK_LEN`] + 4 bytes, the most an fdAT built from a readable
/// IDAT can carry.
pub fn assemble_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
    debug_assert!(data.len() <= MAX_CHUNK_LEN as usize + 4);
    let mut bytes = Vec::with_capacity(data.len() + CHUNK_OVERHEAD);
    bytes.extend((data.len() as u32).to_be_bytes());
    bytes.extend(chunk_type);
    bytes.extend(data);
    bytes.extend(chunk_crc(chunk_type, data).to_be_bytes());
    bytes
}

pub trait ParseableChunk<'a>: Sized {
    type Output: AsRef<[u8]>;
    const HEADER: &'static [u8; 4];

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self>;
    fn to_bytes(&self) -> Self::Output;
}

/// Reads the data of `raw` as chunk type `C`.
pub(crate) fn parse_data<'a, C: ParseableChunk<'a>>(raw: &RawChunk<'a>) -> Result<C, FrameError> {
    C::from_bytes(raw.data)
        .map(|(_, chunk)| chunk)
        .map_err(|_| FrameError::InvalidChunk {
            offset: raw.offset,
            chunk_type: raw.type_name().into_owned(),
        })
}

/// Typed view of the chunks this crate reads and writes.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug)]
pub enum Chunk<'a> {
    IHDR(IHDRChunk),
    acTL(acTLChunk),
    fcTL(fcTLChunk),
    IDAT(&'a [u8]),
    fdAT(fdATChunk<'a>),
    IEND,
    Unknown(RawChunk<'a>),
}

impl<'a> Chunk<'a> {
    pub fn decode(raw: RawChunk<'a>) -> Result<Self, FrameError> {
        let chunk = match raw.chunk_type {
            IHDRChunk::HEADER => Chunk::IHDR(parse_data(&raw)?),
            acTLChunk::HEADER => Chunk::acTL(parse_data(&raw)?),
            fcTLChunk::HEADER => Chunk::fcTL(parse_data(&raw)?),
            IDAT => Chunk::IDAT(raw.data),
            fdATChunk::HEADER => Chunk::fdAT(parse_data(&raw)?),
            IENDChunk::HEADER => Chunk::IEND,
            _ => Chunk::Unknown(raw),
        };
        Ok(chunk)
    }
}
