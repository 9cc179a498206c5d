use nom::{number::complete::be_u32, sequence::tuple, IResult};

use super::{assemble_chunk, ParseableChunk};

/// Animation control: how many frames there are and how often to play them.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct acTLChunk {
    pub num_frames: u32,
    /// 0 loops forever.
    pub num_plays: u32,
}

impl acTLChunk {
    pub fn looping(num_frames: u32) -> Self {
        Self {
            num_frames,
            num_plays: 0,
        }
    }
}

impl<'a> ParseableChunk<'a> for acTLChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"acTL";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (rest, (num_frames, num_plays)) = tuple((be_u32, be_u32))(chunk_data)?;
        Ok((
            rest,
            acTLChunk {
                num_frames,
                num_plays,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = [0; 8];
        data[..4].copy_from_slice(&self.num_frames.to_be_bytes());
        data[4..].copy_from_slice(&self.num_plays.to_be_bytes());
        assemble_chunk(Self::HEADER, &data)
    }
}
