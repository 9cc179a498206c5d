use nom::{combinator::rest, number::complete::be_u32, sequence::tuple, IResult};

use super::{assemble_chunk, ParseableChunk};

/// Frame data for every frame after the first: an IDAT payload behind a sequence number.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct fdATChunk<'a> {
    pub sequence_number: u32,
    pub data: &'a [u8],
}

impl<'a> ParseableChunk<'a> for fdATChunk<'a> {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"fdAT";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (remaining, (sequence_number, data)) = tuple((be_u32, rest))(chunk_data)?;
        Ok((
            remaining,
            fdATChunk {
                sequence_number,
                data,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(self.data.len() + 4);
        data.extend(self.sequence_number.to_be_bytes());
        data.extend(self.data);
        assemble_chunk(Self::HEADER, &data)
    }
}
