use nom::{
    number::complete::{be_u32, u8},
    sequence::tuple,
    IResult,
};

use super::{assemble_chunk, ParseableChunk};

pub(crate) const COLOR_TYPE_RGBA: u8 = 6;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IHDRChunk {
    pub width: u32,
    pub height: u32,
    pub bit_depth: u8,
    pub color_type: u8,
    pub compression_method: u8,
    pub filter_method: u8,
    pub interlace_method: u8,
}

impl IHDRChunk {
    /// Header for an 8-bit, non-interlaced RGBA image.
    pub fn rgba8(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bit_depth: 8,
            color_type: COLOR_TYPE_RGBA,
            ..Default::default()
        }
    }
}

impl<'a> ParseableChunk<'a> for IHDRChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"IHDR";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (
            rest,
            (width, height, bit_depth, color_type, compression_method, filter_method, interlace_method),
        ) = tuple((be_u32, be_u32, u8, u8, u8, u8, u8))(chunk_data)?;
        Ok((
            rest,
            IHDRChunk {
                width,
                height,
                bit_depth,
                color_type,
                compression_method,
                filter_method,
                interlace_method,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(13);
        data.extend(self.width.to_be_bytes());
        data.extend(self.height.to_be_bytes());
        data.extend([
            self.bit_depth,
            self.color_type,
            self.compression_method,
            self.filter_method,
            self.interlace_method,
        ]);
        assemble_chunk(Self::HEADER, &data)
    }
}
