use nom::{
    number::complete::{be_u16, be_u32, u8},
    sequence::tuple,
    IResult,
};

use super::{assemble_chunk, ParseableChunk};
use crate::config::Delay;

pub const DISPOSE_OP_NONE: u8 = 0;
pub const BLEND_OP_SOURCE: u8 = 0;

/// Frame control: placement and timing of the frame data that follows it.
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct fcTLChunk {
    pub sequence_number: u32,
    pub width: u32,
    pub height: u32,
    pub x_offset: u32,
    pub y_offset: u32,
    pub delay_num: u16,
    pub delay_den: u16,
    pub dispose_op: u8,
    pub blend_op: u8,
}

impl fcTLChunk {
    /// A frame covering the whole canvas, replacing what was there.
    pub fn full_frame(sequence_number: u32, width: u32, height: u32, delay: Delay) -> Self {
        Self {
            sequence_number,
            width,
            height,
            x_offset: 0,
            y_offset: 0,
            delay_num: delay.numerator,
            delay_den: delay.denominator,
            dispose_op: DISPOSE_OP_NONE,
            blend_op: BLEND_OP_SOURCE,
        }
    }
}

impl<'a> ParseableChunk<'a> for fcTLChunk {
    type Output = Vec<u8>;

    const HEADER: &'static [u8; 4] = b"fcTL";

    fn from_bytes(chunk_data: &'a [u8]) -> IResult<&'a [u8], Self> {
        let (
            rest,
            (
                sequence_number,
                width,
                height,
                x_offset,
                y_offset,
                delay_num,
                delay_den,
                dispose_op,
                blend_op,
            ),
        ) = tuple((
            be_u32, be_u32, be_u32, be_u32, be_u32, be_u16, be_u16, u8, u8,
        ))(chunk_data)?;
        Ok((
            rest,
            fcTLChunk {
                sequence_number,
                width,
                height,
                x_offset,
                y_offset,
                delay_num,
                delay_den,
                dispose_op,
                blend_op,
            },
        ))
    }

    fn to_bytes(&self) -> Self::Output {
        let mut data = Vec::with_capacity(26);
        for field in [
            self.sequence_number,
            self.width,
            self.height,
            self.x_offset,
            self.y_offset,
        ] {
            data.extend(field.to_be_bytes());
        }
        data.extend(self.delay_num.to_be_bytes());
        data.extend(self.delay_den.to_be_bytes());
        data.extend([self.dispose_op, self.blend_op]);
        assemble_chunk(Self::HEADER, &data)
    }
}
