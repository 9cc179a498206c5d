//! Combines single-image PNGs into one animated PNG.
//!
//! The first frame's IHDR opens the output, followed by the acTL chunk. Every frame then gets
//! an fcTL chunk; the first frame's IDAT chunks are copied as they are, later frames' IDAT
//! chunks are rewritten as fdAT chunks. One counter numbers every fcTL and fdAT chunk in the
//! order they are written.

use futures::{Stream, StreamExt};
use log::{debug, info, warn};

use crate::{
    chunks::{
        iter_chunks, read_header, acTLChunk, fcTLChunk, fdATChunk, IENDChunk, IHDRChunk,
        ParseableChunk, RawChunk, IDAT, SIGNATURE,
    },
    config::{Delay, EncoderConfig},
    error::{FrameError, MuxError},
};

pub struct Muxer {
    config: EncoderConfig,
}

impl Muxer {
    pub fn new(config: EncoderConfig) -> Result<Self, MuxError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Starts a run that expects exactly `frame_count` frames.
    pub fn session(&self, frame_count: usize) -> Result<MuxSession, MuxError> {
        MuxSession::new(&self.config, frame_count)
    }

    /// Muxes frames that are already in memory.
    pub fn mux<I>(&self, frames: I) -> Result<Vec<u8>, MuxError>
    where
        I: IntoIterator,
        I::IntoIter: ExactSizeIterator,
        I::Item: AsRef<[u8]>,
    {
        let frames = frames.into_iter();
        let mut session = self.session(frames.len())?;
        for frame in frames {
            session.push_frame(frame.as_ref())?;
        }
        session.finish()
    }

    /// Muxes `frame_count` frames pulled one at a time from `frames`.
    ///
    /// The next frame is only requested once the previous one has been written, and nothing
    /// past `frame_count` is requested. Each frame must arrive within the configured
    /// acquisition timeout. Dropping the returned future (for instance through
    /// [`futures::future::Abortable`]) cancels the run and frees everything written so far.
    pub async fn mux_stream<S>(&self, frame_count: usize, frames: S) -> Result<Vec<u8>, MuxError>
    where
        S: Stream<Item = anyhow::Result<Vec<u8>>>,
    {
        let mut session = self.session(frame_count)?;
        let timeout = self.config.acquisition_timeout();
        futures::pin_mut!(frames);
        for index in 0..frame_count {
            let next = async_std::future::timeout(timeout, frames.next())
                .await
                .map_err(|_| MuxError::AcquisitionTimeout {
                    frame: index,
                    timeout,
                })?;
            let frame = next
                .ok_or(MuxError::SourceExhausted {
                    expected: frame_count,
                    received: index,
                })?
                .map_err(|e| MuxError::AcquisitionFailure {
                    frame: index,
                    source: e.into(),
                })?;
            session.push_frame(&frame)?;
        }
        session.finish()
    }
}

/// One muxing run in progress.
///
/// Created with the signature already written. [`push_frame`](Self::push_frame) writes one
/// frame at a time and [`finish`](Self::finish) closes the stream, consuming the session.
#[derive(Debug)]
pub struct MuxSession {
    width: u32,
    height: u32,
    delay: Delay,
    frame_count: u32,
    frames_pushed: usize,
    sequence: SequenceCounter,
    output: OutputAccumulator,
}

impl MuxSession {
    fn new(config: &EncoderConfig, frame_count: usize) -> Result<Self, MuxError> {
        if frame_count == 0 {
            return Err(MuxError::EmptyInput);
        }
        let frame_count =
            u32::try_from(frame_count).map_err(|_| MuxError::TooManyFrames(frame_count))?;
        let mut output = OutputAccumulator::default();
        output.push(SIGNATURE.as_slice());
        Ok(Self {
            width: config.width,
            height: config.height,
            delay: config.delay(),
            frame_count,
            frames_pushed: 0,
            sequence: SequenceCounter::default(),
            output,
        })
    }

    pub fn frames_pushed(&self) -> usize {
        self.frames_pushed
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count as usize
    }

    /// Writes the next frame.
    ///
    /// The frame is read completely before anything is written, so a rejected frame leaves
    /// the session as it was.
    pub fn push_frame(&mut self, frame: &[u8]) -> Result<(), MuxError> {
        let index = self.frames_pushed;
        if index >= self.frame_count() {
            return Err(MuxError::TooManyFrames(index + 1));
        }
        let chunks = FrameChunks::read(frame)
            .map_err(|source| MuxError::MalformedFrame { frame: index, source })?;
        if (chunks.header.width, chunks.header.height) != (self.width, self.height) {
            return Err(MuxError::DimensionMismatch {
                frame: index,
                expected_width: self.width,
                expected_height: self.height,
                width: chunks.header.width,
                height: chunks.header.height,
            });
        }
        if !chunks.skipped.is_empty() {
            warn!(
                "Dropping non-IDAT chunks from frame {index}: {}",
                chunks.skipped.join(", ")
            );
        }

        if index == 0 {
            self.sequence.reserve(1)?;
            self.output.push(chunks.raw_header.bytes);
            self.output
                .push(acTLChunk::looping(self.frame_count).to_bytes());
            self.push_frame_control();
            for idat in &chunks.image_data {
                self.output.push(idat.bytes);
            }
        } else {
            self.sequence.reserve(1 + chunks.image_data.len())?;
            self.push_frame_control();
            for idat in &chunks.image_data {
                let fdat = fdATChunk {
                    sequence_number: self.sequence.advance(),
                    data: idat.data,
                };
                self.output.push(fdat.to_bytes());
            }
        }
        debug!(
            "Frame {index}: {} image data chunks, {} bytes written so far",
            chunks.image_data.len(),
            self.output.len()
        );
        self.frames_pushed += 1;
        Ok(())
    }

    fn push_frame_control(&mut self) {
        let fctl =
            fcTLChunk::full_frame(self.sequence.advance(), self.width, self.height, self.delay);
        self.output.push(fctl.to_bytes());
    }

    /// Writes IEND and hands back the finished animation.
    pub fn finish(mut self) -> Result<Vec<u8>, MuxError> {
        if self.frames_pushed != self.frame_count() {
            return Err(MuxError::IncompleteRun {
                expected: self.frame_count(),
                received: self.frames_pushed,
            });
        }
        self.output.push(IENDChunk.to_bytes());
        info!(
            "Muxed {} frames into {} bytes",
            self.frame_count,
            self.output.len()
        );
        Ok(self.output.concat())
    }
}

/// The parts of an input frame that end up in the animation.
struct FrameChunks<'a> {
    raw_header: RawChunk<'a>,
    header: IHDRChunk,
    image_data: Vec<RawChunk<'a>>,
    /// Types of the chunks that are left out, in stream order.
    skipped: Vec<String>,
}

impl<'a> FrameChunks<'a> {
    fn read(frame: &'a [u8]) -> Result<Self, FrameError> {
        let (raw_header, header) = read_header(frame)?;
        let mut image_data = vec![];
        let mut skipped = vec![];
        for chunk in iter_chunks(frame)?.skip(1) {
            let chunk = chunk?;
            if chunk.is(IDAT) {
                image_data.push(chunk);
            } else if !chunk.is(IENDChunk::HEADER) {
                skipped.push(chunk.type_name().into_owned());
            }
        }
        if image_data.is_empty() {
            return Err(FrameError::NoImageData);
        }
        Ok(Self {
            raw_header,
            header,
            image_data,
            skipped,
        })
    }
}

/// Numbers fcTL and fdAT chunks. Starts at 0 and never goes back.
#[derive(Debug, Default)]
struct SequenceCounter {
    next: u64,
}

impl SequenceCounter {
    /// Checks that `count` more numbers fit in 32 bits.
    fn reserve(&self, count: usize) -> Result<(), MuxError> {
        if self.next + count as u64 > u64::from(u32::MAX) + 1 {
            return Err(MuxError::SequenceOverflow);
        }
        Ok(())
    }

    /// Only called within a successful [`reserve`](Self::reserve).
    fn advance(&mut self) -> u32 {
        let sequence_number = self.next as u32;
        self.next += 1;
        sequence_number
    }
}

/// Written chunks, kept in order until the run is finished.
#[derive(Debug, Default)]
struct OutputAccumulator {
    parts: Vec<Vec<u8>>,
    len: usize,
}

impl OutputAccumulator {
    fn push(&mut self, part: impl Into<Vec<u8>>) {
        let part = part.into();
        self.len += part.len();
        self.parts.push(part);
    }

    fn len(&self) -> usize {
        self.len
    }

    fn concat(self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len);
        for part in self.parts {
            bytes.extend(part);
        }
        bytes
    }
}
