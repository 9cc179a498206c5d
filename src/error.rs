//! Error types for muxing runs.

use std::time::Duration;

use thiserror::Error;

/// Errors that end a muxing run. No output buffer is produced when one occurs.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MuxError {
    /// No frames were supplied.
    #[error("No frames to mux")]
    EmptyInput,

    /// A frame's chunk stream could not be walked.
    #[error("Frame {frame} is malformed: {source}")]
    MalformedFrame {
        /// Index of the offending frame.
        frame: usize,
        /// What was wrong with it.
        #[source]
        source: FrameError,
    },

    /// A frame's header declares a size other than the configured one.
    #[error(
        "Frame {frame} is {width}x{height}, expected {expected_width}x{expected_height}"
    )]
    DimensionMismatch {
        frame: usize,
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    /// The frame source reported an error while producing a frame.
    #[error("Failed to acquire frame {frame}")]
    AcquisitionFailure {
        frame: usize,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// The frame source did not produce a frame in time.
    #[error("Timed out after {timeout:?} waiting for frame {frame}")]
    AcquisitionTimeout { frame: usize, timeout: Duration },

    /// The frame source ended before yielding every declared frame.
    #[error("Frame source ended after {received} of {expected} frames")]
    SourceExhausted { expected: usize, received: usize },

    /// A session was finished before all declared frames were pushed.
    #[error("Run finished after {received} of {expected} frames")]
    IncompleteRun { expected: usize, received: usize },

    /// More frames were pushed, or declared, than an animation can hold.
    #[error("Too many frames: {0}")]
    TooManyFrames(usize),

    /// The sequence counter would wrap around.
    #[error("Sequence number overflow")]
    SequenceOverflow,

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

/// Ways a single PNG frame buffer can be unusable.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum FrameError {
    #[error("input doesn't start with expected signature")]
    MissingSignature,

    /// A chunk's declared length runs past the end of the buffer.
    #[error("chunk at offset {offset} is truncated")]
    TruncatedChunk { offset: usize },

    /// A chunk's contents are too short for its type.
    #[error("{chunk_type} chunk at offset {offset} has invalid contents")]
    InvalidChunk { offset: usize, chunk_type: String },

    /// A chunk declares more data than a PNG chunk may hold.
    #[error("chunk at offset {offset} declares {length} bytes, more than a chunk may hold")]
    OversizedChunk { offset: usize, length: u32 },

    #[error("first chunk is not IHDR")]
    MissingHeader,

    #[error("no IDAT chunk found")]
    NoImageData,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("dimensions must be non-zero, got {width}x{height}")]
    ZeroDimensions { width: u32, height: u32 },

    #[error("frame rate must be non-zero")]
    ZeroFrameRate,

    #[error("acquisition timeout must be non-zero")]
    ZeroTimeout,
}
