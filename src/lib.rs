pub mod chunks;
pub mod config;
mod crc;
pub mod error;
pub mod inspect;
mod muxer;
pub mod sink;
pub mod still;

pub use config::{Delay, EncoderConfig};
pub use crc::crc32;
pub use error::{ConfigError, FrameError, MuxError};
pub use muxer::{MuxSession, Muxer};
