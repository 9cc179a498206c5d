//! Settings fixed for a whole muxing run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How long an asynchronous source gets to produce each frame unless configured otherwise.
pub const DEFAULT_ACQUISITION_TIMEOUT_MS: u64 = 5_000;

fn default_acquisition_timeout_ms() -> u64 {
    DEFAULT_ACQUISITION_TIMEOUT_MS
}

/// Target canvas and timing of the animation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Canvas width in pixels. Every frame must match it.
    pub width: u32,
    /// Canvas height in pixels. Every frame must match it.
    pub height: u32,
    /// Frames per second, used for every frame's display delay.
    pub fps: u32,
    /// How long to wait for each frame from an asynchronous source.
    #[serde(default = "default_acquisition_timeout_ms")]
    pub acquisition_timeout_ms: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 360,
            fps: 15,
            acquisition_timeout_ms: DEFAULT_ACQUISITION_TIMEOUT_MS,
        }
    }
}

impl EncoderConfig {
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps,
            acquisition_timeout_ms: DEFAULT_ACQUISITION_TIMEOUT_MS,
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if self.fps == 0 {
            return Err(ConfigError::ZeroFrameRate);
        }
        if self.acquisition_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    /// Display time of one frame, in thousandths of a second.
    ///
    /// Rates above 1000 fps give a zero numerator, which players treat as "as fast as possible".
    pub fn delay(&self) -> Delay {
        Delay {
            numerator: (1000 / self.fps.max(1)) as u16,
            denominator: 1000,
        }
    }

    pub fn acquisition_timeout(&self) -> Duration {
        Duration::from_millis(self.acquisition_timeout_ms)
    }
}

/// A frame's display time as the fraction `numerator / denominator` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delay {
    pub numerator: u16,
    pub denominator: u16,
}
