//! Software codec volume register

use super::AudioCodec;
use crate::error::{Error, Result};
use tracing::{debug, info};

/// Power-on volume of the software codec
pub const DEFAULT_CODEC_VOLUME: u8 = 50;

/// Codec stand-in that keeps the volume register in memory
#[derive(Debug)]
pub struct SoftCodec {
    volume: u8,
    started: bool,
}

impl SoftCodec {
    pub fn new() -> Self {
        Self {
            volume: DEFAULT_CODEC_VOLUME,
            started: false,
        }
    }

    /// Power up the codec for playback
    pub fn start(&mut self) {
        self.started = true;
        info!("Codec started, volume register at {}%", self.volume);
    }
}

impl Default for SoftCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioCodec for SoftCodec {
    fn volume(&self) -> Result<u8> {
        Ok(self.volume)
    }

    fn set_volume(&mut self, volume: u8) -> Result<()> {
        if volume > 100 {
            return Err(Error::Codec(format!("volume {} out of range", volume)));
        }
        if !self.started {
            return Err(Error::Codec("codec not started".to_string()));
        }
        self.volume = volume;
        debug!("Codec volume register = {}", volume);
        Ok(())
    }
}
