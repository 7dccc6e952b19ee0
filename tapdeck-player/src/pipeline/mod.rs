//! Contracts of the audio pipeline, codec and byte supply
//!
//! The controller only talks to these traits. `HostPipeline` and
//! `SoftCodec` are the in-process implementations the binary runs on; tests
//! substitute recording mocks.

pub mod codec;
pub mod host;

pub use codec::SoftCodec;
pub use host::HostPipeline;

use crate::error::Result;
use tapdeck_common::events::{ControlEvent, ElementState, MusicInfo};
use tokio::sync::mpsc::UnboundedSender;

/// Tag the decoder element is registered under
pub const DECODER_TAG: &str = "mp3";

/// Tag the output element is registered under
pub const OUTPUT_TAG: &str = "i2s";

/// Result of one byte-supply call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// This many bytes were copied into the buffer
    Data(usize),
    /// The source is exhausted; not an error
    Done,
}

/// Byte-supply callback installed on a decoding element
///
/// The engine invokes it from its own worker, one call at a time. An
/// implementation must not block.
pub trait ByteSource: Send {
    fn read(&mut self, buf: &mut [u8]) -> ReadOutcome;
}

/// Role of an element inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Pulls bytes from a read source and reports the stream format
    Decoder,
    /// Clocked writer towards the codec
    Output,
}

/// Audio pipeline engine
///
/// Construction, registration and linking happen once at bootstrap. The
/// lifecycle operations mirror a stream pipeline: `run` from `Init`,
/// `pause`/`resume`, and `stop` + `wait_for_stop` + `terminate` to tear a
/// run down before `reset_ringbuffer` + `reset_elements` prepare the next.
pub trait PipelineEngine: Send {
    fn register(&mut self, kind: ElementKind, tag: &str) -> Result<()>;
    fn unregister(&mut self, tag: &str) -> Result<()>;

    /// Chain registered elements in data-flow order
    fn link(&mut self, tags: &[&str]) -> Result<()>;

    /// Install the byte-supply callback of a decoder element
    fn set_read_source(&mut self, tag: &str, source: Box<dyn ByteSource>) -> Result<()>;

    /// Route status events into the controller's merged channel
    fn set_listener(&mut self, listener: UnboundedSender<ControlEvent>) -> Result<()>;
    fn remove_listener(&mut self) -> Result<()>;

    fn run(&mut self) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn wait_for_stop(&mut self) -> Result<()>;
    fn terminate(&mut self) -> Result<()>;
    fn reset_ringbuffer(&mut self) -> Result<()>;
    fn reset_elements(&mut self) -> Result<()>;
    fn change_state(&mut self, target: ElementState) -> Result<()>;

    /// Lifecycle state of the output element
    fn state(&self) -> ElementState;

    /// Configure the output element's clock
    fn set_clock(&mut self, tag: &str, info: MusicInfo) -> Result<()>;
}

/// Codec volume register
pub trait AudioCodec: Send {
    /// Current volume, 0-100
    fn volume(&self) -> Result<u8>;
    fn set_volume(&mut self, volume: u8) -> Result<()>;
}
