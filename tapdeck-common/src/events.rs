//! Event types shared between the input driver, the pipeline engine and
//! the playback controller
//!
//! Both event producers feed a single channel of [`ControlEvent`]s. The
//! controller is the only consumer.

use serde::{Deserialize, Serialize};

/// Logical input identifiers delivered by the peripheral driver
///
/// Physical buttons, touch pads and ADC keys are debounced by the driver and
/// arrive here already mapped to one of these.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum InputKey {
    /// Start, pause, resume or rewind depending on the output state
    Play,
    /// Leave the control loop
    Stop,
    /// Stop the current run and advance to the next track
    Mode,
    /// Raise volume by one step
    VolumeUp,
    /// Lower volume by one step
    VolumeDown,
}

impl std::fmt::Display for InputKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputKey::Play => write!(f, "Play"),
            InputKey::Stop => write!(f, "Stop"),
            InputKey::Mode => write!(f, "Mode"),
            InputKey::VolumeUp => write!(f, "Vol+"),
            InputKey::VolumeDown => write!(f, "Vol-"),
        }
    }
}

/// Lifecycle state of a pipeline element
///
/// The controller reads this from the output element to decide what a
/// `Play` tap means.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ElementState {
    /// Constructed, not yet started
    Init,
    /// Actively streaming
    Running,
    /// Suspended, resumable
    Paused,
    /// Stopped by request, awaiting reset
    Stopped,
    /// Source exhausted, awaiting rewind
    Finished,
    /// Element reported an internal failure
    Error,
}

impl std::fmt::Display for ElementState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ElementState::Init => write!(f, "init"),
            ElementState::Running => write!(f, "running"),
            ElementState::Paused => write!(f, "paused"),
            ElementState::Stopped => write!(f, "stopped"),
            ElementState::Finished => write!(f, "finished"),
            ElementState::Error => write!(f, "error"),
        }
    }
}

/// Stream format reported once per track by the decoding stage
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MusicInfo {
    pub sample_rate: u32,
    pub bits: u16,
    pub channels: u16,
}

impl MusicInfo {
    /// Bytes consumed per second of audio at this format
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate as u64 * self.channels as u64 * (self.bits as u64 / 8)
    }
}

/// Status messages emitted by the pipeline engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStatus {
    /// Decoder parsed the stream header
    MusicInfo(MusicInfo),
    /// Output element changed lifecycle state
    StateChanged(ElementState),
}

/// Item of the merged channel the controller listens on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Input(InputKey),
    Pipeline(PipelineStatus),
}

impl From<InputKey> for ControlEvent {
    fn from(key: InputKey) -> Self {
        ControlEvent::Input(key)
    }
}

impl From<PipelineStatus> for ControlEvent {
    fn from(status: PipelineStatus) -> Self {
        ControlEvent::Pipeline(status)
    }
}
