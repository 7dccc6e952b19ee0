//! Playback controller, session state and track streaming

pub mod controller;
pub mod state;
pub mod stream;
pub mod tracks;

pub use controller::{ControllerSettings, Flow, PlaybackController};
pub use state::{SessionState, Volume};
pub use stream::{StreamCursor, TrackStream};
pub use tracks::{RateTier, TrackDescriptor, TrackSelector, TrackSet};
