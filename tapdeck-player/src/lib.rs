//! # Tapdeck Player Library (tapdeck-player)
//!
//! Tap-driven playback controller for a streaming audio pipeline, plus a
//! background storage health monitor that runs beside it.
//!
//! **Architecture:** the controller owns the session state and reacts to
//! one merged event channel (keypad taps and pipeline status). The storage
//! monitor runs on its own thread and shares nothing with the controller
//! except the log.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod input;
pub mod pipeline;
pub mod playback;
pub mod storage;

pub use error::{Error, FaultClass, Result};
pub use playback::PlaybackController;
