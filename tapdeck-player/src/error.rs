//! Error types for tapdeck-player
//!
//! Every variant maps onto one fault class. The class decides how the
//! caller reacts: logic and transient faults are logged and the loop goes
//! on, integrity faults halt the storage monitor only, bootstrap faults halt
//! the process.

use std::path::PathBuf;
use tapdeck_common::events::ElementState;
use thiserror::Error;

/// How a fault is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// Unsupported lifecycle state, unknown track index; operation is a no-op
    Logic,
    /// Pipeline, codec or event-wait failure; retried by continuing the loop
    Transient,
    /// Storage round-trip mismatch or I/O failure during a health check
    Integrity,
    /// Mount, config or task-spawn failure; the process cannot continue
    Bootstrap,
}

/// Main error type for tapdeck-player
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading or validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors surfaced by the shared library
    #[error(transparent)]
    Common(#[from] tapdeck_common::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Pipeline engine rejected an operation
    #[error("Pipeline error: {0}")]
    Pipeline(String),

    /// Codec hardware rejected an operation
    #[error("Codec error: {0}")]
    Codec(String),

    /// `Play` received while the output is in a state with no transition
    #[error("Unsupported state: {0}")]
    UnsupportedState(ElementState),

    /// Track index outside the embedded set
    #[error("Unknown track index: {0}")]
    UnknownTrack(usize),

    /// The merged event channel has no more senders
    #[error("Event channel closed")]
    EventWait,

    /// Health-check read-back differs from what was written
    #[error("Integrity mismatch: wrote {expected} bytes, read back {actual:?}")]
    Integrity { expected: usize, actual: Vec<u8> },

    /// Storage mount point unusable
    #[error("Cannot mount storage at {path:?}: {source}")]
    Mount {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Background task could not be created
    #[error("Failed to spawn task: {0}")]
    TaskSpawn(String),
}

impl Error {
    /// Fault class of this error
    ///
    /// Plain I/O errors only reach callers from the storage layer, so they
    /// count as integrity faults.
    pub fn class(&self) -> FaultClass {
        match self {
            Error::UnsupportedState(_) | Error::UnknownTrack(_) => FaultClass::Logic,
            Error::Pipeline(_) | Error::Codec(_) | Error::EventWait => FaultClass::Transient,
            Error::Integrity { .. } | Error::Io(_) => FaultClass::Integrity,
            Error::Config(_) | Error::Common(_) | Error::Mount { .. } | Error::TaskSpawn(_) => {
                FaultClass::Bootstrap
            }
        }
    }
}

/// Convenience Result type using tapdeck-player Error
pub type Result<T> = std::result::Result<T, Error>;
