//! # Tapdeck Common Library
//!
//! Shared code for the tapdeck binaries including:
//! - Event types exchanged between the input driver, the pipeline engine
//!   and the playback controller
//! - Bootstrap configuration file resolution
//! - Logging initialisation
//! - Terminal fault handling

pub mod config;
pub mod error;
pub mod events;
pub mod fault;
pub mod logging;

pub use error::{Error, Result};
pub use fault::halt_forever;
