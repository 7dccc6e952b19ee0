//! Playback session state
//!
//! Owned by the controller and only touched from its event loop, so no
//! locking is involved.

use tapdeck_common::events::ElementState;

/// Output volume in percent, always within `0..=100`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Volume(u8);

impl Volume {
    pub const MIN: Volume = Volume(0);
    pub const MAX: Volume = Volume(100);

    /// Clamp an arbitrary level into range
    pub fn new(level: i32) -> Self {
        Volume(level.clamp(0, 100) as u8)
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Volume one step up, saturating at 100
    pub fn raised(&self, step: u8) -> Self {
        Volume::new(self.0 as i32 + step as i32)
    }

    /// Volume one step down, saturating at 0
    pub fn lowered(&self, step: u8) -> Self {
        Volume::new(self.0 as i32 - step as i32)
    }
}

impl std::fmt::Display for Volume {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.0)
    }
}

/// Mutable state shared between the event loop and the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionState {
    /// Volume last written to the codec
    pub volume: Volume,
    /// Index of the current track, `None` before the first selection
    pub track_index: Option<usize>,
    /// Last observed lifecycle state of the output element
    pub lifecycle: ElementState,
}

impl SessionState {
    pub fn new(volume: Volume) -> Self {
        Self {
            volume,
            track_index: None,
            lifecycle: ElementState::Init,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_clamps() {
        assert_eq!(Volume::new(150), Volume::MAX);
        assert_eq!(Volume::new(-5), Volume::MIN);
        assert_eq!(Volume::new(42).get(), 42);
    }

    #[test]
    fn test_volume_steps_saturate() {
        assert_eq!(Volume::new(95).raised(10), Volume::MAX);
        assert_eq!(Volume::new(5).lowered(10), Volume::MIN);
        assert_eq!(Volume::new(50).raised(10).get(), 60);
        assert_eq!(Volume::new(50).lowered(10).get(), 40);
    }

    #[test]
    fn test_session_defaults() {
        let session = SessionState::new(Volume::new(70));
        assert_eq!(session.lifecycle, ElementState::Init);
        assert!(session.track_index.is_none());
        assert_eq!(session.volume.to_string(), "70%");
    }
}
