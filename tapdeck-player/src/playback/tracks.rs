//! Embedded track assets and the cyclic track selector

use crate::error::{Error, Result};
use tracing::{error, info};

static LOW_RATE: &[u8] = include_bytes!("../../assets/music_16b_2c_8000hz.wav");
static MEDIUM_RATE: &[u8] = include_bytes!("../../assets/music_16b_2c_22050hz.wav");
static HIGH_RATE: &[u8] = include_bytes!("../../assets/music_16b_2c_44100hz.wav");

/// Sample-rate tier of an embedded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateTier {
    Low,
    Medium,
    High,
}

impl RateTier {
    pub fn sample_rate(&self) -> u32 {
        match self {
            RateTier::Low => 8000,
            RateTier::Medium => 22050,
            RateTier::High => 44100,
        }
    }
}

impl std::fmt::Display for RateTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RateTier::Low => write!(f, "low-rate"),
            RateTier::Medium => write!(f, "medium-rate"),
            RateTier::High => write!(f, "high-rate"),
        }
    }
}

/// Immutable reference to one embedded asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub tier: RateTier,
    pub bytes: &'static [u8],
}

impl TrackDescriptor {
    pub const fn new(tier: RateTier, bytes: &'static [u8]) -> Self {
        Self { tier, bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Closed set of selectable tracks, in rotation order
#[derive(Debug, Clone)]
pub struct TrackSet {
    tracks: Vec<TrackDescriptor>,
}

impl TrackSet {
    /// Build a set from explicit descriptors
    ///
    /// An empty set has nothing to select and is rejected.
    pub fn new(tracks: Vec<TrackDescriptor>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::Config("track set must not be empty".to_string()));
        }
        Ok(Self { tracks })
    }

    /// The three assets compiled into the binary: low, medium, high
    pub fn embedded() -> Self {
        Self {
            tracks: vec![
                TrackDescriptor::new(RateTier::Low, LOW_RATE),
                TrackDescriptor::new(RateTier::Medium, MEDIUM_RATE),
                TrackDescriptor::new(RateTier::High, HIGH_RATE),
            ],
        }
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&TrackDescriptor> {
        self.tracks.get(index).ok_or(Error::UnknownTrack(index))
    }
}

/// Cyclic selection cursor over a [`TrackSet`]
///
/// `select_next` makes the track under the cursor current and then moves
/// the cursor on, wrapping after the last track. The first call therefore
/// selects index 0.
#[derive(Debug, Clone)]
pub struct TrackSelector {
    set: TrackSet,
    next: usize,
    current: Option<usize>,
}

impl TrackSelector {
    pub fn new(set: TrackSet) -> Self {
        Self {
            set,
            next: 0,
            current: None,
        }
    }

    /// Select the track under the cursor and advance the cursor
    ///
    /// An index outside the set leaves the selection unchanged and is
    /// reported as [`Error::UnknownTrack`]; the cursor still advances so the
    /// rotation recovers on the next call.
    pub fn select_next(&mut self) -> Result<TrackDescriptor> {
        let index = self.next;
        self.next = (self.next + 1) % self.set.len();

        let track = match self.set.get(index) {
            Ok(track) => *track,
            Err(e) => {
                error!("Not supported track index = {}", index);
                return Err(e);
            }
        };

        self.current = Some(index);
        info!(
            "Selected track {} ({}, {} bytes)",
            index,
            track.tier,
            track.len()
        );
        Ok(track)
    }

    /// Index of the currently selected track, if any has been selected
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current(&self) -> Option<TrackDescriptor> {
        self.current.and_then(|i| self.set.get(i).ok()).copied()
    }

    pub fn len(&self) -> usize {
        self.set.len()
    }

    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static T0: [u8; 100] = [0; 100];
    static T1: [u8; 50] = [1; 50];
    static T2: [u8; 200] = [2; 200];

    fn scenario_set() -> TrackSet {
        TrackSet::new(vec![
            TrackDescriptor::new(RateTier::Low, &T0),
            TrackDescriptor::new(RateTier::Medium, &T1),
            TrackDescriptor::new(RateTier::High, &T2),
        ])
        .unwrap()
    }

    #[test]
    fn test_embedded_set_has_three_tiers() {
        let set = TrackSet::embedded();
        assert_eq!(set.len(), 3);
        assert_eq!(set.get(0).unwrap().tier, RateTier::Low);
        assert_eq!(set.get(1).unwrap().tier, RateTier::Medium);
        assert_eq!(set.get(2).unwrap().tier, RateTier::High);
        assert!(!set.get(2).unwrap().is_empty());
    }

    #[test]
    fn test_empty_set_rejected() {
        assert!(TrackSet::new(Vec::new()).is_err());
    }

    #[test]
    fn test_selection_is_cyclic() {
        let mut selector = TrackSelector::new(scenario_set());
        assert_eq!(selector.current_index(), None);

        let first = selector.select_next().unwrap();
        assert_eq!(first.len(), 100);

        let lengths: Vec<usize> = (0..3).map(|_| selector.select_next().unwrap().len()).collect();
        assert_eq!(lengths, vec![50, 200, 100]);
        assert_eq!(selector.current_index(), Some(0));
    }

    #[test]
    fn test_unknown_index_rejected() {
        let set = scenario_set();
        assert!(matches!(set.get(3), Err(Error::UnknownTrack(3))));
        assert_eq!(set.get(2).unwrap().len(), 200);
    }

    #[test]
    fn test_tier_rates() {
        assert_eq!(RateTier::Low.sample_rate(), 8000);
        assert_eq!(RateTier::Medium.sample_rate(), 22050);
        assert_eq!(RateTier::High.sample_rate(), 44100);
    }
}
