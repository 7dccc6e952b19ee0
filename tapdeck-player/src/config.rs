//! tapdeck-player configuration
//!
//! Bootstrap-only TOML file; it is read once at startup and never written.
//! Every field has a built-in default so an absent file (or an absent
//! section) is valid.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tapdeck_common::config::{default_data_dir, load_or_default, load_toml, LoggingConfig};
use tracing::info;

/// Complete player configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub input: KeyBindings,
}

/// Storage health monitor settings
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory standing in for the mounted flash partition
    #[serde(default = "default_mount_point")]
    pub mount_point: PathBuf,

    /// Name of the scratch file rewritten on every check
    #[serde(default = "default_test_file")]
    pub test_file: String,

    /// Payload written and read back
    #[serde(default = "default_payload")]
    pub payload: String,

    /// Delay before the first check, keeps clear of pipeline start-up
    #[serde(default = "default_startup_delay_ms")]
    pub startup_delay_ms: u64,

    /// Interval between checks
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            mount_point: default_mount_point(),
            test_file: default_test_file(),
            payload: default_payload(),
            startup_delay_ms: default_startup_delay_ms(),
            period_ms: default_period_ms(),
        }
    }
}

impl StorageConfig {
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    pub fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// What a `Play` tap does once a track has finished
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FinishedPolicy {
    /// Rewind onto the next track in the rotation
    #[default]
    Next,
    /// Rewind the same track
    Replay,
}

/// Playback controller settings
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Volume change per tap, in percent
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,

    /// Start-up volume; when absent the codec's current volume is kept
    #[serde(default)]
    pub initial_volume: Option<u8>,

    /// Event wait timeout; when absent the loop blocks indefinitely
    #[serde(default)]
    pub event_wait_ms: Option<u64>,

    /// Select the first track and start streaming at boot
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    #[serde(default)]
    pub on_finished: FinishedPolicy,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            volume_step: default_volume_step(),
            initial_volume: None,
            event_wait_ms: None,
            autoplay: default_autoplay(),
            on_finished: FinishedPolicy::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn event_wait(&self) -> Option<Duration> {
        self.event_wait_ms.map(Duration::from_millis)
    }
}

/// Text bound to each logical input on the stdin keypad
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct KeyBindings {
    #[serde(default = "default_play_key")]
    pub play: String,
    #[serde(default = "default_stop_key")]
    pub stop: String,
    #[serde(default = "default_mode_key")]
    pub mode: String,
    #[serde(default = "default_volume_up_key")]
    pub volume_up: String,
    #[serde(default = "default_volume_down_key")]
    pub volume_down: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self {
            play: default_play_key(),
            stop: default_stop_key(),
            mode: default_mode_key(),
            volume_up: default_volume_up_key(),
            volume_down: default_volume_down_key(),
        }
    }
}

impl KeyBindings {
    fn all(&self) -> [&str; 5] {
        [
            &self.play,
            &self.stop,
            &self.mode,
            &self.volume_up,
            &self.volume_down,
        ]
    }
}

fn default_mount_point() -> PathBuf {
    default_data_dir().join("storage")
}

fn default_test_file() -> String {
    "test.txt".to_string()
}

fn default_payload() -> String {
    "hello world".to_string()
}

fn default_startup_delay_ms() -> u64 {
    1000
}

fn default_period_ms() -> u64 {
    2000
}

fn default_volume_step() -> u8 {
    10
}

fn default_autoplay() -> bool {
    true
}

fn default_play_key() -> String {
    "p".to_string()
}

fn default_stop_key() -> String {
    "s".to_string()
}

fn default_mode_key() -> String {
    "m".to_string()
}

fn default_volume_up_key() -> String {
    "+".to_string()
}

fn default_volume_down_key() -> String {
    "-".to_string()
}

impl PlayerConfig {
    /// Resolve, parse and validate the configuration
    pub fn load() -> Result<Self> {
        let config: Self = load_or_default()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a specific file
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = load_toml(path)?;
        config.validate()?;
        info!("Player configuration validated");
        Ok(config)
    }

    /// Reject values the controller or monitor cannot run with
    pub fn validate(&self) -> Result<()> {
        let step = self.playback.volume_step;
        if step == 0 || step > 100 {
            return Err(Error::Config(format!(
                "volume_step must be within 1..=100, got {}",
                step
            )));
        }

        if let Some(volume) = self.playback.initial_volume {
            if volume > 100 {
                return Err(Error::Config(format!(
                    "initial_volume must be within 0..=100, got {}",
                    volume
                )));
            }
        }

        if self.storage.period_ms == 0 {
            return Err(Error::Config("storage period_ms must be positive".to_string()));
        }

        if self.storage.payload.is_empty() {
            return Err(Error::Config("storage payload must not be empty".to_string()));
        }

        if self.storage.test_file.is_empty() {
            return Err(Error::Config("storage test_file must not be empty".to_string()));
        }

        let keys = self.input.all();
        for (i, key) in keys.iter().enumerate() {
            if key.trim().is_empty() {
                return Err(Error::Config("input bindings must not be blank".to_string()));
            }
            if keys[i + 1..].iter().any(|other| other.trim() == key.trim()) {
                return Err(Error::Config(format!("input binding '{}' used twice", key)));
            }
        }

        Ok(())
    }
}
