//! Storage health monitor
//!
//! Periodically writes a fixed payload to a scratch file, reads it back and
//! compares byte for byte, independent of playback.
//!
//! ```text
//! Idle (startup delay) -> Checking -> Checking (pass, loop)
//!                                  -> Halted   (fail, terminal)
//! ```
//!
//! Storage corruption is not recoverable without an operator, so the first
//! failed check halts the monitor for good. Playback is unaffected; the
//! only trace is the log.

use super::StorageBackend;
use crate::config::StorageConfig;
use crate::error::{Error, Result};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tapdeck_common::halt_forever;
use tracing::{debug, error, info};

/// Health monitor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    /// Waiting out the startup delay
    Idle,
    /// Running periodic round trips
    Checking,
    /// A check failed; no further checks are made
    Halted,
}

/// Monitor parameters taken from `[storage]`
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub file_name: String,
    pub payload: Vec<u8>,
    pub startup_delay: Duration,
    pub period: Duration,
}

impl From<&StorageConfig> for MonitorSettings {
    fn from(config: &StorageConfig) -> Self {
        Self {
            file_name: config.test_file.clone(),
            payload: config.payload.as_bytes().to_vec(),
            startup_delay: config.startup_delay(),
            period: config.period(),
        }
    }
}

/// Write-then-read-back checker
pub struct HealthMonitor<S> {
    storage: S,
    settings: MonitorSettings,
    state: MonitorState,
    checks_passed: u64,
}

impl<S: StorageBackend> HealthMonitor<S> {
    pub fn new(storage: S, settings: MonitorSettings) -> Self {
        Self {
            storage,
            settings,
            state: MonitorState::Idle,
            checks_passed: 0,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Number of successful round trips so far
    pub fn checks_passed(&self) -> u64 {
        self.checks_passed
    }

    fn round_trip(&mut self) -> Result<()> {
        let payload = &self.settings.payload;
        self.storage.write(&self.settings.file_name, payload)?;
        let read_back = self.storage.read(&self.settings.file_name, payload.len())?;

        if read_back != *payload {
            return Err(Error::Integrity {
                expected: payload.len(),
                actual: read_back,
            });
        }
        Ok(())
    }

    /// Run one check; a halted monitor stays halted and touches nothing
    pub fn step(&mut self) -> MonitorState {
        if self.state == MonitorState::Halted {
            return MonitorState::Halted;
        }
        self.state = MonitorState::Checking;

        match self.round_trip() {
            Ok(()) => {
                self.checks_passed += 1;
                info!(">>> [{:3}] Test file OK", self.checks_passed);
            }
            Err(e) => {
                error!(">>> Test file failed: {}", e);
                self.state = MonitorState::Halted;
            }
        }
        self.state
    }

    /// Monitor loop; never returns
    ///
    /// Sleeps the startup delay, then checks every period until a check
    /// fails, after which the thread idles forever.
    pub fn run(mut self) -> ! {
        debug!(
            "Storage monitor idle for {:?} before first check",
            self.settings.startup_delay
        );
        thread::sleep(self.settings.startup_delay);

        loop {
            if self.step() == MonitorState::Halted {
                halt_forever(&format!(
                    "storage health check failed after {} passes",
                    self.checks_passed
                ));
            }
            thread::sleep(self.settings.period);
        }
    }
}

impl<S: StorageBackend + 'static> HealthMonitor<S> {
    /// Run the monitor on its own OS thread
    ///
    /// The thread is separate from the async runtime and from the pipeline
    /// worker, so slow storage never delays audio output.
    pub fn spawn(self) -> Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("storage-monitor".to_string())
            .spawn(move || {
                self.run();
            })
            .map_err(|e| Error::TaskSpawn(format!("storage monitor: {}", e)))
    }
}

/// Park the caller for as long as the monitor thread lives
///
/// The monitor only ends by parking itself, so this does not return. A
/// monitor thread that unwinds is reported and the caller parks anyway.
pub fn keep_monitoring(handle: JoinHandle<()>) -> ! {
    match handle.join() {
        Ok(()) => halt_forever("storage monitor exited"),
        Err(_) => halt_forever("storage monitor panicked"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FsStorage;
    use tempfile::TempDir;

    fn settings() -> MonitorSettings {
        MonitorSettings {
            file_name: "test.txt".to_string(),
            payload: b"hello world".to_vec(),
            startup_delay: Duration::ZERO,
            period: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_round_trip_passes_on_real_directory() {
        let dir = TempDir::new().unwrap();
        let mut monitor = HealthMonitor::new(FsStorage::new(dir.path()), settings());
        assert_eq!(monitor.state(), MonitorState::Idle);

        assert_eq!(monitor.step(), MonitorState::Checking);
        assert_eq!(monitor.step(), MonitorState::Checking);
        assert_eq!(monitor.checks_passed(), 2);

        let on_disk = std::fs::read(dir.path().join("test.txt")).unwrap();
        assert_eq!(on_disk, b"hello world");
    }

    #[test]
    fn test_missing_mount_halts() {
        let dir = TempDir::new().unwrap();
        let gone = dir.path().join("unmounted");
        let mut monitor = HealthMonitor::new(FsStorage::new(gone), settings());

        assert_eq!(monitor.step(), MonitorState::Halted);
        assert_eq!(monitor.checks_passed(), 0);
    }

    #[test]
    fn test_settings_from_config() {
        let config = StorageConfig::default();
        let settings = MonitorSettings::from(&config);
        assert_eq!(settings.payload, b"hello world");
        assert_eq!(settings.period, Duration::from_secs(2));
        assert_eq!(settings.file_name, "test.txt");
    }
}
