//! Storage layer used by the health monitor
//!
//! The monitor talks to [`StorageBackend`]; [`FsStorage`] implements it on a
//! directory standing in for the mounted flash partition.

pub mod monitor;

pub use monitor::{keep_monitoring, HealthMonitor, MonitorSettings, MonitorState};

use crate::error::{Error, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// File operations the health check needs
pub trait StorageBackend: Send {
    /// Create or truncate `name`, write `data`, close
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()>;

    /// Open `name`, read at most `max` bytes, close
    fn read(&mut self, name: &str, max: usize) -> Result<Vec<u8>>;
}

/// Make sure the mount point exists and is a directory
pub fn mount(path: &Path) -> Result<PathBuf> {
    let mount_err = |source| Error::Mount {
        path: path.to_path_buf(),
        source,
    };

    std::fs::create_dir_all(path).map_err(mount_err)?;
    let metadata = std::fs::metadata(path).map_err(mount_err)?;
    if !metadata.is_dir() {
        return Err(mount_err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "mount point is not a directory",
        )));
    }

    info!("Storage mounted at {:?}", path);
    Ok(path.to_path_buf())
}

/// [`StorageBackend`] over a directory
#[derive(Debug, Clone)]
pub struct FsStorage {
    root: PathBuf,
}

impl FsStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_of(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl StorageBackend for FsStorage {
    fn write(&mut self, name: &str, data: &[u8]) -> Result<()> {
        let mut file = File::create(self.path_of(name))?;
        file.write_all(data)?;
        file.flush()?;
        Ok(())
    }

    fn read(&mut self, name: &str, max: usize) -> Result<Vec<u8>> {
        let file = File::open(self.path_of(name))?;
        let mut buffer = Vec::with_capacity(max);
        file.take(max as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}
