//! Start-up steps shared by the binary and its tests
//!
//! Each step returns an error instead of halting so it can be exercised in
//! tests; `main` decides that any failure here is fatal.

use crate::config::{PlayerConfig, StorageConfig};
use crate::error::Result;
use crate::pipeline::{AudioCodec, HostPipeline, SoftCodec};
use crate::playback::{ControllerSettings, PlaybackController, TrackSet, Volume};
use crate::storage::{self, FsStorage, HealthMonitor, MonitorSettings};
use std::thread::JoinHandle;
use tapdeck_common::events::ControlEvent;
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

/// Mount storage and start the health monitor thread
///
/// The returned handle belongs to a thread that only ends by parking
/// itself, see [`storage::monitor::keep_monitoring`].
pub fn boot_storage(config: &StorageConfig) -> Result<JoinHandle<()>> {
    let root = storage::mount(&config.mount_point)?;

    let monitor = HealthMonitor::new(FsStorage::new(root), MonitorSettings::from(config));
    let handle = monitor.spawn()?;
    info!("Storage monitor started");
    Ok(handle)
}

/// Start the codec, build the pipeline and wire up the controller
///
/// `listener` is the sending half of the merged event channel.
pub fn build_controller(
    config: &PlayerConfig,
    tracks: TrackSet,
    listener: UnboundedSender<ControlEvent>,
) -> Result<PlaybackController<HostPipeline, SoftCodec>> {
    info!("Start audio codec chip");
    let mut codec = SoftCodec::new();
    codec.start();

    info!("Create audio pipeline");
    let mut controller = PlaybackController::new(
        HostPipeline::default(),
        codec,
        tracks,
        ControllerSettings::from(&config.playback),
    )?;
    controller.assemble(listener)?;

    if let Some(level) = config.playback.initial_volume {
        controller.set_initial_volume(Volume::new(level as i32))?;
    }
    info!("Codec volume {}%", controller.codec().volume()?);

    Ok(controller)
}
